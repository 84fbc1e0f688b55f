//! # Vault Registry
//!
//! Per-vault configuration: the default quoting params singleton, per-vault
//! params overrides, and the vault id to account address mapping.
//!
//! A vault address is derived once from the `megavault` module account and
//! the vault id, and never changes afterwards.

use super::codec::{decode_address, decode_record, encode_record};
use super::entities::{Address, QuotingParams, VaultId, VaultParams};
use super::errors::{VaultError, VaultResult};
use super::keys::{KeyFamily, KeySpace, MEGAVAULT_ACCOUNT_NAME};
use crate::ports::{AddressDeriver, KeyValueStore};
use std::sync::Arc;
use tracing::debug;

pub struct VaultRegistry {
    keys: KeySpace,
    deriver: Arc<dyn AddressDeriver>,
}

impl VaultRegistry {
    pub fn new(keys: KeySpace, deriver: Arc<dyn AddressDeriver>) -> Self {
        Self { keys, deriver }
    }

    /// Stored default, or the compiled-in default if genesis never set one.
    pub fn get_default_quoting_params<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
    ) -> VaultResult<QuotingParams> {
        match store.get(&self.keys.default_quoting_params_key())? {
            Some(bytes) => decode_record(&bytes),
            None => Ok(QuotingParams::default()),
        }
    }

    /// Replace the default quoting params. Authorization is the caller's job.
    pub fn set_default_quoting_params<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        params: &QuotingParams,
    ) -> VaultResult<()> {
        params.validate()?;
        store.put(&self.keys.default_quoting_params_key(), &encode_record(params)?)?;
        debug!("[qc-18] Default quoting params set: {:?}", params);
        Ok(())
    }

    /// Quoting params in effect for `vault`: its override if it has one,
    /// otherwise the default. Absence is not an error.
    pub fn get_quoting_params<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        vault: &VaultId,
    ) -> VaultResult<QuotingParams> {
        match self.get_vault_params(store, vault)? {
            Some(VaultParams {
                quoting_params: Some(params),
                ..
            }) => Ok(params),
            _ => self.get_default_quoting_params(store),
        }
    }

    pub fn get_vault_params<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        vault: &VaultId,
    ) -> VaultResult<Option<VaultParams>> {
        store
            .get(&self.keys.vault_params_key(vault))?
            .map(|bytes| decode_record(&bytes))
            .transpose()
    }

    /// Every configured vault, ordered by vault id.
    pub fn get_all_vault_params<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
    ) -> VaultResult<Vec<(VaultId, VaultParams)>> {
        self.scan_family(store, KeyFamily::VaultParams, |bytes| decode_record(bytes))
    }

    pub fn set_vault_params<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        vault: &VaultId,
        params: &VaultParams,
    ) -> VaultResult<()> {
        params.validate()?;
        store.put(&self.keys.vault_params_key(vault), &encode_record(params)?)?;
        debug!("[qc-18] Vault {} params set: {:?}", vault, params);
        Ok(())
    }

    /// Derive and persist the account address of `vault`.
    pub fn register_vault_address<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        vault: &VaultId,
    ) -> VaultResult<Address> {
        let key = self.keys.vault_address_key(vault);
        if store.exists(&key)? {
            return Err(VaultError::AlreadyRegistered { vault: *vault });
        }

        let address = self.deriver.derive_address(MEGAVAULT_ACCOUNT_NAME, vault);
        store.put(&key, &address)?;
        debug!("[qc-18] Vault {} registered at 0x{}", vault, hex::encode(address));
        Ok(address)
    }

    pub fn get_vault_address<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        vault: &VaultId,
    ) -> VaultResult<Option<Address>> {
        store
            .get(&self.keys.vault_address_key(vault))?
            .map(|bytes| decode_address(&bytes))
            .transpose()
    }

    /// Every registered vault, ordered by vault id.
    pub fn get_all_vault_addresses<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
    ) -> VaultResult<Vec<(VaultId, Address)>> {
        self.scan_family(store, KeyFamily::VaultAddress, decode_address)
    }

    /// Address `vault` would be registered under.
    pub fn derive_vault_address(&self, vault: &VaultId) -> Address {
        self.deriver.derive_address(MEGAVAULT_ACCOUNT_NAME, vault)
    }

    /// Drop the params and address rows of `vault`.
    pub fn remove_vault<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        vault: &VaultId,
    ) -> VaultResult<()> {
        store.delete(&self.keys.vault_params_key(vault))?;
        store.delete(&self.keys.vault_address_key(vault))?;
        Ok(())
    }

    fn scan_family<S, T, F>(
        &self,
        store: &S,
        family: KeyFamily,
        decode: F,
    ) -> VaultResult<Vec<(VaultId, T)>>
    where
        S: KeyValueStore + ?Sized,
        F: Fn(&[u8]) -> VaultResult<T>,
    {
        store
            .prefix_scan(&self.keys.prefix_for(family))?
            .into_iter()
            .map(|(key, value)| {
                let id = self
                    .keys
                    .strip_prefix(family, &key)
                    .ok_or_else(|| VaultError::Codec {
                        reason: format!("scanned key outside {}", family.literal()),
                    })?;
                Ok((VaultId::from_key_bytes(id)?, decode(&value)?))
            })
            .collect()
    }
}
