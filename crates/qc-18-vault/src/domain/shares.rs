//! # Share Ledger
//!
//! Total and per-owner share balances of every vault.
//!
//! ## Invariants
//!
//! - `TotalShares[v] == Σ OwnerShares[v][*]` after every mint or burn
//! - no row ever holds zero: a balance that reaches zero is deleted
//! - mint and burn are the only mutators; there is no direct "set"
//!
//! A mint or burn writes two rows. Callers run it inside a `StoreBranch` so
//! both rows commit together.

use super::codec::{decode_u256, encode_u256};
use super::entities::{Address, OwnerShare, VaultId};
use super::errors::{StoreError, VaultError, VaultResult};
use super::keys::{KeyFamily, KeySpace};
use crate::ports::KeyValueStore;
use primitive_types::U256;
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct ShareLedger {
    keys: KeySpace,
}

impl ShareLedger {
    pub fn new(keys: KeySpace) -> Self {
        Self { keys }
    }

    /// Outstanding shares of `vault`, zero if never funded.
    pub fn get_total_shares<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        vault: &VaultId,
    ) -> VaultResult<U256> {
        read_u256(store, &self.keys.total_shares_key(vault))
    }

    /// Shares held by `owner` in `vault`, zero if absent.
    pub fn get_owner_shares<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        vault: &VaultId,
        owner: &Address,
    ) -> VaultResult<U256> {
        read_u256(store, &self.keys.owner_shares_key(vault, owner))
    }

    /// Every owner of `vault`, ordered by address.
    pub fn get_all_owner_shares<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        vault: &VaultId,
    ) -> VaultResult<Vec<OwnerShare>> {
        let prefix = self.keys.owner_shares_prefix(vault);
        store
            .prefix_scan(&prefix)?
            .into_iter()
            .map(|(key, value)| {
                let owner: Address = key[prefix.len()..].try_into().map_err(|_| {
                    VaultError::Codec {
                        reason: format!(
                            "owner shares key has {} byte owner",
                            key.len() - prefix.len()
                        ),
                    }
                })?;
                Ok(OwnerShare {
                    owner,
                    shares: decode_u256(&value)?,
                })
            })
            .collect()
    }

    /// Every vault with outstanding shares, ordered by vault id.
    pub fn get_all_total_shares<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
    ) -> VaultResult<Vec<(VaultId, U256)>> {
        store
            .prefix_scan(&self.keys.prefix_for(KeyFamily::TotalShares))?
            .into_iter()
            .map(|(key, value)| {
                let id = self
                    .keys
                    .strip_prefix(KeyFamily::TotalShares, &key)
                    .ok_or_else(|| VaultError::Codec {
                        reason: "scanned key outside TotalShares".into(),
                    })?;
                Ok((VaultId::from_key_bytes(id)?, decode_u256(&value)?))
            })
            .collect()
    }

    /// Issue `amount` new shares of `vault` to `owner`.
    pub fn mint_shares<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        vault: &VaultId,
        owner: &Address,
        amount: U256,
    ) -> VaultResult<()> {
        if amount.is_zero() {
            return Err(VaultError::InvalidAmount {
                reason: "cannot mint zero shares",
            });
        }

        let total = self.get_total_shares(&*store, vault)?;
        let balance = self.get_owner_shares(&*store, vault, owner)?;
        let new_total = total
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow {
                operation: "mint total shares",
            })?;
        let new_balance = balance
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow {
                operation: "mint owner shares",
            })?;

        store.put(&self.keys.total_shares_key(vault), &encode_u256(&new_total))?;
        store.put(
            &self.keys.owner_shares_key(vault, owner),
            &encode_u256(&new_balance),
        )?;

        debug!(
            "[qc-18] Minted {} shares of {} to 0x{} (total {})",
            amount,
            vault,
            hex::encode(owner),
            new_total
        );
        Ok(())
    }

    /// Destroy `amount` of `owner`'s shares of `vault`.
    pub fn burn_shares<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        vault: &VaultId,
        owner: &Address,
        amount: U256,
    ) -> VaultResult<()> {
        if amount.is_zero() {
            return Err(VaultError::InvalidAmount {
                reason: "cannot burn zero shares",
            });
        }

        let balance = self.get_owner_shares(&*store, vault, owner)?;
        if amount > balance {
            return Err(VaultError::InsufficientShares {
                required: amount,
                available: balance,
            });
        }
        let total = self.get_total_shares(&*store, vault)?;
        // Unreachable while the sum invariant holds.
        if amount > total {
            return Err(StoreError::Corruption {
                message: format!("{vault} owner balance {balance} exceeds total {total}"),
            }
            .into());
        }

        let new_total = total - amount;
        let new_balance = balance - amount;

        write_or_delete(store, &self.keys.total_shares_key(vault), &new_total)?;
        write_or_delete(store, &self.keys.owner_shares_key(vault, owner), &new_balance)?;

        debug!(
            "[qc-18] Burned {} shares of {} from 0x{} (total {})",
            amount,
            vault,
            hex::encode(owner),
            new_total
        );
        Ok(())
    }

    /// Verify `TotalShares == Σ OwnerShares` and that no zero row exists.
    pub fn check_invariant<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        vault: &VaultId,
    ) -> VaultResult<()> {
        let total = self.get_total_shares(store, vault)?;
        let mut sum = U256::zero();
        for row in self.get_all_owner_shares(store, vault)? {
            if row.shares.is_zero() {
                return Err(StoreError::Corruption {
                    message: format!(
                        "{vault} stores a zero balance for 0x{}",
                        hex::encode(row.owner)
                    ),
                }
                .into());
            }
            sum = sum.checked_add(row.shares).ok_or(VaultError::ArithmeticOverflow {
                operation: "sum owner shares",
            })?;
        }
        if sum != total {
            return Err(StoreError::Corruption {
                message: format!("{vault} total shares {total} != owner sum {sum}"),
            }
            .into());
        }
        Ok(())
    }
}

fn read_u256<S: KeyValueStore + ?Sized>(store: &S, key: &[u8]) -> VaultResult<U256> {
    match store.get(key)? {
        Some(bytes) => decode_u256(&bytes),
        None => Ok(U256::zero()),
    }
}

fn write_or_delete<S: KeyValueStore + ?Sized>(
    store: &mut S,
    key: &[u8],
    value: &U256,
) -> VaultResult<()> {
    if value.is_zero() {
        store.delete(key)?;
    } else {
        store.put(key, &encode_u256(value))?;
    }
    Ok(())
}
