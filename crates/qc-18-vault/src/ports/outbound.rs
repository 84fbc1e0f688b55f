//! Driven Ports (SPI - Outbound Dependencies)
//!
//! - `KeyValueStore`: the ordered, byte-keyed sub-store the vault owns
//! - `FundsGateway`: bank subsystem moving funds and valuing vaults
//! - `AddressDeriver`: account-address derivation authority

use crate::domain::{Address, StoreError, VaultId, VaultResult};
use primitive_types::U256;

/// Abstract interface for an ordered key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key. Deleting an absent key is a no-op.
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch are applied, or NONE are.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// Bank subsystem holding the funds behind vault shares.
///
/// Valuation logic lives entirely on the other side of this port.
pub trait FundsGateway: Send + Sync {
    /// Move `amount` from `from` into the vault's account.
    fn transfer_in(&self, from: &Address, vault_address: &Address, amount: U256)
        -> VaultResult<()>;

    /// Move `amount` out of the vault's account to `to`.
    fn transfer_out(&self, vault_address: &Address, to: &Address, amount: U256)
        -> VaultResult<()>;

    /// Current equity of `vault` in fund units.
    fn get_vault_valuation(&self, vault: &VaultId) -> VaultResult<U256>;
}

/// Deterministic account-address derivation.
pub trait AddressDeriver: Send + Sync {
    /// Same inputs always yield the same address.
    fn derive_address(&self, module_account_name: &str, vault: &VaultId) -> Address;
}
