//! # In-Memory Funds Ledger
//!
//! Bank double behind the `FundsGateway` port. Holds plain balances per
//! address and can be told to fail the next transfer.

use crate::adapters::ModuleAddressDeriver;
use crate::domain::{Address, VaultError, VaultId, VaultResult, MEGAVAULT_ACCOUNT_NAME};
use crate::ports::{AddressDeriver, FundsGateway};
use parking_lot::RwLock;
use primitive_types::U256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// In-memory bank for tests and local runs.
///
/// A vault is valued at the balance of its derived address unless a
/// valuation is pinned with `set_valuation`, which stands in for trading
/// PnL.
pub struct InMemoryFundsLedger {
    balances: RwLock<HashMap<Address, U256>>,
    valuations: RwLock<HashMap<VaultId, U256>>,
    deriver: Arc<dyn AddressDeriver>,
    fail_next_transfer: AtomicBool,
}

impl Default for InMemoryFundsLedger {
    fn default() -> Self {
        Self::new(Arc::new(ModuleAddressDeriver))
    }
}

impl InMemoryFundsLedger {
    pub fn new(deriver: Arc<dyn AddressDeriver>) -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            valuations: RwLock::new(HashMap::new()),
            deriver,
            fail_next_transfer: AtomicBool::new(false),
        }
    }

    /// Mint `amount` into `account` out of thin air.
    pub fn credit(&self, account: Address, amount: U256) {
        let mut balances = self.balances.write();
        let balance = balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.read().get(account).copied().unwrap_or_default()
    }

    pub fn set_valuation(&self, vault: VaultId, valuation: U256) {
        self.valuations.write().insert(vault, valuation);
    }

    pub fn clear_valuation(&self, vault: &VaultId) {
        self.valuations.write().remove(vault);
    }

    /// Make the next transfer fail, to exercise rollback paths.
    pub fn fail_next_transfer(&self) {
        self.fail_next_transfer.store(true, Ordering::SeqCst);
    }

    fn transfer(&self, from: &Address, to: &Address, amount: U256) -> VaultResult<()> {
        if self.fail_next_transfer.swap(false, Ordering::SeqCst) {
            warn!("[qc-18] Injected transfer failure");
            return Err(VaultError::Funds {
                reason: "transfer rejected".into(),
            });
        }

        let mut balances = self.balances.write();
        let available = balances.get(from).copied().unwrap_or_default();
        if available < amount {
            return Err(VaultError::Funds {
                reason: format!(
                    "0x{} has {} but needs {}",
                    hex::encode(from),
                    available,
                    amount
                ),
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = balances
            .get(to)
            .copied()
            .unwrap_or_default()
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow {
                operation: "bank credit",
            })?;
        balances.insert(*from, available - amount);
        balances.insert(*to, credited);
        Ok(())
    }
}

impl FundsGateway for InMemoryFundsLedger {
    fn transfer_in(
        &self,
        from: &Address,
        vault_address: &Address,
        amount: U256,
    ) -> VaultResult<()> {
        self.transfer(from, vault_address, amount)
    }

    fn transfer_out(
        &self,
        vault_address: &Address,
        to: &Address,
        amount: U256,
    ) -> VaultResult<()> {
        self.transfer(vault_address, to, amount)
    }

    fn get_vault_valuation(&self, vault: &VaultId) -> VaultResult<U256> {
        if let Some(valuation) = self.valuations.read().get(vault) {
            return Ok(*valuation);
        }
        let address = self.deriver.derive_address(MEGAVAULT_ACCOUNT_NAME, vault);
        Ok(self.balance_of(&address))
    }
}
