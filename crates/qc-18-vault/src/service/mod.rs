//! # Vault Accounting Service
//!
//! Composes the share ledger, the registry and the client id tracker into
//! the state transitions the ledger drives.
//!
//! ## Atomicity
//!
//! Every transition runs in a `StoreBranch` over the backing store while
//! holding the store's write lock. The closure only validates and stages
//! writes; it hands back the bank `Transfer` to settle. `transact` settles
//! the transfer and then commits the branch as one atomic batch. A failed
//! transfer drops the branch. A failed commit after a settled transfer
//! issues the inverse transfer before the error is returned. A rejected
//! transition writes nothing, moves no funds and emits no event.

use crate::adapters::StoreBranch;
use crate::config::VaultConfig;
use crate::domain::math::{funds_for_withdrawal, shares_for_deposit};
use crate::domain::{
    Address, ClientId, KeySpace, OrderIdTracker, OwnerShare, QuotingParams, ShareLedger,
    VaultError, VaultId, VaultParams, VaultRegistry, VaultResult,
};
use crate::events::VaultEvent;
use crate::metrics;
use crate::ports::{AddressDeriver, FundsGateway, KeyValueStore, VaultAccountingApi};
use parking_lot::{Mutex, RwLock};
use primitive_types::U256;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[cfg(test)]
mod tests;

/// Collaborators of the vault service.
pub struct VaultDependencies<S, F>
where
    S: KeyValueStore,
    F: FundsGateway,
{
    pub store: S,
    pub funds: Arc<F>,
    pub deriver: Arc<dyn AddressDeriver>,
}

/// Bank movement settled by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transfer {
    /// Owner funds a vault.
    In {
        owner: Address,
        vault_address: Address,
        amount: U256,
    },
    /// Vault pays an owner.
    Out {
        vault_address: Address,
        owner: Address,
        amount: U256,
    },
}

impl Transfer {
    fn settle<F: FundsGateway + ?Sized>(&self, funds: &F) -> VaultResult<()> {
        match *self {
            Self::In {
                owner,
                vault_address,
                amount,
            } => funds.transfer_in(&owner, &vault_address, amount),
            Self::Out {
                vault_address,
                owner,
                amount,
            } => funds.transfer_out(&vault_address, &owner, amount),
        }
    }

    /// Transfer that undoes this one.
    fn inverse(&self) -> Self {
        match *self {
            Self::In {
                owner,
                vault_address,
                amount,
            } => Self::Out {
                vault_address,
                owner,
                amount,
            },
            Self::Out {
                vault_address,
                owner,
                amount,
            } => Self::In {
                owner,
                vault_address,
                amount,
            },
        }
    }
}

/// Staged outcome of a transition closure.
pub(crate) struct Transition<T> {
    value: T,
    event: Option<VaultEvent>,
    transfer: Option<Transfer>,
}

impl<T> Transition<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            event: None,
            transfer: None,
        }
    }

    pub(crate) fn with_event(mut self, event: VaultEvent) -> Self {
        self.event = Some(event);
        self
    }

    pub(crate) fn with_transfer(mut self, transfer: Transfer) -> Self {
        self.transfer = Some(transfer);
        self
    }
}

/// Vault Accounting Service implementation
pub struct VaultAccountingService<S, F>
where
    S: KeyValueStore,
    F: FundsGateway,
{
    pub(crate) config: VaultConfig,
    pub(crate) store: RwLock<S>,
    pub(crate) funds: Arc<F>,
    pub(crate) ledger: ShareLedger,
    pub(crate) registry: VaultRegistry,
    pub(crate) tracker: OrderIdTracker,
    pending_events: Mutex<Vec<VaultEvent>>,
}

impl<S, F> VaultAccountingService<S, F>
where
    S: KeyValueStore,
    F: FundsGateway,
{
    /// Create a service over the default `vault` key space.
    pub fn new(deps: VaultDependencies<S, F>, config: VaultConfig) -> VaultResult<Self> {
        Self::with_key_space(deps, config, KeySpace::default())
    }

    pub fn with_key_space(
        deps: VaultDependencies<S, F>,
        config: VaultConfig,
        keys: KeySpace,
    ) -> VaultResult<Self> {
        config.validate()?;
        let tracker = OrderIdTracker::new(keys.clone(), config.client_id_window)?;
        Ok(Self {
            ledger: ShareLedger::new(keys.clone()),
            registry: VaultRegistry::new(keys, deps.deriver),
            tracker,
            store: RwLock::new(deps.store),
            funds: deps.funds,
            pending_events: Mutex::new(Vec::new()),
            config,
        })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Consume the service and hand back the backing store.
    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    /// Run `f` against a fresh branch, settle its transfer, then commit.
    pub(crate) fn transact<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut StoreBranch<'_, S>) -> VaultResult<Transition<T>>,
    ) -> VaultResult<T> {
        let mut guard = self.store.write();
        let mut branch = StoreBranch::new(&mut *guard);

        let transition = match f(&mut branch) {
            Ok(transition) => transition,
            Err(e) => return Err(self.reject(operation, e)),
        };

        if let Some(transfer) = &transition.transfer {
            if let Err(e) = transfer.settle(self.funds.as_ref()) {
                return Err(self.reject(operation, e));
            }
        }

        let written = match branch.commit() {
            Ok(written) => written,
            Err(e) => {
                if let Some(transfer) = &transition.transfer {
                    self.unwind(operation, transfer);
                }
                return Err(self.reject(operation, e.into()));
            }
        };
        debug!("[qc-18] {} committed {} writes", operation, written);

        if let Some(event) = transition.event {
            match &event {
                VaultEvent::VaultCreated { .. } => metrics::record_vault_created(),
                VaultEvent::Deposited { .. } => metrics::record_deposit(),
                VaultEvent::Withdrawn { .. } => metrics::record_withdrawal(),
                _ => {}
            }
            self.pending_events.lock().push(event);
        }
        Ok(transition.value)
    }

    fn reject(&self, operation: &'static str, e: VaultError) -> VaultError {
        warn!("[qc-18] {} rejected: {}", operation, e);
        metrics::record_rejected(e.kind());
        e
    }

    /// Return funds moved by a transition whose writes never landed.
    fn unwind(&self, operation: &'static str, transfer: &Transfer) {
        match transfer.inverse().settle(self.funds.as_ref()) {
            Ok(()) => {
                warn!("[qc-18] {} commit failed, transfer reversed", operation);
                metrics::record_transfer_reversed();
            }
            Err(e) => {
                error!(
                    "[qc-18] {} commit failed and {:?} could not be reversed: {}",
                    operation, transfer, e
                );
            }
        }
    }

    fn authorize(&self, sender: &Address) -> VaultResult<()> {
        if self.config.is_authority(sender) {
            Ok(())
        } else {
            Err(VaultError::Unauthorized { sender: *sender })
        }
    }

    fn require_vault<K: KeyValueStore + ?Sized>(
        &self,
        store: &K,
        vault: &VaultId,
    ) -> VaultResult<Address> {
        self.registry
            .get_vault_address(store, vault)?
            .ok_or(VaultError::VaultNotFound { vault: *vault })
    }

    /// Check the share sum invariant of every vault.
    pub fn check_invariants(&self) -> VaultResult<()> {
        let store = self.store.read();
        let mut vaults: BTreeSet<VaultId> = self
            .registry
            .get_all_vault_addresses(&*store)?
            .into_iter()
            .map(|(vault, _)| vault)
            .collect();
        vaults.extend(
            self.ledger
                .get_all_total_shares(&*store)?
                .into_iter()
                .map(|(vault, _)| vault),
        );

        for vault in &vaults {
            self.ledger.check_invariant(&*store, vault)?;
        }
        Ok(())
    }
}

impl<S, F> VaultAccountingApi for VaultAccountingService<S, F>
where
    S: KeyValueStore,
    F: FundsGateway,
{
    fn create_vault(&self, vault: VaultId, initial_params: VaultParams) -> VaultResult<Address> {
        self.transact("create_vault", |branch| {
            initial_params.validate()?;
            let address = self.registry.register_vault_address(branch, &vault)?;
            self.registry.set_vault_params(branch, &vault, &initial_params)?;

            info!(
                "[qc-18] Created vault {} at 0x{} ({:?})",
                vault,
                hex::encode(address),
                initial_params.status
            );
            let event = VaultEvent::VaultCreated {
                vault,
                address,
                params: initial_params,
            };
            Ok(Transition::new(address).with_event(event))
        })
    }

    fn deposit(&self, vault: VaultId, owner: Address, funds: U256) -> VaultResult<U256> {
        self.transact("deposit", |branch| {
            let address = self.require_vault(&*branch, &vault)?;
            let total_shares = self.ledger.get_total_shares(&*branch, &vault)?;
            let valuation = if total_shares.is_zero() {
                U256::zero()
            } else {
                self.funds.get_vault_valuation(&vault)?
            };

            let shares = shares_for_deposit(
                &vault,
                funds,
                total_shares,
                valuation,
                self.config.initial_shares_per_unit,
            )?;
            self.ledger.mint_shares(branch, &vault, &owner, shares)?;

            info!(
                "[qc-18] Deposit of {} into {} by 0x{} minted {} shares",
                funds,
                vault,
                hex::encode(owner),
                shares
            );
            let event = VaultEvent::Deposited {
                vault,
                owner,
                funds,
                shares_issued: shares,
                total_shares: total_shares + shares,
            };
            let transfer = Transfer::In {
                owner,
                vault_address: address,
                amount: funds,
            };
            Ok(Transition::new(shares)
                .with_event(event)
                .with_transfer(transfer))
        })
    }

    fn withdraw(&self, vault: VaultId, owner: Address, shares: U256) -> VaultResult<U256> {
        self.transact("withdraw", |branch| {
            let address = self.require_vault(&*branch, &vault)?;
            let total_shares = self.ledger.get_total_shares(&*branch, &vault)?;
            self.ledger.burn_shares(branch, &vault, &owner, shares)?;

            let valuation = self.funds.get_vault_valuation(&vault)?;
            let payout = funds_for_withdrawal(shares, total_shares, valuation)?;

            info!(
                "[qc-18] Withdrawal of {} shares from {} by 0x{} paid {}",
                shares,
                vault,
                hex::encode(owner),
                payout
            );
            let event = VaultEvent::Withdrawn {
                vault,
                owner,
                shares_redeemed: shares,
                funds: payout,
                total_shares: total_shares - shares,
            };
            let mut transition = Transition::new(payout).with_event(event);
            if !payout.is_zero() {
                transition = transition.with_transfer(Transfer::Out {
                    vault_address: address,
                    owner,
                    amount: payout,
                });
            }
            Ok(transition)
        })
    }

    fn update_vault_params(
        &self,
        authority: Address,
        vault: VaultId,
        params: VaultParams,
    ) -> VaultResult<()> {
        self.transact("update_vault_params", |branch| {
            self.authorize(&authority)?;
            self.require_vault(&*branch, &vault)?;
            self.registry.set_vault_params(branch, &vault, &params)?;

            info!("[qc-18] Vault {} params updated ({:?})", vault, params.status);
            Ok(Transition::new(()).with_event(VaultEvent::VaultParamsUpdated { vault, params }))
        })
    }

    fn update_default_quoting_params(
        &self,
        authority: Address,
        params: QuotingParams,
    ) -> VaultResult<()> {
        self.transact("update_default_quoting_params", |branch| {
            self.authorize(&authority)?;
            self.registry.set_default_quoting_params(branch, &params)?;

            info!("[qc-18] Default quoting params updated");
            Ok(Transition::new(()).with_event(VaultEvent::DefaultQuotingParamsUpdated { params }))
        })
    }

    fn delete_vault(&self, authority: Address, vault: VaultId) -> VaultResult<()> {
        self.transact("delete_vault", |branch| {
            self.authorize(&authority)?;
            self.require_vault(&*branch, &vault)?;
            let total_shares = self.ledger.get_total_shares(&*branch, &vault)?;
            if !total_shares.is_zero() {
                return Err(VaultError::VaultHasShares {
                    vault,
                    total_shares,
                });
            }

            self.registry.remove_vault(branch, &vault)?;
            self.tracker.clear(branch, &vault)?;

            info!("[qc-18] Deleted vault {}", vault);
            Ok(Transition::new(()).with_event(VaultEvent::VaultDeleted { vault }))
        })
    }

    fn record_client_order(&self, vault: VaultId, client_id: ClientId) -> VaultResult<bool> {
        self.transact("record_client_order", |branch| {
            self.require_vault(&*branch, &vault)?;
            let recorded = self.tracker.record_client_id(branch, &vault, client_id)?;
            if !recorded {
                debug!("[qc-18] Vault {} already saw client id {}", vault, client_id);
            }
            Ok(Transition::new(recorded))
        })
    }

    fn get_total_shares(&self, vault: VaultId) -> VaultResult<U256> {
        self.ledger.get_total_shares(&*self.store.read(), &vault)
    }

    fn get_owner_shares(&self, vault: VaultId, owner: Address) -> VaultResult<U256> {
        self.ledger
            .get_owner_shares(&*self.store.read(), &vault, &owner)
    }

    fn get_all_owner_shares(&self, vault: VaultId) -> VaultResult<Vec<OwnerShare>> {
        self.ledger.get_all_owner_shares(&*self.store.read(), &vault)
    }

    fn get_quoting_params(&self, vault: VaultId) -> VaultResult<QuotingParams> {
        self.registry.get_quoting_params(&*self.store.read(), &vault)
    }

    fn get_default_quoting_params(&self) -> VaultResult<QuotingParams> {
        self.registry.get_default_quoting_params(&*self.store.read())
    }

    fn get_vault_params(&self, vault: VaultId) -> VaultResult<Option<VaultParams>> {
        self.registry.get_vault_params(&*self.store.read(), &vault)
    }

    fn get_all_vault_params(&self) -> VaultResult<Vec<(VaultId, VaultParams)>> {
        self.registry.get_all_vault_params(&*self.store.read())
    }

    fn get_vault_address(&self, vault: VaultId) -> VaultResult<Option<Address>> {
        self.registry.get_vault_address(&*self.store.read(), &vault)
    }

    fn has_recent_client_id(&self, vault: VaultId, client_id: ClientId) -> VaultResult<bool> {
        self.tracker
            .has_recent_client_id(&*self.store.read(), &vault, client_id)
    }

    fn get_recent_client_ids(&self, vault: VaultId) -> VaultResult<Vec<ClientId>> {
        self.tracker.get_recent_client_ids(&*self.store.read(), &vault)
    }

    fn take_events(&self) -> Vec<VaultEvent> {
        std::mem::take(&mut *self.pending_events.lock())
    }
}
