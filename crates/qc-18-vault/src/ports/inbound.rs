//! Driving Ports (API - Inbound)
//!
//! The surrounding ledger drives the vault subsystem through this trait:
//! mutators run inside one state transition, `get_*` queries are the
//! read-only surface the query layer passes through.

use crate::domain::{
    Address, ClientId, OwnerShare, QuotingParams, VaultId, VaultParams, VaultResult,
};
use crate::events::VaultEvent;
use primitive_types::U256;

/// Primary Vault API
pub trait VaultAccountingApi: Send + Sync {
    // === State transitions ===

    /// Register a vault address and store its initial params.
    fn create_vault(&self, vault: VaultId, initial_params: VaultParams) -> VaultResult<Address>;

    /// Deposit `funds` on behalf of `owner`, returning the shares issued.
    fn deposit(&self, vault: VaultId, owner: Address, funds: U256) -> VaultResult<U256>;

    /// Redeem `shares` of `owner`, returning the funds paid out.
    fn withdraw(&self, vault: VaultId, owner: Address, shares: U256) -> VaultResult<U256>;

    /// Replace the params of an existing vault. Privileged.
    fn update_vault_params(
        &self,
        authority: Address,
        vault: VaultId,
        params: VaultParams,
    ) -> VaultResult<()>;

    /// Replace the default quoting params. Privileged.
    fn update_default_quoting_params(
        &self,
        authority: Address,
        params: QuotingParams,
    ) -> VaultResult<()>;

    /// Remove a vault with no outstanding shares. Privileged.
    fn delete_vault(&self, authority: Address, vault: VaultId) -> VaultResult<()>;

    /// Track a client order id. Returns `false` if it was already in the
    /// recent window.
    fn record_client_order(&self, vault: VaultId, client_id: ClientId) -> VaultResult<bool>;

    // === Queries ===

    fn get_total_shares(&self, vault: VaultId) -> VaultResult<U256>;

    fn get_owner_shares(&self, vault: VaultId, owner: Address) -> VaultResult<U256>;

    fn get_all_owner_shares(&self, vault: VaultId) -> VaultResult<Vec<OwnerShare>>;

    fn get_quoting_params(&self, vault: VaultId) -> VaultResult<QuotingParams>;

    fn get_default_quoting_params(&self) -> VaultResult<QuotingParams>;

    fn get_vault_params(&self, vault: VaultId) -> VaultResult<Option<VaultParams>>;

    fn get_all_vault_params(&self) -> VaultResult<Vec<(VaultId, VaultParams)>>;

    fn get_vault_address(&self, vault: VaultId) -> VaultResult<Option<Address>>;

    fn has_recent_client_id(&self, vault: VaultId, client_id: ClientId) -> VaultResult<bool>;

    fn get_recent_client_ids(&self, vault: VaultId) -> VaultResult<Vec<ClientId>>;

    /// Drain events emitted by committed transitions.
    fn take_events(&self) -> Vec<VaultEvent>;
}
