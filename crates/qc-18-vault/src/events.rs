//! Outgoing events for the Vault subsystem
//!
//! Emitted only after a state transition commits; a rejected transition
//! emits nothing.

use crate::domain::{Address, QuotingParams, VaultId, VaultParams};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    VaultCreated {
        vault: VaultId,
        address: Address,
        params: VaultParams,
    },
    Deposited {
        vault: VaultId,
        owner: Address,
        funds: U256,
        shares_issued: U256,
        total_shares: U256,
    },
    Withdrawn {
        vault: VaultId,
        owner: Address,
        shares_redeemed: U256,
        funds: U256,
        total_shares: U256,
    },
    VaultParamsUpdated {
        vault: VaultId,
        params: VaultParams,
    },
    DefaultQuotingParamsUpdated {
        params: QuotingParams,
    },
    VaultDeleted {
        vault: VaultId,
    },
}

impl VaultEvent {
    /// Vault the event concerns, if any.
    pub fn vault(&self) -> Option<VaultId> {
        match self {
            Self::VaultCreated { vault, .. }
            | Self::Deposited { vault, .. }
            | Self::Withdrawn { vault, .. }
            | Self::VaultParamsUpdated { vault, .. }
            | Self::VaultDeleted { vault } => Some(*vault),
            Self::DefaultQuotingParamsUpdated { .. } => None,
        }
    }
}
