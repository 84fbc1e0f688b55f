//! Domain module for the Vault subsystem
//!
//! ## Stores
//! - shares: total and per-owner share balances
//! - registry: quoting params, vault params and vault addresses
//! - client_ids: most recent client order ids per vault
//!
//! ## Support
//! - keys: key space shared by all stores
//! - codec: persisted value encoding
//! - math: exact issuance and redemption arithmetic

pub mod client_ids;
pub mod codec;
pub mod entities;
pub mod errors;
pub mod keys;
pub mod math;
pub mod registry;
pub mod shares;

pub use client_ids::{OrderIdTracker, DEFAULT_CLIENT_ID_WINDOW};
pub use entities::{
    Address, ClientId, OwnerShare, QuotingParams, VaultId, VaultParams, VaultStatus, VaultType,
};
pub use errors::{StoreError, VaultError, VaultResult};
pub use keys::*;
pub use registry::VaultRegistry;
pub use shares::ShareLedger;
