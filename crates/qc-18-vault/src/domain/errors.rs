//! Error types for the Vault subsystem
//!
//! A transition that returns any of these has written nothing. Nothing here
//! is retried: re-running a deterministic state transition with the same
//! inputs reproduces the same error.

use super::entities::{Address, VaultId};
use primitive_types::U256;
use thiserror::Error;

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    Io { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    Corruption { message: String },
}

/// Vault subsystem errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// Zero quantity where a positive one is required
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: &'static str },

    /// Burn exceeds the owner's balance
    #[error("Insufficient shares: required {required}, available {available}")]
    InsufficientShares { required: U256, available: U256 },

    /// Operation on a vault with no registered address
    #[error("Vault not found: {vault}")]
    VaultNotFound { vault: VaultId },

    /// Vault address already assigned
    #[error("Vault already registered: {vault}")]
    AlreadyRegistered { vault: VaultId },

    /// Configuration field outside its recognized bounds
    #[error("Invalid params: {field} {reason}")]
    InvalidParams {
        field: &'static str,
        reason: String,
    },

    /// Shares are outstanding but the vault is valued at zero
    #[error("Vault {vault} has non-positive equity with {total_shares} shares outstanding")]
    NonPositiveEquity { vault: VaultId, total_shares: U256 },

    /// U256 arithmetic would overflow
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow { operation: &'static str },

    /// Sender is not an authority for privileged operations
    #[error("Unauthorized sender: 0x{}", hex::encode(.sender))]
    Unauthorized { sender: Address },

    /// Vault cannot be deleted while shares remain
    #[error("Vault {vault} still has {total_shares} shares outstanding")]
    VaultHasShares { vault: VaultId, total_shares: U256 },

    /// Genesis state rejected by validation
    #[error("Invalid genesis: {reason}")]
    InvalidGenesis { reason: String },

    /// Configuration rejected by validation
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Funds collaborator refused a transfer or valuation
    #[error("Funds error: {reason}")]
    Funds { reason: String },

    /// Persisted value could not be decoded
    #[error("Codec error: {reason}")]
    Codec { reason: String },

    /// Underlying store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Shorthand for an out-of-range params field.
    pub fn invalid_params(field: &'static str, reason: impl Into<String>) -> Self {
        VaultError::InvalidParams {
            field,
            reason: reason.into(),
        }
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::InvalidAmount { .. } => "invalid_amount",
            VaultError::InsufficientShares { .. } => "insufficient_shares",
            VaultError::VaultNotFound { .. } => "vault_not_found",
            VaultError::AlreadyRegistered { .. } => "already_registered",
            VaultError::InvalidParams { .. } => "invalid_params",
            VaultError::NonPositiveEquity { .. } => "non_positive_equity",
            VaultError::ArithmeticOverflow { .. } => "arithmetic_overflow",
            VaultError::Unauthorized { .. } => "unauthorized",
            VaultError::VaultHasShares { .. } => "vault_has_shares",
            VaultError::InvalidGenesis { .. } => "invalid_genesis",
            VaultError::InvalidConfig { .. } => "invalid_config",
            VaultError::Funds { .. } => "funds",
            VaultError::Codec { .. } => "codec",
            VaultError::Store(_) => "store",
        }
    }
}
