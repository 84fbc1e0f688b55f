//! # Domain Entities for the Vault Subsystem
//!
//! ## Type Decisions
//!
//! - `U256` for shares and fund amounts. Share accounting must be bit-for-bit
//!   reproducible across re-executions, so all arithmetic is exact integer
//!   arithmetic with checked overflow. Nothing in this crate touches floats.
//! - `VaultId` has a fixed 5-byte key encoding so that `prefix ++ vault` is an
//!   exact scan prefix for one vault's rows.

use super::errors::{VaultError, VaultResult};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 20-byte account address.
pub type Address = [u8; 20];

/// Externally assigned client order identifier.
pub type ClientId = u32;

/// Parts-per-million denominator used by all `*_ppm` fields.
pub const ONE_MILLION: u32 = 1_000_000;

/// Upper bound for `QuotingParams::layers`.
pub const MAX_LAYERS: u32 = u8::MAX as u32;

/// Upper bound for `QuotingParams::skew_factor_ppm` (10x).
pub const MAX_SKEW_FACTOR_PPM: u32 = 10 * ONE_MILLION;

/// Upper bound for `QuotingParams::order_expiration_seconds` (90 days).
pub const MAX_ORDER_EXPIRATION_SECONDS: u32 = 90 * 24 * 60 * 60;

/// Kind of vault. Only CLOB vaults exist today.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VaultType {
    /// Market-making vault quoting on a CLOB pair
    Clob = 1,
}

impl VaultType {
    fn from_byte(byte: u8) -> VaultResult<Self> {
        match byte {
            1 => Ok(VaultType::Clob),
            other => Err(VaultError::Codec {
                reason: format!("unknown vault type byte {other}"),
            }),
        }
    }
}

/// Vault identifier: type plus a number (the CLOB pair id for CLOB vaults).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VaultId {
    pub vault_type: VaultType,
    pub number: u32,
}

impl VaultId {
    /// Length of the key encoding.
    pub const ENCODED_LEN: usize = 5;

    pub const fn new(vault_type: VaultType, number: u32) -> Self {
        Self { vault_type, number }
    }

    pub const fn clob(number: u32) -> Self {
        Self::new(VaultType::Clob, number)
    }

    /// `[vault_type] ++ number (big-endian)`. Big-endian keeps store order
    /// equal to numeric order.
    pub fn to_key_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0] = self.vault_type as u8;
        out[1..].copy_from_slice(&self.number.to_be_bytes());
        out
    }

    pub fn from_key_bytes(bytes: &[u8]) -> VaultResult<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(VaultError::Codec {
                reason: format!(
                    "vault id must be {} bytes, got {}",
                    Self::ENCODED_LEN,
                    bytes.len()
                ),
            });
        }
        let vault_type = VaultType::from_byte(bytes[0])?;
        let mut number = [0u8; 4];
        number.copy_from_slice(&bytes[1..]);
        Ok(Self::new(vault_type, u32::from_be_bytes(number)))
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vault_type {
            VaultType::Clob => write!(f, "clob-{}", self.number),
        }
    }
}

/// Market-making parameters consumed by the quoting engine.
///
/// The vault subsystem only validates and stores these; how they turn into
/// orders is the trading engine's business.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotingParams {
    /// Number of order layers on each side of the book
    pub layers: u32,
    /// Minimum spread in ppm
    pub spread_min_ppm: u32,
    /// Spread buffer added on top of the minimum, in ppm
    pub spread_buffer_ppm: u32,
    /// Inventory skew factor in ppm
    pub skew_factor_ppm: u32,
    /// Order size as a fraction of equity, in ppm
    pub order_size_pct_ppm: u32,
    /// Lifetime of placed orders
    pub order_expiration_seconds: u32,
    /// Equity below which the vault does not quote
    pub activation_threshold_quote_quantums: U256,
}

impl Default for QuotingParams {
    fn default() -> Self {
        Self {
            layers: 2,
            spread_min_ppm: 10_000,
            spread_buffer_ppm: 1_500,
            skew_factor_ppm: 2_000_000,
            order_size_pct_ppm: 100_000,
            order_expiration_seconds: 60,
            activation_threshold_quote_quantums: U256::from(1_000_000_000u64),
        }
    }
}

impl QuotingParams {
    /// Check every field against its recognized bounds.
    pub fn validate(&self) -> VaultResult<()> {
        if self.layers == 0 || self.layers > MAX_LAYERS {
            return Err(VaultError::invalid_params(
                "layers",
                format!("must be in 1..={MAX_LAYERS}, got {}", self.layers),
            ));
        }
        if self.spread_min_ppm == 0 || self.spread_min_ppm > ONE_MILLION {
            return Err(VaultError::invalid_params(
                "spread_min_ppm",
                format!("must be in 1..={ONE_MILLION}, got {}", self.spread_min_ppm),
            ));
        }
        if self.spread_buffer_ppm > ONE_MILLION {
            return Err(VaultError::invalid_params(
                "spread_buffer_ppm",
                format!("must be at most {ONE_MILLION}, got {}", self.spread_buffer_ppm),
            ));
        }
        if self.skew_factor_ppm > MAX_SKEW_FACTOR_PPM {
            return Err(VaultError::invalid_params(
                "skew_factor_ppm",
                format!(
                    "must be at most {MAX_SKEW_FACTOR_PPM}, got {}",
                    self.skew_factor_ppm
                ),
            ));
        }
        if self.order_size_pct_ppm == 0 || self.order_size_pct_ppm > ONE_MILLION {
            return Err(VaultError::invalid_params(
                "order_size_pct_ppm",
                format!(
                    "must be in 1..={ONE_MILLION}, got {}",
                    self.order_size_pct_ppm
                ),
            ));
        }
        if self.order_expiration_seconds == 0
            || self.order_expiration_seconds > MAX_ORDER_EXPIRATION_SECONDS
        {
            return Err(VaultError::invalid_params(
                "order_expiration_seconds",
                format!(
                    "must be in 1..={MAX_ORDER_EXPIRATION_SECONDS}, got {}",
                    self.order_expiration_seconds
                ),
            ));
        }
        Ok(())
    }
}

/// Lifecycle status of a vault.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultStatus {
    /// Not quoting, no orders
    #[default]
    Deactivated,
    /// Configured but waiting to quote
    StandBy,
    /// Actively quoting both sides
    Quoting,
    /// Only reducing position
    CloseOnly,
}

/// Per-vault configuration record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultParams {
    pub status: VaultStatus,
    /// Override of the default quoting params. `None` falls back to the
    /// `DefaultQuotingParams` singleton.
    pub quoting_params: Option<QuotingParams>,
}

impl VaultParams {
    pub fn new(status: VaultStatus) -> Self {
        Self {
            status,
            quoting_params: None,
        }
    }

    pub fn with_quoting_params(mut self, params: QuotingParams) -> Self {
        self.quoting_params = Some(params);
        self
    }

    pub fn validate(&self) -> VaultResult<()> {
        match &self.quoting_params {
            Some(params) => params.validate(),
            None => Ok(()),
        }
    }
}

/// One owner's share balance in a vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerShare {
    pub owner: Address,
    pub shares: U256,
}
