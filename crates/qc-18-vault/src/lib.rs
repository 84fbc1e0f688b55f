//! # qc-18-vault
//!
//! Vault subsystem for Quantum-Chain: share-based accounting of pooled
//! capital, per-vault quoting configuration, vault account addresses and
//! client order id deduplication.
//!
//! ## Role in System
//!
//! - **Single Writer**: all vault state changes go through
//!   `VaultAccountingService` during a state transition
//! - **Exact Accounting**: U256 shares, no floating point, round-down
//!   issuance and redemption
//! - **Funds Stay External**: the bank subsystem moves funds and values
//!   vaults behind the `FundsGateway` port
//!
//! ## Architecture
//!
//! ```text
//!                     [Ledger state transition]
//!                                │
//!                                ↓
//!                  ┌── VaultAccountingService ──┐
//!                  │        (StoreBranch)       │
//!        ┌─────────┼──────────────┬─────────────┼──────────┐
//!        ↓         ↓              ↓             ↓          ↓
//!   ShareLedger  VaultRegistry  OrderIdTracker  FundsGateway AddressDeriver
//!        └─────────┴──────┬───────┘
//!                         ↓
//!              KeySpace → KeyValueStore
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use qc_18_vault::{VaultAccountingService, VaultConfig, VaultDependencies};
//! use qc_18_vault::ports::VaultAccountingApi;
//!
//! let service = VaultAccountingService::new(deps, VaultConfig::default())?;
//! let address = service.create_vault(VaultId::clob(0), VaultParams::new(VaultStatus::Quoting))?;
//! let shares = service.deposit(VaultId::clob(0), owner, U256::from(1_000))?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod events;
pub mod genesis;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::VaultConfig;
pub use domain::*;
pub use events::VaultEvent;
pub use genesis::{GenesisState, VaultGenesis};
pub use ports::*;
pub use service::{VaultAccountingService, VaultDependencies};

pub use primitive_types::U256;
