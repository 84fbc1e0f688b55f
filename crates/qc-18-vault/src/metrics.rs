//! # Vault Metrics
//!
//! Prometheus counters for vault state transitions.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-18-vault = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `vault_created_total` - Counter of vaults created
//! - `vault_deposits_total` - Counter of committed deposits
//! - `vault_withdrawals_total` - Counter of committed withdrawals
//! - `vault_transitions_rejected_total` - Counter of rejected transitions (by kind)
//! - `vault_transfers_reversed_total` - Counter of bank transfers undone after a failed commit

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total vaults created
    pub static ref VAULTS_CREATED: IntCounter = register_int_counter!(
        "vault_created_total",
        "Total number of vaults created"
    )
    .expect("Failed to create VAULTS_CREATED metric");

    /// Total committed deposits
    pub static ref DEPOSITS: IntCounter = register_int_counter!(
        "vault_deposits_total",
        "Total number of committed deposits"
    )
    .expect("Failed to create DEPOSITS metric");

    /// Total committed withdrawals
    pub static ref WITHDRAWALS: IntCounter = register_int_counter!(
        "vault_withdrawals_total",
        "Total number of committed withdrawals"
    )
    .expect("Failed to create WITHDRAWALS metric");

    /// Rejected transitions, labeled by error kind
    pub static ref TRANSITIONS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "vault_transitions_rejected_total",
        "Total number of rejected vault transitions",
        &["kind"]
    )
    .expect("Failed to create TRANSITIONS_REJECTED metric");

    /// Transfers undone after the store refused the commit
    pub static ref TRANSFERS_REVERSED: IntCounter = register_int_counter!(
        "vault_transfers_reversed_total",
        "Total number of bank transfers reversed after a failed commit"
    )
    .expect("Failed to create TRANSFERS_REVERSED metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_vault_created() {
    VAULTS_CREATED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_deposit() {
    DEPOSITS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_withdrawal() {
    WITHDRAWALS.inc();
}

/// Record a rejected transition with its error kind
#[cfg(feature = "metrics")]
pub fn record_rejected(kind: &str) {
    TRANSITIONS_REJECTED.with_label_values(&[kind]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_transfer_reversed() {
    TRANSFERS_REVERSED.inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_vault_created() {}

#[cfg(not(feature = "metrics"))]
pub fn record_deposit() {}

#[cfg(not(feature = "metrics"))]
pub fn record_withdrawal() {}

#[cfg(not(feature = "metrics"))]
pub fn record_rejected(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_transfer_reversed() {}
