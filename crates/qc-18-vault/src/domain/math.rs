//! Share issuance and redemption arithmetic.
//!
//! Both directions round down, so rounding dust always stays in the vault
//! and a deposit followed by a full withdrawal never pays out more than
//! went in. Products are taken in U512 so `a * b / c` only fails when the
//! final quotient does not fit in U256.

use super::entities::VaultId;
use super::errors::{VaultError, VaultResult};
use primitive_types::{U256, U512};

/// `floor(a * b / c)`.
pub fn mul_div_floor(a: U256, b: U256, c: U256, operation: &'static str) -> VaultResult<U256> {
    if c.is_zero() {
        return Err(VaultError::ArithmeticOverflow { operation });
    }
    let quotient: U512 = a.full_mul(b) / U512::from(c);
    U256::try_from(quotient).map_err(|_| VaultError::ArithmeticOverflow { operation })
}

/// Shares to mint for a deposit of `funds`.
///
/// An empty vault issues `funds * initial_shares_per_unit`; otherwise the
/// deposit buys in at the pre-deposit price `valuation / total_shares`.
pub fn shares_for_deposit(
    vault: &VaultId,
    funds: U256,
    total_shares: U256,
    valuation: U256,
    initial_shares_per_unit: U256,
) -> VaultResult<U256> {
    if funds.is_zero() {
        return Err(VaultError::InvalidAmount {
            reason: "deposit amount must be positive",
        });
    }

    let shares = if total_shares.is_zero() {
        funds
            .checked_mul(initial_shares_per_unit)
            .ok_or(VaultError::ArithmeticOverflow {
                operation: "initial share issuance",
            })?
    } else {
        if valuation.is_zero() {
            return Err(VaultError::NonPositiveEquity {
                vault: *vault,
                total_shares,
            });
        }
        mul_div_floor(funds, total_shares, valuation, "share issuance")?
    };

    if shares.is_zero() {
        return Err(VaultError::InvalidAmount {
            reason: "deposit too small to mint a share",
        });
    }
    Ok(shares)
}

/// Funds paid out for redeeming `shares` out of `total_shares`.
pub fn funds_for_withdrawal(
    shares: U256,
    total_shares: U256,
    valuation: U256,
) -> VaultResult<U256> {
    if shares.is_zero() {
        return Err(VaultError::InvalidAmount {
            reason: "withdrawal shares must be positive",
        });
    }
    if shares > total_shares {
        return Err(VaultError::InsufficientShares {
            required: shares,
            available: total_shares,
        });
    }
    mul_div_floor(shares, valuation, total_shares, "redemption")
}
