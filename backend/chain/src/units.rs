//! # Units
//!
//! Conversions between decimal BNB strings and wei.
//!
//! - Submission: exact, at most 18 fractional digits, anything finer is a caller error
//! - Display: exact string with trailing zeros trimmed, or a 4 decimal figure rounded toward zero
use std::str::FromStr;

use alloy_primitives::{
    U256,
    utils::{format_ether, parse_ether},
};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{constants::NATIVE_DECIMALS, error::ValidationError};

pub const DISPLAY_DECIMALS: u32 = 4;

pub fn parse_amount(amount: &str) -> Result<U256, ValidationError> {
    let trimmed = amount.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(ValidationError::InvalidAmount(amount.to_string()));
    }

    if fraction.len() > NATIVE_DECIMALS {
        return Err(ValidationError::TooPrecise(amount.to_string()));
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let normalized = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    };

    parse_ether(&normalized).map_err(|e| ValidationError::InvalidAmount(e.to_string()))
}

/// Exact decimal rendering of a wei amount, `10000000000000000` becomes `0.01`.
pub fn format_amount(wei: U256) -> String {
    let formatted = format_ether(wei);

    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => formatted,
    }
}

/// Short figure for cards and tables. Rounds toward zero so a stake never displays larger than it is.
pub fn display_amount(wei: U256) -> String {
    let exact = format_amount(wei);

    match Decimal::from_str(&exact) {
        Ok(value) => value
            .round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::ToZero)
            .normalize()
            .to_string(),
        // Beyond Decimal's 28 digits, fall back to the exact string
        Err(_) => exact,
    }
}

pub fn sum(amounts: impl IntoIterator<Item = U256>) -> U256 {
    amounts
        .into_iter()
        .fold(U256::ZERO, |total, amount| total.saturating_add(amount))
}
