//! Bound checks for raw numeric inputs.
//!
//! Every number entering the system, whether parsed out of ticket text or
//! supplied by a caller, passes through one of these checks before any odds
//! or fee calculation sees it. Validators never panic; out-of-range input is
//! reported as an error value the caller accumulates or discards.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Maximum quantity of contracts accepted on a single ticket.
pub const MAX_QUANTITY: u32 = 10_000;

/// Maximum decimal places accepted on a fee value.
pub const MAX_FEE_SCALE: u32 = 4;

/// Errors produced by the numeric validators.
///
/// Display strings double as the human-readable messages accumulated into
/// ticket validation output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("price {0} is outside the valid range 0.01-1.00")]
    PriceOutOfRange(Decimal),

    #[error("quantity {0} must be a whole number between 1 and 10000")]
    QuantityOutOfRange(i64),

    #[error("fee {0} is outside the valid range 0-1000")]
    FeeOutOfRange(Decimal),

    #[error("fee {0} has more than {MAX_FEE_SCALE} decimal places")]
    FeeTooPrecise(Decimal),

    #[error("probability {0} must be strictly between 0 and 1")]
    ProbabilityOutOfRange(Decimal),

    #[error("american odds {0} must have a magnitude of at least 100")]
    OddsMagnitudeTooSmall(i64),

    #[error("could not read a number from {0:?}")]
    Unparseable(String),
}

/// Validate a contract price into [0.01, 1.00].
pub fn price(raw: Decimal) -> Result<Decimal, ValidationError> {
    let min = Decimal::new(1, 2);
    if raw < min || raw > Decimal::ONE {
        return Err(ValidationError::PriceOutOfRange(raw));
    }
    Ok(raw)
}

/// Validate a contract quantity into [1, 10000].
pub fn quantity(raw: i64) -> Result<u32, ValidationError> {
    if raw < 1 || raw > i64::from(MAX_QUANTITY) {
        return Err(ValidationError::QuantityOutOfRange(raw));
    }
    Ok(raw as u32)
}

/// Validate a fee value: non-negative, at most $1000, at most 4 decimal
/// places.
pub fn fee(raw: Decimal) -> Result<Decimal, ValidationError> {
    if raw < Decimal::ZERO || raw > Decimal::from(1000) {
        return Err(ValidationError::FeeOutOfRange(raw));
    }
    if raw.normalize().scale() > MAX_FEE_SCALE {
        return Err(ValidationError::FeeTooPrecise(raw));
    }
    Ok(raw)
}

/// Validate an implied probability into the open interval (0, 1).
///
/// 0 and 1 are rejected: both correspond to undefined American odds.
pub fn probability(raw: Decimal) -> Result<Decimal, ValidationError> {
    if raw <= Decimal::ZERO || raw >= Decimal::ONE {
        return Err(ValidationError::ProbabilityOutOfRange(raw));
    }
    Ok(raw)
}

/// Validate an American odds value.
///
/// By convention odds have a magnitude of at least 100; +100 represents even
/// odds. Zero and sub-100 magnitudes carry no meaning and are rejected.
pub fn american_odds(raw: i64) -> Result<i32, ValidationError> {
    if raw.abs() < 100 || raw.abs() > i64::from(i32::MAX) {
        return Err(ValidationError::OddsMagnitudeTooSmall(raw));
    }
    Ok(raw as i32)
}

/// Leniently read a decimal out of UI-sourced text.
///
/// Strips currency symbols, thousands separators, and surrounding
/// whitespace. Rejects anything that does not parse cleanly afterwards, so
/// NaN/infinity-shaped text never reaches the calculators.
pub fn decimal_from_text(raw: &str) -> Result<Decimal, ValidationError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Err(ValidationError::Unparseable(raw.to_string()));
    }
    cleaned
        .parse::<Decimal>()
        .map_err(|_| ValidationError::Unparseable(raw.to_string()))
}

/// Leniently read an integer out of UI-sourced text.
///
/// Accepts the same currency/separator noise as [`decimal_from_text`] but
/// rejects fractional values outright.
pub fn integer_from_text(raw: &str) -> Result<i64, ValidationError> {
    let value = decimal_from_text(raw)?;
    if value.normalize().scale() != 0 {
        return Err(ValidationError::Unparseable(raw.to_string()));
    }
    value
        .to_i64()
        .ok_or_else(|| ValidationError::Unparseable(raw.to_string()))
}
