//! Conversion between implied probability and American odds.
//!
//! Uses rust_decimal for exact precision in financial calculations.
//!
//! Sign convention: positive odds when the implied probability is below 0.5
//! (underdog payout style), negative when above 0.5 (favorite style), and
//! exactly +100 at even odds.

use crate::validate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Probabilities within this distance of 0.5 are treated as exactly even
/// odds, guarding against floating-point-shaped noise in parsed input.
const EVEN_ODDS_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// Errors produced by the odds conversions.
///
/// These are value-level failures: callers check for them and render nothing
/// rather than propagating a panic into the host page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("probability {0} must be strictly between 0 and 1")]
    InvalidProbability(Decimal),

    #[error("odds {0} are not a valid american odds value")]
    InvalidOdds(i64),

    #[error("price {0} must be in (0, 1.00]")]
    InvalidPrice(Decimal),

    #[error("fee {0} must be non-negative")]
    InvalidFee(Decimal),

    #[error("order risks {risk} per contract against a max payout of 1.00")]
    UnprofitableOrder { risk: Decimal },

    #[error("order profit {profit} per contract is not positive")]
    NonPositiveProfit { profit: Decimal },
}

/// Convert an implied win probability in (0, 1) to American odds.
///
/// - p < 0.5: `+round(100 * (1-p) / p)`
/// - p > 0.5: `-round(100 * p / (1-p))`
/// - p within 0.001 of 0.5: exactly +100
///
/// # Examples (worked)
///
/// - p = 0.65: `-round(100 * 0.65 / 0.35)` = -186
/// - p = 0.35: `+round(100 * 0.65 / 0.35)` = +186
pub fn probability_to_american_odds(p: Decimal) -> Result<i32, ConvertError> {
    let p = validate::probability(p).map_err(|_| ConvertError::InvalidProbability(p))?;

    let half = Decimal::new(5, 1);
    if (p - half).abs() <= EVEN_ODDS_TOLERANCE {
        return Ok(100);
    }

    let ratio = if p < half {
        Decimal::ONE_HUNDRED * (Decimal::ONE - p) / p
    } else {
        Decimal::ONE_HUNDRED * p / (Decimal::ONE - p)
    };
    let magnitude = ratio
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i32()
        .ok_or(ConvertError::InvalidProbability(p))?;

    Ok(if p < half { magnitude } else { -magnitude })
}

/// Convert American odds to implied win probability in (0, 1).
///
/// - odds > 0: `p = 100 / (odds + 100)`
/// - odds < 0: `p = |odds| / (|odds| + 100)`
pub fn american_odds_to_probability(odds: i32) -> Result<Decimal, ConvertError> {
    let odds =
        validate::american_odds(i64::from(odds)).map_err(|_| ConvertError::InvalidOdds(i64::from(odds)))?;

    let magnitude = Decimal::from(odds.unsigned_abs());
    let p = if odds > 0 {
        Decimal::ONE_HUNDRED / (magnitude + Decimal::ONE_HUNDRED)
    } else {
        magnitude / (magnitude + Decimal::ONE_HUNDRED)
    };
    Ok(p)
}

/// American odds recomputed with the per-contract fee folded into the stake.
///
/// The effective stake ("risk") is the contract price plus the fee; the
/// payout ceiling is still $1.00 per contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct AfterFeeQuote {
    /// Odds computed from risk = price + fee
    pub after_fee_odds: i32,
    /// Odds computed from the price alone, for comparison
    pub raw_odds: i32,
    /// Effective stake per contract: price + fee
    pub risk: Decimal,
    /// Profit per contract if the order wins: 1 - risk
    pub profit: Decimal,
    /// Fee per contract the quote was computed with
    pub fee_per_contract: Decimal,
}

/// Compute after-fee American odds for a priced order.
///
/// Fails with [`ConvertError::UnprofitableOrder`] when `price + fee >= 1.00`:
/// such an order cannot profit even when it wins, and nothing should be
/// displayed for it.
///
/// # Example (worked)
///
/// price = 0.40, fee = 0.03: risk = 0.43, profit = 0.57, profit >= risk so
/// odds = `+round(100 * 0.57 / 0.43)` = +133.
pub fn calculate_after_fee_odds(
    price: Decimal,
    fee_per_contract: Decimal,
) -> Result<AfterFeeQuote, ConvertError> {
    if price <= Decimal::ZERO || price > Decimal::ONE {
        return Err(ConvertError::InvalidPrice(price));
    }
    if fee_per_contract < Decimal::ZERO {
        return Err(ConvertError::InvalidFee(fee_per_contract));
    }

    let risk = price + fee_per_contract;
    if risk >= Decimal::ONE {
        return Err(ConvertError::UnprofitableOrder { risk });
    }
    let profit = Decimal::ONE - risk;
    if profit <= Decimal::ZERO {
        return Err(ConvertError::NonPositiveProfit { profit });
    }

    let after_fee_odds = odds_from_stake(risk, profit)?;
    let raw_odds = odds_from_stake(price, Decimal::ONE - price)?;

    let quote = AfterFeeQuote {
        after_fee_odds,
        raw_odds,
        risk,
        profit,
        fee_per_contract,
    };

    // Re-derive from inputs and flag any drift. Non-fatal: the profitability
    // gate above is the contract, this is a consistency tripwire.
    if quote.risk != price + fee_per_contract || quote.profit != Decimal::ONE - quote.risk {
        warn!(%price, %fee_per_contract, ?quote, "after-fee quote failed re-derivation check");
    }

    Ok(quote)
}

/// Odds for a given stake/profit split per contract.
fn odds_from_stake(stake: Decimal, profit: Decimal) -> Result<i32, ConvertError> {
    if profit <= Decimal::ZERO {
        return Err(ConvertError::NonPositiveProfit { profit });
    }
    let ratio = if profit >= stake {
        Decimal::ONE_HUNDRED * profit / stake
    } else {
        Decimal::ONE_HUNDRED * stake / profit
    };
    let magnitude = ratio
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i32()
        .ok_or(ConvertError::NonPositiveProfit { profit })?;
    // Even money is +100 by convention, whichever side rounding lands on
    if magnitude == 100 {
        return Ok(100);
    }
    Ok(if profit >= stake { magnitude } else { -magnitude })
}

/// Format American odds with their conventional explicit sign.
pub fn format_american_odds(odds: i32) -> String {
    if odds >= 0 {
        format!("+{odds}")
    } else {
        odds.to_string()
    }
}
