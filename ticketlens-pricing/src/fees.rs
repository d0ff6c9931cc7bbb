//! Venue fee schedule and fee records.
//!
//! The venue charges a fraction of profit potential per contract:
//! `rate * price * (1 - price)`, with the rate depending on whether the
//! order takes or adds liquidity. The quadratic term peaks at a price of
//! 0.50, so even-odds contracts carry the highest fee.
//!
//! Uses rust_decimal for exact precision in financial calculations.

use crate::validate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by fee estimation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    #[error("price {0} must be in (0, 1.00] to estimate a fee")]
    InvalidPrice(Decimal),

    #[error("quantity must be a positive whole number of contracts")]
    InvalidQuantity,
}

/// Whether an order takes liquidity from the book or adds to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    #[display("taker")]
    Taker,
    #[display("maker")]
    Maker,
}

/// Where a fee figure came from.
///
/// Displays derived from an estimated fee must carry a visible "estimated"
/// indicator; this enum is the source of truth for that labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum FeeSource {
    /// Read directly off the order ticket
    #[display("ticket")]
    Ticket,
    /// Computed from the published fee schedule
    #[display("estimated")]
    Estimated,
}

/// Published fee rates.
///
/// Kept as configuration rather than literals so a schedule change is a
/// config edit, not a code change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeeSchedule {
    /// Taker fee rate applied to profit potential (7%)
    pub taker_rate: Decimal,
    /// Maker fee rate applied to profit potential (1.75%)
    pub maker_rate: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            taker_rate: Decimal::new(7, 2),    // 0.07
            maker_rate: Decimal::new(175, 4),  // 0.0175
        }
    }
}

impl FeeSchedule {
    /// Rate for the given order type.
    pub fn rate(&self, fee_type: FeeType) -> Decimal {
        match fee_type {
            FeeType::Taker => self.taker_rate,
            FeeType::Maker => self.maker_rate,
        }
    }

    /// Estimate the fee for an order from the published schedule.
    ///
    /// Per contract the base fee is `rate * price * (1 - price)`. The total
    /// across the order is rounded up to the nearest cent, and the effective
    /// per-contract figure is that total divided back by the quantity.
    ///
    /// # Example (worked)
    ///
    /// Taker at price 0.50, 10 contracts: base = `0.07 * 0.5 * 0.5` =
    /// 0.0175/contract; total before rounding = 0.175; rounded up = 0.18;
    /// effective per-contract = 0.018.
    pub fn estimate(
        &self,
        price: Decimal,
        quantity: u32,
        fee_type: FeeType,
    ) -> Result<FeeEstimate, FeeError> {
        if price <= Decimal::ZERO || price > Decimal::ONE {
            return Err(FeeError::InvalidPrice(price));
        }
        if quantity == 0 {
            return Err(FeeError::InvalidQuantity);
        }

        let base_per_contract = self.rate(fee_type) * price * (Decimal::ONE - price);
        let total_fee = (base_per_contract * Decimal::from(quantity))
            .round_dp_with_strategy(2, RoundingStrategy::ToPositiveInfinity);
        let per_contract_fee = total_fee / Decimal::from(quantity);

        Ok(FeeEstimate {
            fee_type,
            base_per_contract,
            total_fee,
            per_contract_fee,
        })
    }
}

/// A fee estimate derived from the published schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeeEstimate {
    /// Order type the estimate assumed
    pub fee_type: FeeType,
    /// Unrounded per-contract base: `rate * price * (1 - price)`
    pub base_per_contract: Decimal,
    /// Order total, rounded up to the cent
    pub total_fee: Decimal,
    /// Effective per-contract fee: total / quantity
    pub per_contract_fee: Decimal,
}

/// A fee observation attached to a parsed ticket.
///
/// Either or both of the total and per-contract figures may be present,
/// depending on what the ticket displayed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeeInfo {
    /// Total fee across the order
    pub total_fee: Option<Decimal>,
    /// Fee per contract
    pub per_contract_fee: Option<Decimal>,
    /// Where the figures came from
    pub source: FeeSource,
    /// The text the figures were read from, when ticket-sourced
    pub raw_text: Option<String>,
}

impl FeeInfo {
    /// Fee read off the ticket.
    pub fn from_ticket(
        total_fee: Option<Decimal>,
        per_contract_fee: Option<Decimal>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            total_fee,
            per_contract_fee,
            source: FeeSource::Ticket,
            raw_text: Some(raw_text.into()),
        }
    }

    /// Fee synthesized from a schedule estimate.
    pub fn estimated(estimate: FeeEstimate) -> Self {
        Self {
            total_fee: Some(estimate.total_fee),
            per_contract_fee: Some(estimate.per_contract_fee),
            source: FeeSource::Estimated,
            raw_text: None,
        }
    }

    /// True when the figures were computed rather than read off the ticket.
    pub fn is_estimated(&self) -> bool {
        self.source == FeeSource::Estimated
    }

    /// Best available per-contract figure, deriving it from the total when
    /// only the total was displayed.
    pub fn effective_per_contract(&self, quantity: Option<u32>) -> Option<Decimal> {
        if let Some(per) = self.per_contract_fee {
            return Some(per);
        }
        match (self.total_fee, quantity) {
            (Some(total), Some(qty)) if qty > 0 => Some(total / Decimal::from(qty)),
            _ => None,
        }
    }

    /// Distance between the displayed total and `per_contract * quantity`,
    /// when both figures are present. The caller treats a gap above its
    /// tolerance as a warning, not a failure.
    pub fn consistency_gap(&self, quantity: u32) -> Option<Decimal> {
        match (self.total_fee, self.per_contract_fee) {
            (Some(total), Some(per)) => Some((total - per * Decimal::from(quantity)).abs()),
            _ => None,
        }
    }

    /// Bound-check the contained figures.
    pub fn validate(&self) -> Result<(), validate::ValidationError> {
        if let Some(total) = self.total_fee {
            validate::fee(total)?;
        }
        if let Some(per) = self.per_contract_fee {
            validate::fee(per)?;
        }
        Ok(())
    }
}
