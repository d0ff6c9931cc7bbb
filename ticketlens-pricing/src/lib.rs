//! Odds Conversion and Fee Mathematics for the Ticketlens Order-Assist Engine
//!
//! This crate provides the pure calculation layer used by `ticketlens-engine`:
//! conversion between implied probability and American odds, after-fee odds
//! for a priced order, and fee estimation from the venue's published schedule.
//!
//! Uses rust_decimal for exact precision in financial calculations.
//!
//! # Key Components
//!
//! - [`probability_to_american_odds`] / [`american_odds_to_probability`]:
//!   conversions between the two representations of the same quantity
//! - [`calculate_after_fee_odds`]: American odds recomputed with the
//!   transaction fee folded into the effective stake
//! - [`FeeSchedule`]: published taker/maker fee rates and the per-contract
//!   estimate derived from them
//! - [`FeeInfo`]: a fee observation, either read off the ticket or estimated
//! - [`validate`]: bound-checks every raw number before calculation sees it
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketlens_pricing::{calculate_after_fee_odds, FeeSchedule, FeeType};
//! use rust_decimal_macros::dec;
//!
//! // Buying at 40c with a 3c per-contract fee risks 43c to win 57c
//! let quote = calculate_after_fee_odds(dec!(0.40), dec!(0.03)).unwrap();
//! assert_eq!(quote.after_fee_odds, 133);
//!
//! // No ticket-sourced fee available: estimate from the published schedule
//! let schedule = FeeSchedule::default();
//! let estimate = schedule.estimate(dec!(0.50), 10, FeeType::Taker).unwrap();
//! assert_eq!(estimate.total_fee, dec!(0.18));
//! ```
//!
//! # Fee Model
//!
//! The venue charges a fraction of profit potential per contract:
//!
//! - **Taker**: `0.07 * price * (1 - price)`
//! - **Maker**: `0.0175 * price * (1 - price)`
//!
//! The quadratic term peaks at a price of 0.50, so fees are highest for
//! even-odds contracts. Totals are rounded up to the nearest cent before the
//! effective per-contract figure is derived.

pub mod convert;
pub mod fees;
pub mod validate;

// Re-exports for convenience
pub use convert::{
    american_odds_to_probability, calculate_after_fee_odds, format_american_odds,
    probability_to_american_odds, AfterFeeQuote, ConvertError,
};
pub use fees::{FeeEstimate, FeeError, FeeInfo, FeeSchedule, FeeSource, FeeType};
pub use validate::ValidationError;
