//! Configuration types for the ticket engine.

use crate::detect::DetectionConfig;
use crate::fallback::FallbackHeuristics;
use crate::retry::RetryPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ticketlens_pricing::{FeeSchedule, FeeType};

/// How derived odds are rendered for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    /// Implied probability as a percentage
    Percent,
    /// American odds from the price alone
    RawAmerican,
    /// American odds with the fee folded into the stake
    AfterFeeAmerican,
}

/// User settings, as stored by the host's settings layer.
///
/// The field and variant names are the storage wire shape, hence camelCase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub display_mode: DisplayMode,
    /// Whether a missing fee may be estimated from the published schedule
    pub fallback_estimate_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::AfterFeeAmerican,
            fallback_estimate_enabled: true,
        }
    }
}

/// Thresholds used by the field parsers.
///
/// These are heuristics without a derivation; they are configuration so they
/// can be recalibrated against captured page fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParseHeuristics {
    /// Weak structural signals that must agree before an unlabeled input is
    /// trusted as the quantity field
    pub min_weak_indicators: u32,
    /// Minimum selection score for the side parser's scored fallback
    pub min_side_score: u32,
    /// Longest text node the fee and price text scans will read
    pub max_fee_text_len: usize,
}

impl Default for ParseHeuristics {
    fn default() -> Self {
        Self {
            min_weak_indicators: 2,
            min_side_score: 2,
            max_fee_text_len: 120,
        }
    }
}

/// Everything the engine needs beyond user settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Wait before the recovery re-parse, letting async UI population settle
    pub recovery_delay: Duration,
    /// Window for coalescing rapid content-change notifications
    pub debounce_window: Duration,
    /// How many ancestor levels recovery searches above the ticket
    pub max_ancestor_levels: usize,
    /// Order value above which a warning is recorded
    pub max_order_value: Decimal,
    /// Odds magnitude above which a warning is recorded
    pub extreme_odds_magnitude: i32,
    /// Allowed gap between displayed total and per-contract * quantity
    pub fee_consistency_tolerance: Decimal,
    /// Order type assumed when estimating a missing fee
    pub default_fee_type: FeeType,
    pub fee_schedule: FeeSchedule,
    pub heuristics: ParseHeuristics,
    pub detection: DetectionConfig,
    pub retry: RetryPolicy,
    pub fallback: FallbackHeuristics,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recovery_delay: Duration::from_millis(500),
            debounce_window: Duration::from_millis(150),
            max_ancestor_levels: 3,
            max_order_value: Decimal::from(10_000),
            extreme_odds_magnitude: 5000,
            fee_consistency_tolerance: Decimal::new(1, 2), // 0.01
            default_fee_type: FeeType::Taker,
            fee_schedule: FeeSchedule::default(),
            heuristics: ParseHeuristics::default(),
            detection: DetectionConfig::default(),
            retry: RetryPolicy::default(),
            fallback: FallbackHeuristics::default(),
        }
    }
}

/// Explicit context threaded through every parse entry point.
///
/// There is no module-global state; whoever drives the engine owns the
/// settings and config and lends them out per call.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub settings: &'a Settings,
    pub config: &'a EngineConfig,
}

impl<'a> ParseContext<'a> {
    pub fn new(settings: &'a Settings, config: &'a EngineConfig) -> Self {
        Self { settings, config }
    }
}
