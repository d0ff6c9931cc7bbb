//! Fallback-usage detection for fee figures.
//!
//! Classifies whether a fee was read off the ticket or estimated, with a
//! confidence score, so displays can label estimates. This never alters a
//! numeric result; it only labels.

use crate::orchestrator::{RecoveryStep, TicketData};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ticketlens_pricing::{FeeInfo, FeeSource};

/// Text fragments that reveal an estimated or unparsed fee.
const FALLBACK_TEXT_PATTERNS: &[&str] = &["estimated", "fallback", "could not parse"];

/// Weights and thresholds for the classifier.
///
/// The secondary weights are uncalibrated heuristics; they live here rather
/// than in the code so they can be tuned against captured fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FallbackHeuristics {
    /// Confidence when the fee source itself says "estimated"
    pub estimated_source_confidence: Decimal,
    /// Added when the fee lands exactly on a suspiciously round value
    pub round_value_weight: Decimal,
    /// Added when the ticket's quantity was defaulted rather than parsed
    pub default_quantity_weight: Decimal,
    /// Added when the record shows schedule-formula recovery context
    pub formula_context_weight: Decimal,
    /// Floor confidence when fallback wording appears in source text
    pub text_signal_confidence: Decimal,
    /// Cumulative confidence at which the fee is flagged as fallback
    pub flag_threshold: Decimal,
    /// Flag threshold when the text signal fired
    pub text_flag_threshold: Decimal,
    /// Fee values that look defaulted rather than computed
    pub suspicious_round_values: Vec<Decimal>,
}

impl Default for FallbackHeuristics {
    fn default() -> Self {
        Self {
            estimated_source_confidence: Decimal::new(95, 2), // 0.95
            round_value_weight: Decimal::new(30, 2),          // 0.30
            default_quantity_weight: Decimal::new(20, 2),     // 0.20
            formula_context_weight: Decimal::new(25, 2),      // 0.25
            text_signal_confidence: Decimal::new(40, 2),      // 0.40
            flag_threshold: Decimal::new(50, 2),              // 0.50
            text_flag_threshold: Decimal::new(40, 2),         // 0.40
            suspicious_round_values: vec![
                Decimal::new(1, 2),  // 0.01
                Decimal::new(2, 2),  // 0.02
                Decimal::new(5, 2),  // 0.05
                Decimal::new(10, 2), // 0.10
                Decimal::new(25, 2), // 0.25
            ],
        }
    }
}

/// Circumstances surrounding the fee, beyond the [`FeeInfo`] itself.
#[derive(Debug, Clone, Default)]
pub struct FallbackContext {
    /// The ticket's quantity was defaulted, not parsed
    pub quantity_defaulted: bool,
    /// The record shows the fee came through schedule-formula recovery
    pub formula_context: bool,
    /// Additional raw text to scan for fallback wording
    pub source_texts: Vec<String>,
}

impl FallbackContext {
    /// Derive the context from a parsed ticket record.
    pub fn from_ticket(ticket: &TicketData) -> Self {
        Self {
            quantity_defaulted: ticket
                .quantity
                .as_ref()
                .is_some_and(|q| q.strategy == "default_one"),
            formula_context: ticket.recovery.contains(&RecoveryStep::EstimatedFee),
            source_texts: Vec::new(),
        }
    }
}

/// Classification result, for tooltip text and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FallbackReport {
    pub is_using_fallback: bool,
    /// Cumulative confidence in [0, 1]
    pub confidence: Decimal,
    pub reasons: Vec<String>,
}

/// Classify whether a fee figure is ticket-sourced or a fallback estimate.
pub fn detect_fallback_fee_usage(
    fee: &FeeInfo,
    context: &FallbackContext,
    heuristics: &FallbackHeuristics,
) -> FallbackReport {
    let mut confidence = Decimal::ZERO;
    let mut reasons = Vec::new();

    if fee.source == FeeSource::Estimated {
        confidence = heuristics.estimated_source_confidence;
        reasons.push("fee was computed from the published schedule".to_string());
    } else {
        let values = [fee.per_contract_fee, fee.total_fee];
        let round_hit = values
            .iter()
            .flatten()
            .copied()
            .find(|v| heuristics.suspicious_round_values.contains(v));
        if let Some(value) = round_hit {
            confidence += heuristics.round_value_weight;
            reasons.push(format!("fee {value} lands exactly on a common default"));
        }
        if context.quantity_defaulted {
            confidence += heuristics.default_quantity_weight;
            reasons.push("ticket quantity was defaulted, not parsed".to_string());
        }
        if context.formula_context {
            confidence += heuristics.formula_context_weight;
            reasons.push("record shows schedule-formula recovery".to_string());
        }
    }

    let text_hit = fee
        .raw_text
        .iter()
        .map(String::as_str)
        .chain(context.source_texts.iter().map(String::as_str))
        .any(|text| {
            let lowered = text.to_lowercase();
            FALLBACK_TEXT_PATTERNS
                .iter()
                .any(|pattern| lowered.contains(pattern))
        });
    if text_hit {
        confidence = confidence.max(heuristics.text_signal_confidence);
        reasons.push("source text carries estimate wording".to_string());
    }

    confidence = confidence.min(Decimal::ONE);
    let is_using_fallback = confidence >= heuristics.flag_threshold
        || (text_hit && confidence >= heuristics.text_flag_threshold);

    FallbackReport {
        is_using_fallback,
        confidence,
        reasons,
    }
}

/// Classify the fee carried by a ticket record, when it has one.
pub fn detect_for_ticket(
    ticket: &TicketData,
    heuristics: &FallbackHeuristics,
) -> Option<FallbackReport> {
    let fee = ticket.fee.as_ref()?;
    let context = FallbackContext::from_ticket(ticket);
    Some(detect_fallback_fee_usage(&fee.value, &context, heuristics))
}
