//! Outbound display records.
//!
//! Pure mapping from a parsed ticket and user settings to what the host's
//! rendering layer shows. Two contracts hold unconditionally: a ticket that
//! cannot proceed renders as unavailable, never as stale or guessed values;
//! and anything derived from an estimated fee carries the estimated marker.

use crate::config::{DisplayMode, EngineConfig, Settings};
use crate::fallback::{detect_for_ticket, FallbackReport};
use crate::orchestrator::TicketData;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ticketlens_pricing::{
    calculate_after_fee_odds, format_american_odds, probability_to_american_odds, AfterFeeQuote,
    FeeSource,
};

/// After-fee numbers plus their provenance, for the after-fee renderer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AfterFeeView {
    pub quote: AfterFeeQuote,
    pub fee_source: FeeSource,
    /// Confidence that the fee is a fallback figure, from the detector
    pub fallback_confidence: Decimal,
}

/// One rendered value, ready for the host layer to place in the page.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RenderedValue {
    pub text: String,
    /// Hard contract: true whenever the underlying fee was estimated
    pub estimated: bool,
    /// Transparency notes for the tooltip, when there are any
    pub tooltip: Option<String>,
    /// Present in after-fee mode when a quote was produced
    pub after_fee: Option<AfterFeeView>,
}

/// What the display layer should show.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum DisplayState {
    /// Show a neutral placeholder; the ticket is unusable or the order
    /// cannot profit
    Unavailable,
    Ready(RenderedValue),
}

/// Render a parsed ticket under the user's display settings.
pub fn render(ticket: &TicketData, settings: &Settings, config: &EngineConfig) -> DisplayState {
    if !ticket.summary.can_proceed {
        return DisplayState::Unavailable;
    }
    let Some(price) = ticket.price.as_ref().map(|p| p.value) else {
        return DisplayState::Unavailable;
    };

    match settings.display_mode {
        DisplayMode::Percent => DisplayState::Ready(RenderedValue {
            text: percent_text(price),
            estimated: false,
            tooltip: None,
            after_fee: None,
        }),
        DisplayMode::RawAmerican => match probability_to_american_odds(price) {
            Ok(odds) => DisplayState::Ready(RenderedValue {
                text: format_american_odds(odds),
                estimated: false,
                tooltip: None,
                after_fee: None,
            }),
            Err(_) => DisplayState::Unavailable,
        },
        DisplayMode::AfterFeeAmerican => render_after_fee(ticket, price, config),
    }
}

fn render_after_fee(ticket: &TicketData, price: Decimal, config: &EngineConfig) -> DisplayState {
    let Some(fee_per_contract) = ticket.fee_per_contract() else {
        // No fee figure at all (estimation disabled): fall back to the raw
        // odds and say so, rather than silently pretending fees are zero
        return match probability_to_american_odds(price) {
            Ok(odds) => DisplayState::Ready(RenderedValue {
                text: format_american_odds(odds),
                estimated: false,
                tooltip: Some("no fee information available; showing raw odds".to_string()),
                after_fee: None,
            }),
            Err(_) => DisplayState::Unavailable,
        };
    };

    let quote = match calculate_after_fee_odds(price, fee_per_contract) {
        Ok(quote) => quote,
        // Unprofitable or degenerate order: neutral state, no guessed value
        Err(_) => return DisplayState::Unavailable,
    };

    let fee_source = ticket
        .fee
        .as_ref()
        .map(|fee| fee.value.source)
        .unwrap_or(FeeSource::Ticket);
    let report = detect_for_ticket(ticket, &config.fallback);
    let estimated = fee_source == FeeSource::Estimated
        || report.as_ref().is_some_and(|r| r.is_using_fallback);

    DisplayState::Ready(RenderedValue {
        text: format_american_odds(quote.after_fee_odds),
        estimated,
        tooltip: tooltip_from(report.as_ref()),
        after_fee: Some(AfterFeeView {
            quote,
            fee_source,
            fallback_confidence: report.map(|r| r.confidence).unwrap_or(Decimal::ZERO),
        }),
    })
}

fn tooltip_from(report: Option<&FallbackReport>) -> Option<String> {
    let report = report?;
    if report.reasons.is_empty() {
        return None;
    }
    Some(report.reasons.join("; "))
}

fn percent_text(price: Decimal) -> String {
    let percent = (price * Decimal::ONE_HUNDRED).round_dp(1).normalize();
    format!("{percent}%")
}
