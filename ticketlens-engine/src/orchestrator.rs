//! Ticket data orchestration.
//!
//! Runs every field parser independently, folds the partial results into one
//! [`TicketData`] record, validates cross-field consistency, and drives the
//! recovery ladder when a parse comes back incomplete. A failure in one
//! field never prevents the others from being attempted; partial data is
//! always returned.

use crate::config::ParseContext;
use crate::detect::{find_ticket, rank_candidates, TicketSource};
use crate::parse::side::Side;
use crate::parse::{fee, price, quantity, side, FieldOutcome, ParsedField};
use crate::tree::{path_to, TicketNode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ticketlens_pricing::{probability_to_american_odds, FeeInfo};
use tokio::time::sleep;
use tracing::{debug, info};

/// Recovery measures, recorded on the ticket record in the order applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStep {
    /// Waited for async UI population and re-parsed
    DelayedRetry,
    /// Re-parsed an ancestor container `levels` above the detected ticket
    AncestorSearch { levels: usize },
    /// Re-parsed ranked ticket-shaped containers across the whole document
    DocumentScan,
    /// Quantity defaulted to 1 with the other core fields present
    DefaultQuantity,
    /// Missing fee synthesized from the published schedule
    EstimatedFee,
}

/// Aggregate validity of one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ValidationSummary {
    pub critical_error_count: usize,
    pub warning_count: usize,
    /// True when side, price, and quantity are all present. Fee problems
    /// never clear this; fee is supplementary.
    pub can_proceed: bool,
}

/// Everything one parse attempt learned about the order ticket.
///
/// Created fresh on every parse; the next parse supersedes it entirely.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TicketData {
    pub side: Option<ParsedField<Side>>,
    pub price: Option<ParsedField<Decimal>>,
    pub quantity: Option<ParsedField<u32>>,
    pub fee: Option<ParsedField<FeeInfo>>,
    /// True only when side, price, and quantity are present and valid
    pub is_valid: bool,
    /// Messages for fields that could not be parsed
    pub errors: Vec<String>,
    /// Non-blocking consistency findings
    pub warnings: Vec<String>,
    pub summary: ValidationSummary,
    /// Recovery measures applied to produce this record
    pub recovery: Vec<RecoveryStep>,
    pub parsed_at: DateTime<Utc>,
}

impl TicketData {
    /// Record for a page where no ticket could be found at all.
    fn unavailable() -> Self {
        let errors = vec!["order ticket not present in the document".to_string()];
        Self {
            side: None,
            price: None,
            quantity: None,
            fee: None,
            is_valid: false,
            summary: ValidationSummary {
                critical_error_count: errors.len(),
                warning_count: 0,
                can_proceed: false,
            },
            errors,
            warnings: Vec::new(),
            recovery: Vec::new(),
            parsed_at: Utc::now(),
        }
    }

    /// How much of the record is filled in; used to pick the best candidate
    /// across recovery attempts. Core fields dominate, fee breaks ties.
    fn completeness(&self) -> u32 {
        let core = [
            self.side.is_some(),
            self.price.is_some(),
            self.quantity.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count() as u32;
        core * 2 + u32::from(self.fee.is_some())
    }

    /// The fee per contract this ticket implies, deriving from the total
    /// when only the total was displayed.
    pub fn fee_per_contract(&self) -> Option<Decimal> {
        let quantity = self.quantity.as_ref().map(|q| q.value);
        self.fee
            .as_ref()
            .and_then(|fee| fee.value.effective_per_contract(quantity))
    }

    /// True when the fee on this record was estimated rather than parsed.
    pub fn fee_is_estimated(&self) -> bool {
        self.fee.as_ref().is_some_and(|fee| fee.value.is_estimated())
    }
}

/// Raw per-field results of one pass over a subtree.
struct FieldOutcomes {
    side: FieldOutcome<Side>,
    price: FieldOutcome<Decimal>,
    quantity: FieldOutcome<u32>,
    fee: FieldOutcome<FeeInfo>,
}

fn run_parsers(root: &TicketNode, ctx: &ParseContext<'_>) -> FieldOutcomes {
    let heuristics = &ctx.config.heuristics;
    FieldOutcomes {
        side: side::parse(root, heuristics),
        price: price::parse(root, heuristics),
        quantity: quantity::parse(root, heuristics),
        fee: fee::parse(root, heuristics),
    }
}

/// Synthesize an estimated fee when the ticket displayed none.
///
/// Requires the user setting, plus a price and quantity to feed the
/// schedule. The synthetic field is marked so every consumer can label it.
fn synthesize_missing_fee(
    outcomes: &mut FieldOutcomes,
    recovery: &mut Vec<RecoveryStep>,
    ctx: &ParseContext<'_>,
) {
    if outcomes.fee.found.is_some() || !ctx.settings.fallback_estimate_enabled {
        return;
    }
    let (Some(price), Some(quantity)) = (
        outcomes.price.found.as_ref().map(|p| p.value),
        outcomes.quantity.found.as_ref().map(|q| q.value),
    ) else {
        return;
    };

    match ctx
        .config
        .fee_schedule
        .estimate(price, quantity, ctx.config.default_fee_type)
    {
        Ok(estimate) => {
            debug!(%price, quantity, "fee missing from ticket, synthesized from schedule");
            outcomes.fee.found = Some(ParsedField::synthetic(
                FeeInfo::estimated(estimate),
                "schedule_estimate",
            ));
            outcomes
                .fee
                .notes
                .push("fee estimated from the published schedule".to_string());
            recovery.push(RecoveryStep::EstimatedFee);
        }
        Err(err) => outcomes.fee.notes.push(format!("fee estimate unavailable: {err}")),
    }
}

/// Fold field outcomes into a validated record.
fn build(outcomes: &FieldOutcomes, recovery: Vec<RecoveryStep>, ctx: &ParseContext<'_>) -> TicketData {
    let mut errors = Vec::new();
    if outcomes.side.found.is_none() {
        errors.push("side could not be determined from the ticket".to_string());
    }
    if outcomes.price.found.is_none() {
        errors.push("limit price could not be determined from the ticket".to_string());
    }
    if outcomes.quantity.found.is_none() {
        errors.push("quantity could not be determined from the ticket".to_string());
    }

    let mut warnings: Vec<String> = Vec::new();
    warnings.extend(outcomes.side.notes.iter().cloned());
    warnings.extend(outcomes.price.notes.iter().cloned());
    warnings.extend(outcomes.quantity.notes.iter().cloned());
    warnings.extend(outcomes.fee.notes.iter().cloned());

    cross_field_warnings(outcomes, ctx, &mut warnings);

    let can_proceed = outcomes.side.found.is_some()
        && outcomes.price.found.is_some()
        && outcomes.quantity.found.is_some();

    TicketData {
        side: outcomes.side.found.clone(),
        price: outcomes.price.found.clone(),
        quantity: outcomes.quantity.found.clone(),
        fee: outcomes.fee.found.clone(),
        is_valid: can_proceed,
        summary: ValidationSummary {
            critical_error_count: errors.len(),
            warning_count: warnings.len(),
            can_proceed,
        },
        errors,
        warnings,
        recovery,
        parsed_at: Utc::now(),
    }
}

/// Consistency checks across fields. Findings are warnings, never blockers.
fn cross_field_warnings(
    outcomes: &FieldOutcomes,
    ctx: &ParseContext<'_>,
    warnings: &mut Vec<String>,
) {
    if let (Some(fee), Some(quantity)) = (&outcomes.fee.found, &outcomes.quantity.found) {
        if let Some(gap) = fee.value.consistency_gap(quantity.value) {
            if gap > ctx.config.fee_consistency_tolerance {
                warnings.push(format!(
                    "displayed total fee disagrees with per-contract fee x quantity by {gap}"
                ));
            }
        }
    }

    if let (Some(price), Some(quantity)) = (&outcomes.price.found, &outcomes.quantity.found) {
        let order_value = price.value * Decimal::from(quantity.value);
        if order_value > ctx.config.max_order_value {
            warnings.push(format!("order value {order_value} exceeds the sanity bound"));
        }
    }

    if let Some(price) = &outcomes.price.found {
        if let Ok(odds) = probability_to_american_odds(price.value) {
            if odds.unsigned_abs() >= ctx.config.extreme_odds_magnitude.unsigned_abs() {
                warnings.push(format!("odds magnitude {odds} is extreme for this venue"));
            }
        }
    }
}

/// Parse one ticket subtree into a [`TicketData`].
///
/// Every parser runs regardless of the others' results. A missing fee is
/// estimated here when settings allow it, so both the direct and the
/// recovery path label estimates the same way.
pub fn parse_ticket(root: &TicketNode, ctx: &ParseContext<'_>) -> TicketData {
    let mut outcomes = run_parsers(root, ctx);
    let mut recovery = Vec::new();
    synthesize_missing_fee(&mut outcomes, &mut recovery, ctx);
    build(&outcomes, recovery, ctx)
}

/// Locate the ticket in the current document and parse it.
async fn parse_current<S: TicketSource>(
    source: &S,
    ctx: &ParseContext<'_>,
) -> Option<TicketData> {
    let document = source.document().await?;
    let ticket = find_ticket(&document, &ctx.config.detection)?;
    Some(parse_ticket(ticket, ctx))
}

/// Keep whichever record is more usable.
fn better_of(current: TicketData, candidate: TicketData) -> TicketData {
    let rating =
        |data: &TicketData| (u32::from(data.summary.can_proceed), data.completeness());
    if rating(&candidate) > rating(&current) {
        candidate
    } else {
        current
    }
}

/// Recompute validity after a recovery mutation filled a field in.
fn revalidate(data: &mut TicketData) {
    data.errors.clear();
    if data.side.is_none() {
        data.errors
            .push("side could not be determined from the ticket".to_string());
    }
    if data.price.is_none() {
        data.errors
            .push("limit price could not be determined from the ticket".to_string());
    }
    if data.quantity.is_none() {
        data.errors
            .push("quantity could not be determined from the ticket".to_string());
    }
    let can_proceed = data.side.is_some() && data.price.is_some() && data.quantity.is_some();
    data.is_valid = can_proceed;
    data.summary = ValidationSummary {
        critical_error_count: data.errors.len(),
        warning_count: data.warnings.len(),
        can_proceed,
    };
}

fn finish(mut data: TicketData, applied: Vec<RecoveryStep>) -> TicketData {
    if !applied.is_empty() {
        info!(steps = ?applied, "ticket parse required recovery");
    }
    let mut recovery = applied;
    recovery.append(&mut data.recovery);
    data.recovery = recovery;
    data
}

/// Parse the current ticket, escalating through the recovery ladder until a
/// usable record is produced or the ladder is exhausted.
///
/// The ladder, in order: a delayed re-parse for async UI population, the
/// detected ticket's ancestors, ticket-shaped containers anywhere in the
/// document, a defaulted quantity when only the quantity is missing, and a
/// schedule-estimated fee. It stops at the first step that makes the record
/// usable; every applied step is recorded on the result.
pub async fn parse_with_recovery<S: TicketSource>(
    source: &S,
    ctx: &ParseContext<'_>,
) -> TicketData {
    let first = match parse_current(source, ctx).await {
        Some(data) => data,
        None => TicketData::unavailable(),
    };
    if first.summary.can_proceed {
        return first;
    }

    let mut applied: Vec<RecoveryStep> = Vec::new();
    let mut best = first;

    // (a) One-shot delayed retry, letting async population settle
    sleep(ctx.config.recovery_delay).await;
    applied.push(RecoveryStep::DelayedRetry);
    if let Some(data) = parse_current(source, ctx).await {
        best = better_of(best, data);
        if best.summary.can_proceed {
            return finish(best, applied);
        }
    }

    if let Some(document) = source.document().await {
        // (b) Ancestors of the detected ticket, nearest first
        if let Some(ticket) = find_ticket(&document, &ctx.config.detection) {
            let path = path_to(&document, ticket);
            let ancestors = path
                .iter()
                .rev()
                .skip(1)
                .take(ctx.config.max_ancestor_levels);
            for (index, ancestor) in ancestors.enumerate() {
                applied.push(RecoveryStep::AncestorSearch { levels: index + 1 });
                best = better_of(best, parse_ticket(ancestor, ctx));
                if best.summary.can_proceed {
                    return finish(best, applied);
                }
            }
        }

        // (c) Ticket-shaped containers anywhere in the document
        applied.push(RecoveryStep::DocumentScan);
        let candidates = rank_candidates(&document, &ctx.config.detection);
        for (candidate, score) in candidates
            .into_iter()
            .take(ctx.config.detection.max_candidates)
        {
            debug!(score, "re-parsing ranked candidate container");
            best = better_of(best, parse_ticket(candidate, ctx));
            if best.summary.can_proceed {
                return finish(best, applied);
            }
        }
    }

    // (d) Quantity alone missing: a single contract is the ticket's own
    // default state
    if best.side.is_some() && best.price.is_some() && best.quantity.is_none() {
        applied.push(RecoveryStep::DefaultQuantity);
        best.quantity = Some(ParsedField::synthetic(1, "default_one"));
        best.warnings.push("quantity defaulted to 1".to_string());
        revalidate(&mut best);
    }

    // (e) Fee still missing with a now-complete core: estimate it
    if best.fee.is_none() && ctx.settings.fallback_estimate_enabled {
        if let (Some(price), Some(quantity)) = (&best.price, &best.quantity) {
            if let Ok(estimate) = ctx.config.fee_schedule.estimate(
                price.value,
                quantity.value,
                ctx.config.default_fee_type,
            ) {
                applied.push(RecoveryStep::EstimatedFee);
                best.fee = Some(ParsedField::synthetic(
                    FeeInfo::estimated(estimate),
                    "schedule_estimate",
                ));
                best.warnings
                    .push("fee estimated from the published schedule".to_string());
                revalidate(&mut best);
            }
        }
    }

    finish(best, applied)
}
