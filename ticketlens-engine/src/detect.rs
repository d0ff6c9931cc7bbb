//! Ticket container detection.
//!
//! Host pages render the order-entry UI asynchronously and restructure it
//! without notice, so the engine locates it with layered strategies: known
//! structural signals first, then keyword-density scoring, then a broad scan
//! over input/button clusters. Detection failure is reported, not fatal; the
//! rest of the page integration keeps working without a ticket context.

use crate::parse::has_token;
use crate::retry::{retry, RetryError, RetryPolicy};
use crate::tree::TicketNode;
use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Supplier of host-page snapshots.
///
/// Implemented by the DOM integration layer; the engine only ever sees owned
/// trees, never live handles.
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Snapshot of the whole document, or `None` when the page is not ready.
    async fn document(&self) -> Option<TicketNode>;
}

/// Errors produced when the ticket container cannot be located.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectError {
    #[error("ticket container not found after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("ticket detection timed out after {limit:?}")]
    Timeout { limit: Duration },
}

impl From<RetryError> for DetectError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Exhausted { attempts } => DetectError::RetriesExhausted { attempts },
            RetryError::TimedOut { limit } => DetectError::Timeout { limit },
        }
    }
}

/// Scoring thresholds for container detection.
///
/// The weights are calibration targets, not derived constants; they are
/// configuration so they can be tuned against captured page fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DetectionConfig {
    /// Minimum score for a container to be accepted as the ticket
    pub min_container_score: u32,
    /// How many ranked candidates recovery re-parses before giving up
    pub max_candidates: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_container_score: 6,
            max_candidates: 3,
        }
    }
}

/// Keywords whose density marks order-entry UI.
const TICKET_KEYWORDS: &[&str] = &[
    "yes", "no", "price", "limit", "quantity", "contracts", "shares", "fee", "order", "buy",
    "sell",
];

/// Keyword, field-shape, and structural score for one candidate container.
pub(crate) fn score_container(node: &TicketNode) -> u32 {
    let mut score = 0;

    if node.attr("role") == Some("dialog") || node.attr("aria-modal") == Some("true") {
        score += 4;
    }

    let text = node.visible_text();
    score += TICKET_KEYWORDS
        .iter()
        .filter(|keyword| has_token(&text, keyword))
        .count() as u32;

    let inputs = node.inputs().len() as u32;
    let buttons = node.descendants().filter(|n| n.is_button()).count() as u32;
    score += inputs.min(3) + buttons.min(3);

    // Field shape: a decimal-valued input and an integer-valued input
    // together look like price + quantity
    let has_decimal_input = node
        .inputs()
        .iter()
        .any(|i| i.value.as_deref().is_some_and(|v| v.contains('.')));
    let has_integer_input = node.inputs().iter().any(|i| {
        i.value
            .as_deref()
            .is_some_and(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
    });
    if has_decimal_input && has_integer_input {
        score += 2;
    }

    score
}

/// All containers that could plausibly host a ticket, scored and ranked
/// best-first. Only containers with both an input and a side keyword are
/// candidates at all.
pub(crate) fn rank_candidates<'a>(
    document: &'a TicketNode,
    config: &DetectionConfig,
) -> Vec<(&'a TicketNode, u32)> {
    document
        .descendants()
        .filter(|node| !node.children.is_empty())
        .filter(|node| !node.inputs().is_empty() || node.descendants().any(|n| n.is_button()))
        .map(|node| (node, score_container(node)))
        .filter(|(_, score)| *score >= config.min_container_score)
        // Tightest container wins a score tie, so a scoring ancestor never
        // shadows the actual panel inside it
        .sorted_by_key(|(node, score)| (std::cmp::Reverse(*score), node.descendants().count()))
        .collect()
}

/// Locate the ticket container in a document snapshot.
///
/// Layered: explicit dialog/modal roles win outright when they score at all;
/// otherwise the best-scoring candidate container above the threshold is
/// taken.
pub fn find_ticket<'a>(
    document: &'a TicketNode,
    config: &DetectionConfig,
) -> Option<&'a TicketNode> {
    // Layer 1: structural signal
    let dialog = document
        .descendants()
        .filter(|node| {
            node.attr("role") == Some("dialog") || node.attr("aria-modal") == Some("true")
        })
        .find(|node| {
            !node.inputs().is_empty()
                && (has_token(&node.visible_text(), "yes") || has_token(&node.visible_text(), "no"))
        });
    if let Some(node) = dialog {
        debug!("ticket located by dialog role");
        return Some(node);
    }

    // Layers 2 and 3: scored candidates over keyword density and field shape
    let ranked = rank_candidates(document, config);
    if let Some((node, score)) = ranked.first() {
        debug!(score, "ticket located by container scoring");
        return Some(node);
    }
    None
}

/// Locate the ticket, waiting out asynchronous rendering.
///
/// Retries with exponential backoff per the policy. Exhausting retries is a
/// detection failure the caller reports once and survives.
pub async fn detect_ticket<S: TicketSource>(
    source: &S,
    policy: &RetryPolicy,
    config: &DetectionConfig,
) -> Result<TicketNode, DetectError> {
    let result = retry(policy, || async {
        let document = source.document().await?;
        find_ticket(&document, config).cloned()
    })
    .await;

    match result {
        Ok(ticket) => Ok(ticket),
        Err(err) => {
            warn!(%err, "ticket detection gave up");
            Err(err.into())
        }
    }
}
