//! Field parsers for the order ticket.
//!
//! Every field follows the same shape: a primary strategy reading structural
//! hints off the subtree, then fallbacks of decreasing specificity. The
//! first strategy to return a validated value wins, and which one won is
//! recorded so downstream consumers can tell primary data from fallback
//! data.

pub mod fee;
pub mod price;
pub mod quantity;
pub mod side;

use crate::tree::TicketNode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::debug;

/// One extraction strategy for a ticket field.
///
/// Strategies are pure over the subtree snapshot: same tree in, same answer
/// out. An ordered list of them forms a field parser.
pub trait FieldStrategy {
    type Output;

    /// Stable identifier recorded on successful extractions.
    fn name(&self) -> &'static str;

    /// Extract a validated value, or report "not found".
    fn extract(&self, root: &TicketNode) -> Option<Self::Output>;
}

/// A successfully parsed field, with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParsedField<T> {
    pub value: T,
    /// Name of the strategy that produced the value
    pub strategy: SmolStr,
    /// Position of that strategy in the parser's list; 0 is the primary
    pub rank: usize,
}

impl<T> ParsedField<T> {
    /// Construct a field value outside the strategy pipeline, for defaults
    /// and synthesized data.
    pub fn synthetic(value: T, strategy: &'static str) -> Self {
        Self {
            value,
            strategy: SmolStr::new_static(strategy),
            rank: usize::MAX,
        }
    }

    /// True when the value did not come from the primary strategy.
    pub fn is_fallback(&self) -> bool {
        self.rank > 0
    }
}

/// Result of running one field parser: the winning value (if any) plus
/// notes about candidates that were found but rejected.
#[derive(Debug, Clone, Default)]
pub struct FieldOutcome<T> {
    pub found: Option<ParsedField<T>>,
    pub notes: Vec<String>,
}

/// Try strategies in order, stopping at the first success.
pub(crate) fn run_strategies<T>(
    root: &TicketNode,
    strategies: &[&dyn FieldStrategy<Output = T>],
) -> Option<ParsedField<T>> {
    for (rank, strategy) in strategies.iter().enumerate() {
        if let Some(value) = strategy.extract(root) {
            debug!(strategy = strategy.name(), rank, "field strategy matched");
            return Some(ParsedField {
                value,
                strategy: SmolStr::new_static(strategy.name()),
                rank,
            });
        }
    }
    None
}

/// Lowercased alphanumeric tokens of a piece of text.
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Token-level containment check; avoids "no" matching inside "note".
pub(crate) fn has_token(text: &str, token: &str) -> bool {
    tokens(text).iter().any(|t| t == token)
}

/// Dollar amounts appearing in text as `$N`, `$N.NN`, or `$N,NNN.NN`.
pub(crate) fn dollar_amounts(text: &str) -> Vec<Decimal> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < chars.len()
            && (chars[end].is_ascii_digit() || chars[end] == '.' || chars[end] == ',')
        {
            end += 1;
        }
        if end > start {
            let digits: String = chars[start..end].iter().filter(|c| **c != ',').collect();
            if let Ok(value) = digits.trim_end_matches('.').parse::<Decimal>() {
                out.push(value);
            }
        }
        i = end.max(i + 1);
    }
    out
}
