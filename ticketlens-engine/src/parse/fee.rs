//! Fee parser: fee figures the ticket displays, per contract or in total.

use super::{dollar_amounts, run_strategies, tokens, FieldOutcome, FieldStrategy};
use crate::config::ParseHeuristics;
use crate::tree::TicketNode;
use rust_decimal::Decimal;
use ticketlens_pricing::{validate, FeeInfo};

/// Words that mark a text snippet as fee-related.
const FEE_KEYWORDS: &[&str] = &["fee", "fees", "commission"];

/// Words that mark a fee figure as per-contract rather than a total.
const PER_CONTRACT_WORDS: &[&str] = &["per", "each"];

/// One fee figure found in a text snippet.
#[derive(Debug, Clone, PartialEq)]
struct FeeMention {
    amount: Decimal,
    per_contract: bool,
    snippet: String,
}

/// Extract fee mentions from one piece of text.
///
/// Wording decides the kind: "per", "each", or a "/" (as in "$0.03/contract")
/// mean per-contract; anything else reads as an order total.
fn mentions_in(text: &str) -> Vec<FeeMention> {
    let words = tokens(text);
    if !FEE_KEYWORDS.iter().any(|k| words.iter().any(|w| w == k)) {
        return Vec::new();
    }

    let per_contract = PER_CONTRACT_WORDS
        .iter()
        .any(|k| words.iter().any(|w| w == k))
        || text.contains('/');

    dollar_amounts(text)
        .into_iter()
        .filter(|amount| validate::fee(*amount).is_ok())
        .map(|amount| FeeMention {
            amount,
            per_contract,
            snippet: text.trim().to_string(),
        })
        .collect()
}

/// Fold a set of mentions into one record: first per-contract figure, first
/// total figure, snippets preserved for transparency.
fn combine(mentions: Vec<FeeMention>) -> Option<FeeInfo> {
    if mentions.is_empty() {
        return None;
    }
    let per = mentions.iter().find(|m| m.per_contract).map(|m| m.amount);
    let total = mentions.iter().find(|m| !m.per_contract).map(|m| m.amount);
    let raw_text = mentions
        .iter()
        .map(|m| m.snippet.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    Some(FeeInfo::from_ticket(total, per, raw_text))
}

/// Primary: fee phrases in short, label-like text nodes.
struct ShortNodeFeeText {
    max_text_len: usize,
}

impl FieldStrategy for ShortNodeFeeText {
    type Output = FeeInfo;

    fn name(&self) -> &'static str {
        "short_node_fee_text"
    }

    fn extract(&self, root: &TicketNode) -> Option<FeeInfo> {
        let mentions: Vec<FeeMention> = root
            .short_text_nodes(self.max_text_len)
            .into_iter()
            .flat_map(|node| mentions_in(&node.text))
            .collect();
        combine(mentions)
    }
}

/// Fallback: fee phrases anywhere in the subtree's joined text, for pages
/// that split the label across elements.
struct FullTextFeeScan;

impl FieldStrategy for FullTextFeeScan {
    type Output = FeeInfo;

    fn name(&self) -> &'static str {
        "full_text_fee_scan"
    }

    fn extract(&self, root: &TicketNode) -> Option<FeeInfo> {
        combine(mentions_in(&root.visible_text()))
    }
}

/// Parse fee information out of a ticket subtree.
pub fn parse(root: &TicketNode, heuristics: &ParseHeuristics) -> FieldOutcome<FeeInfo> {
    let short = ShortNodeFeeText {
        max_text_len: heuristics.max_fee_text_len,
    };
    let found = run_strategies(root, &[&short, &FullTextFeeScan]);

    FieldOutcome {
        found,
        notes: Vec::new(),
    }
}
