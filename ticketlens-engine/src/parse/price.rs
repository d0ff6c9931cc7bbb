//! Price parser: the limit price on the ticket, in dollars per contract.

use super::{dollar_amounts, run_strategies, FieldOutcome, FieldStrategy};
use crate::config::ParseHeuristics;
use crate::tree::TicketNode;
use rust_decimal::Decimal;
use ticketlens_pricing::validate;

/// Attributes that may carry a field label for an input.
const LABEL_ATTRS: &[&str] = &["name", "id", "placeholder", "aria-label", "title"];

/// Words suggesting an input holds the limit price.
const PRICE_HINTS: &[&str] = &["price", "limit"];

/// Label text plus labeling attributes, lowercased, for hint matching.
fn hint_text(input: &TicketNode, label: &str) -> String {
    let mut parts = vec![label.to_lowercase()];
    for attr in LABEL_ATTRS {
        if let Some(value) = input.attr(attr) {
            parts.push(value.to_lowercase());
        }
    }
    parts.join(" ")
}

fn validated_price(raw: &str) -> Option<Decimal> {
    let value = validate::decimal_from_text(raw).ok()?;
    validate::price(value).ok()
}

/// Primary: a numeric input labeled as the price field.
struct LabeledPriceInput;

impl FieldStrategy for LabeledPriceInput {
    type Output = Decimal;

    fn name(&self) -> &'static str {
        "labeled_price_input"
    }

    fn extract(&self, root: &TicketNode) -> Option<Decimal> {
        root.labeled_inputs().into_iter().find_map(|labeled| {
            let hints = hint_text(labeled.input, &labeled.label);
            if !PRICE_HINTS.iter().any(|hint| hints.contains(hint)) {
                return None;
            }
            validated_price(labeled.input.value.as_deref()?)
        })
    }
}

/// Fallback: an input whose declared min/max bounds fit a contract price.
struct BoundedPriceInput;

impl FieldStrategy for BoundedPriceInput {
    type Output = Decimal;

    fn name(&self) -> &'static str {
        "bounded_price_input"
    }

    fn extract(&self, root: &TicketNode) -> Option<Decimal> {
        root.inputs().into_iter().find_map(|input| {
            let min: Decimal = input.attr("min")?.parse().ok()?;
            let max: Decimal = input.attr("max")?.parse().ok()?;
            let price_shaped = min >= Decimal::ZERO && min < max && max <= Decimal::ONE;
            if !price_shaped {
                return None;
            }
            validated_price(input.value.as_deref()?)
        })
    }
}

/// Fallback: a price-shaped dollar amount in the text around an input, then
/// anywhere in a short text node.
struct PriceFromText {
    max_text_len: usize,
}

impl FieldStrategy for PriceFromText {
    type Output = Decimal;

    fn name(&self) -> &'static str {
        "price_from_text"
    }

    fn extract(&self, root: &TicketNode) -> Option<Decimal> {
        let near_input = root.labeled_inputs().into_iter().find_map(|labeled| {
            dollar_amounts(&labeled.label)
                .into_iter()
                .find_map(|amount| validate::price(amount).ok())
        });
        if near_input.is_some() {
            return near_input;
        }

        root.short_text_nodes(self.max_text_len)
            .into_iter()
            .filter(|node| node.text.to_lowercase().contains("price"))
            .find_map(|node| {
                dollar_amounts(&node.text)
                    .into_iter()
                    .find_map(|amount| validate::price(amount).ok())
            })
    }
}

/// Parse the limit price out of a ticket subtree.
pub fn parse(root: &TicketNode, heuristics: &ParseHeuristics) -> FieldOutcome<Decimal> {
    let from_text = PriceFromText {
        max_text_len: heuristics.max_fee_text_len,
    };
    let found = run_strategies(root, &[&LabeledPriceInput, &BoundedPriceInput, &from_text]);

    // Price-labeled inputs whose value failed validation are worth surfacing
    let mut notes = Vec::new();
    for labeled in root.labeled_inputs() {
        let hints = hint_text(labeled.input, &labeled.label);
        if !PRICE_HINTS.iter().any(|hint| hints.contains(hint)) {
            continue;
        }
        let Some(raw) = labeled.input.value.as_deref() else {
            continue;
        };
        match validate::decimal_from_text(raw).and_then(validate::price) {
            Ok(_) => {}
            Err(err) => notes.push(format!("price input rejected: {err}")),
        }
    }

    FieldOutcome { found, notes }
}
