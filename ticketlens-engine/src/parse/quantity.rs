//! Quantity parser: the number of contracts on the ticket.

use super::{run_strategies, tokens, FieldOutcome, FieldStrategy};
use crate::config::ParseHeuristics;
use crate::tree::{LabeledInput, TicketNode};
use ticketlens_pricing::validate;

/// Attributes that may carry a field label for an input.
const LABEL_ATTRS: &[&str] = &["name", "id", "placeholder", "aria-label", "title"];

/// Words suggesting an input holds the contract count.
const QUANTITY_HINTS: &[&str] = &["quantity", "contracts", "shares", "qty"];

/// Words that follow a count in free text ("10 contracts").
const COUNT_UNITS: &[&str] = &["contract", "contracts", "share", "shares"];

fn hint_text(input: &TicketNode, label: &str) -> String {
    let mut parts = vec![label.to_lowercase()];
    for attr in LABEL_ATTRS {
        if let Some(value) = input.attr(attr) {
            parts.push(value.to_lowercase());
        }
    }
    parts.join(" ")
}

fn validated_quantity(raw: &str) -> Option<u32> {
    let value = validate::integer_from_text(raw).ok()?;
    validate::quantity(value).ok()
}

/// Primary: an integer input labeled as the quantity field.
struct LabeledQuantityInput;

impl FieldStrategy for LabeledQuantityInput {
    type Output = u32;

    fn name(&self) -> &'static str {
        "labeled_quantity_input"
    }

    fn extract(&self, root: &TicketNode) -> Option<u32> {
        root.labeled_inputs().into_iter().find_map(|labeled| {
            let hints = hint_text(labeled.input, &labeled.label);
            if !QUANTITY_HINTS.iter().any(|hint| hints.contains(hint)) {
                return None;
            }
            validated_quantity(labeled.input.value.as_deref()?)
        })
    }
}

/// Fallback: a count in free text, like "10 contracts".
struct QuantityFromPhrase;

impl FieldStrategy for QuantityFromPhrase {
    type Output = u32;

    fn name(&self) -> &'static str {
        "quantity_from_phrase"
    }

    fn extract(&self, root: &TicketNode) -> Option<u32> {
        let words = tokens(&root.visible_text());
        words.windows(2).find_map(|pair| {
            if !COUNT_UNITS.contains(&pair[1].as_str()) {
                return None;
            }
            let count: i64 = pair[0].parse().ok()?;
            validate::quantity(count).ok()
        })
    }
}

/// Last resort: an unlabeled input whose shape looks like a contract count.
///
/// Shape alone is a weak signal, so several must agree before the value is
/// trusted; the minimum is configurable and deliberately conservative.
struct WeakIndicatorInput {
    min_weak_indicators: u32,
}

impl WeakIndicatorInput {
    fn weak_indicator_count(labeled: &LabeledInput<'_>) -> u32 {
        let input = labeled.input;
        let mut indicators = 0;
        if input.attr("step") == Some("1") {
            indicators += 1;
        }
        if input.attr("inputmode") == Some("numeric") {
            indicators += 1;
        }
        if input
            .value
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty() && !v.contains('.') && !v.contains('$'))
        {
            indicators += 1;
        }
        if !labeled.label.contains('$') {
            indicators += 1;
        }
        if input
            .attr("max")
            .and_then(|m| m.parse::<i64>().ok())
            .is_some_and(|m| m > 1 && m <= i64::from(validate::MAX_QUANTITY))
        {
            indicators += 1;
        }
        indicators
    }
}

impl FieldStrategy for WeakIndicatorInput {
    type Output = u32;

    fn name(&self) -> &'static str {
        "weak_indicator_input"
    }

    fn extract(&self, root: &TicketNode) -> Option<u32> {
        root.labeled_inputs().into_iter().find_map(|labeled| {
            if Self::weak_indicator_count(&labeled) < self.min_weak_indicators {
                return None;
            }
            validated_quantity(labeled.input.value.as_deref()?)
        })
    }
}

/// Parse the contract quantity out of a ticket subtree.
pub fn parse(root: &TicketNode, heuristics: &ParseHeuristics) -> FieldOutcome<u32> {
    let weak = WeakIndicatorInput {
        min_weak_indicators: heuristics.min_weak_indicators,
    };
    let found = run_strategies(root, &[&LabeledQuantityInput, &QuantityFromPhrase, &weak]);

    let mut notes = Vec::new();
    for labeled in root.labeled_inputs() {
        let hints = hint_text(labeled.input, &labeled.label);
        if !QUANTITY_HINTS.iter().any(|hint| hints.contains(hint)) {
            continue;
        }
        let Some(raw) = labeled.input.value.as_deref() else {
            continue;
        };
        match validate::integer_from_text(raw).and_then(validate::quantity) {
            Ok(_) => {}
            Err(err) => notes.push(format!("quantity input rejected: {err}")),
        }
    }

    FieldOutcome { found, notes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heuristics() -> ParseHeuristics {
        ParseHeuristics::default()
    }

    #[test]
    fn test_labeled_input_primary() {
        let tree = TicketNode::new("div").with_children([TicketNode::new("div")
            .with_text("Contracts")
            .with_children([TicketNode::new("input")
                .with_attr("type", "number")
                .with_value("25")])]);
        let found = parse(&tree, &heuristics()).found.unwrap();
        assert_eq!(found.value, 25);
        assert_eq!(found.strategy, "labeled_quantity_input");
    }

    #[test]
    fn test_phrase_fallback() {
        let tree = TicketNode::new("div")
            .with_children([TicketNode::new("span").with_text("Buying 10 contracts at $0.40")]);
        let found = parse(&tree, &heuristics()).found.unwrap();
        assert_eq!(found.value, 10);
        assert_eq!(found.strategy, "quantity_from_phrase");
    }

    #[test]
    fn test_weak_indicators_require_agreement() {
        // step=1 + integer value + no dollar sign nearby + integer max: four
        // weak signals, comfortably above the default minimum of two
        let accepted = TicketNode::new("div").with_children([TicketNode::new("input")
            .with_attr("step", "1")
            .with_attr("max", "1000")
            .with_value("5")]);
        let found = parse(&accepted, &heuristics()).found.unwrap();
        assert_eq!(found.value, 5);
        assert_eq!(found.strategy, "weak_indicator_input");

        // A decimal-valued input next to a dollar label carries too few
        // signals to be trusted as a quantity
        let rejected = TicketNode::new("div").with_children([TicketNode::new("div")
            .with_text("$ amount")
            .with_children([TicketNode::new("input").with_value("0.40")])]);
        assert!(parse(&rejected, &heuristics()).found.is_none());
    }

    #[test]
    fn test_out_of_range_quantity_noted() {
        let tree = TicketNode::new("div").with_children([TicketNode::new("input")
            .with_attr("name", "quantity")
            .with_value("50000")]);
        let outcome = parse(&tree, &heuristics());
        assert!(outcome.found.is_none());
        assert_eq!(outcome.notes.len(), 1);
    }

    #[test]
    fn test_fractional_quantity_rejected() {
        let tree = TicketNode::new("div").with_children([TicketNode::new("input")
            .with_attr("name", "quantity")
            .with_value("2.5")]);
        let outcome = parse(&tree, &heuristics());
        assert!(outcome.found.is_none());
        assert!(!outcome.notes.is_empty());
    }
}
