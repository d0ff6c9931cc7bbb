//! Side parser: which of YES/NO the ticket currently has selected.

use super::{has_token, run_strategies, FieldOutcome, FieldStrategy};
use crate::config::ParseHeuristics;
use crate::tree::TicketNode;
use serde::{Deserialize, Serialize};

/// Outcome side of a binary contract.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[display("yes")]
    Yes,
    #[display("no")]
    No,
}

/// Attributes whose values may name the side when the text does not.
const SIDE_ATTRS: &[&str] = &["value", "name", "id", "aria-label", "data-side", "data-value"];

/// Class fragments that mark a control as the chosen one.
const SELECTED_CLASS_HINTS: &[&str] = &["selected", "active", "chosen"];

/// Resolve which side a control represents, from its own text or attributes.
///
/// A control mentioning both sides is ambiguous and resolves to neither.
fn resolve_side(node: &TicketNode) -> Option<Side> {
    let mut texts: Vec<&str> = vec![&node.text];
    for attr in SIDE_ATTRS {
        if let Some(value) = node.attr(attr) {
            texts.push(value);
        }
    }

    let mut yes = false;
    let mut no = false;
    for text in texts {
        yes |= has_token(text, "yes");
        no |= has_token(text, "no");
    }
    match (yes, no) {
        (true, false) => Some(Side::Yes),
        (false, true) => Some(Side::No),
        _ => None,
    }
}

/// Explicit selection state, as opposed to scored hints.
fn is_explicitly_selected(node: &TicketNode) -> bool {
    node.checked
        || node.attr("aria-pressed") == Some("true")
        || node.attr("aria-selected") == Some("true")
        || node.attr("aria-checked") == Some("true")
}

/// Weighted selection indicators for the scored fallback.
fn selection_score(node: &TicketNode) -> u32 {
    let mut score = 0;
    if is_explicitly_selected(node) {
        score += 3;
    }
    if SELECTED_CLASS_HINTS
        .iter()
        .any(|hint| node.attr_contains("class", hint))
    {
        score += 2;
    }
    if matches!(
        node.attr("data-state"),
        Some("active") | Some("checked") | Some("selected") | Some("on")
    ) {
        score += 2;
    }
    if node.attr_contains("style", "background") {
        score += 1;
    }
    score
}

/// Primary: a toggle control with explicit selection state resolving to one
/// side.
struct SelectedToggle;

impl FieldStrategy for SelectedToggle {
    type Output = Side;

    fn name(&self) -> &'static str {
        "selected_toggle"
    }

    fn extract(&self, root: &TicketNode) -> Option<Side> {
        let mut selected: Option<Side> = None;
        for node in root.descendants() {
            if !node.is_button() && !node.is_input() {
                continue;
            }
            let Some(side) = resolve_side(node) else {
                continue;
            };
            if !is_explicitly_selected(node) {
                continue;
            }
            match selected {
                None => selected = Some(side),
                // Two different sides both claiming selection: give up and
                // let the scored fallback arbitrate
                Some(existing) if existing != side => return None,
                Some(_) => {}
            }
        }
        selected
    }
}

/// Fallback: score every side-bearing element by its selection indicators
/// and take a clear winner above the configured minimum.
struct ScoredSelection {
    min_score: u32,
}

impl FieldStrategy for ScoredSelection {
    type Output = Side;

    fn name(&self) -> &'static str {
        "scored_selection"
    }

    fn extract(&self, root: &TicketNode) -> Option<Side> {
        let mut best_yes = 0;
        let mut best_no = 0;
        for node in root.descendants() {
            let Some(side) = resolve_side(node) else {
                continue;
            };
            let score = selection_score(node);
            match side {
                Side::Yes => best_yes = best_yes.max(score),
                Side::No => best_no = best_no.max(score),
            }
        }

        let (winner, winning, other) = if best_yes >= best_no {
            (Side::Yes, best_yes, best_no)
        } else {
            (Side::No, best_no, best_yes)
        };
        (winning >= self.min_score && winning > other).then_some(winner)
    }
}

/// Parse the selected side out of a ticket subtree.
pub fn parse(root: &TicketNode, heuristics: &ParseHeuristics) -> FieldOutcome<Side> {
    let scored = ScoredSelection {
        min_score: heuristics.min_side_score,
    };
    let found = run_strategies(root, &[&SelectedToggle, &scored]);

    let mut notes = Vec::new();
    if found.is_none() {
        let side_bearing = root.descendants().filter(|n| resolve_side(n).is_some()).count();
        if side_bearing > 0 {
            notes.push(format!(
                "{side_bearing} yes/no controls found but none is clearly selected"
            ));
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

    fn toggle(label: &str) -> TicketNode {
        TicketNode::new("button").with_text(label)
    }

    #[test]
    fn test_aria_pressed_toggle_wins() {
        let tree = TicketNode::new("div").with_children([
            toggle("Yes").with_attr("aria-pressed", "true"),
            toggle("No").with_attr("aria-pressed", "false"),
        ]);
        let outcome = parse(&tree, &heuristics());
        let found = outcome.found.unwrap();
        assert_eq!(found.value, Side::Yes);
        assert_eq!(found.strategy, "selected_toggle");
        assert!(!found.is_fallback());
    }

    #[test]
    fn test_checked_radio_wins() {
        let tree = TicketNode::new("div").with_children([
            TicketNode::new("input")
                .with_attr("type", "radio")
                .with_attr("value", "no")
                .checked(),
            TicketNode::new("input")
                .with_attr("type", "radio")
                .with_attr("value", "yes"),
        ]);
        assert_eq!(parse(&tree, &heuristics()).found.unwrap().value, Side::No);
    }

    #[test]
    fn test_class_scored_fallback() {
        let tree = TicketNode::new("div").with_children([
            toggle("Yes").with_attr("class", "side-btn side-btn--selected"),
            toggle("No").with_attr("class", "side-btn"),
        ]);
        let found = parse(&tree, &heuristics()).found.unwrap();
        assert_eq!(found.value, Side::Yes);
        assert_eq!(found.strategy, "scored_selection");
        assert!(found.is_fallback());
    }

    #[test]
    fn test_conflicting_selection_falls_through_to_scoring() {
        // Both toggles claim aria-pressed, but only one also carries the
        // selected class, so scoring breaks the tie
        let tree = TicketNode::new("div").with_children([
            toggle("Yes").with_attr("aria-pressed", "true"),
            toggle("No")
                .with_attr("aria-pressed", "true")
                .with_attr("class", "active"),
        ]);
        let found = parse(&tree, &heuristics()).found.unwrap();
        assert_eq!(found.value, Side::No);
        assert_eq!(found.strategy, "scored_selection");
    }

    #[test]
    fn test_no_side_controls_reports_nothing() {
        let tree = TicketNode::new("div").with_text("Limit price $0.40");
        let outcome = parse(&tree, &heuristics());
        assert!(outcome.found.is_none());
        assert!(outcome.notes.is_empty());
    }

    #[test]
    fn test_unselected_controls_leave_a_note() {
        let tree = TicketNode::new("div").with_children([toggle("Yes"), toggle("No")]);
        let outcome = parse(&tree, &heuristics());
        assert!(outcome.found.is_none());
        assert_eq!(outcome.notes.len(), 1);
    }

    #[test]
    fn test_word_boundary_prevents_false_no() {
        // "Note" and "now" must not read as NO
        let tree = TicketNode::new("div").with_children([TicketNode::new("button")
            .with_text("Note: trading closes now")
            .checked()]);
        assert!(parse(&tree, &heuristics()).found.is_none());
    }
}
