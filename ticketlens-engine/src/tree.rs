//! Ticket subtree model.
//!
//! The host integration hands the engine snapshots of the order-entry UI as
//! owned trees. The engine never assumes specific class names; parsers work
//! from tags, attribute values, input state, and visible text.

use fnv::FnvHasher;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::hash::Hasher;

/// One node of a ticket subtree snapshot.
///
/// ### Fixture shape
/// ```json
/// {
///   "tag": "input",
///   "attributes": { "type": "number", "aria-label": "Limit price" },
///   "value": "0.40"
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TicketNode {
    /// Element tag, lowercased ("div", "input", "button")
    pub tag: SmolStr,
    /// Attributes in document order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<SmolStr, String>,
    /// Text owned directly by this node, excluding children
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Current value for input-like nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Checked/selected state for toggle-like nodes
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TicketNode>,
}

/// An input-like node paired with the text surrounding it.
///
/// "Surrounding" is the visible text of the input's direct parent, which is
/// where host pages put their field labels.
#[derive(Debug, Clone)]
pub struct LabeledInput<'a> {
    pub input: &'a TicketNode,
    pub label: String,
}

impl TicketNode {
    /// Create a node with the given tag and nothing else.
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Builder: set an attribute.
    pub fn with_attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder: set the node's own text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: set the input value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Builder: mark the node checked/selected.
    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    /// Builder: append children.
    pub fn with_children(mut self, children: impl IntoIterator<Item = TicketNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// True when the named attribute's value contains `needle`,
    /// case-insensitively.
    pub fn attr_contains(&self, name: &str, needle: &str) -> bool {
        self.attr(name)
            .is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase()))
    }

    /// True for nodes that carry user-editable values.
    pub fn is_input(&self) -> bool {
        self.tag == "input"
            || self.tag == "textarea"
            || self.attr("role").is_some_and(|r| r == "spinbutton" || r == "textbox")
    }

    /// True for button-like nodes.
    pub fn is_button(&self) -> bool {
        self.tag == "button"
            || self.attr("role").is_some_and(|r| r == "button" || r == "tab" || r == "radio")
            || (self.tag == "input" && self.attr("type").is_some_and(|t| t == "radio" || t == "checkbox"))
    }

    /// Depth-first iterator over this node and all descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// All input-like descendants.
    pub fn inputs(&self) -> Vec<&TicketNode> {
        self.descendants().filter(|n| n.is_input()).collect()
    }

    /// All input-like descendants paired with their parent's visible text.
    pub fn labeled_inputs(&self) -> Vec<LabeledInput<'_>> {
        let mut out = Vec::new();
        self.collect_labeled_inputs(None, &mut out);
        out
    }

    fn collect_labeled_inputs<'a>(
        &'a self,
        parent: Option<&'a TicketNode>,
        out: &mut Vec<LabeledInput<'a>>,
    ) {
        if self.is_input() {
            let label = parent.map(TicketNode::visible_text).unwrap_or_default();
            out.push(LabeledInput { input: self, label });
        }
        for child in &self.children {
            child.collect_labeled_inputs(Some(self), out);
        }
    }

    /// All text visible in this subtree, whitespace-collapsed.
    pub fn visible_text(&self) -> String {
        let mut parts = Vec::new();
        for node in self.descendants() {
            let trimmed = node.text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
        parts.join(" ")
    }

    /// Descendants owning a short piece of text, for label/fee scanning.
    pub fn short_text_nodes(&self, max_len: usize) -> Vec<&TicketNode> {
        self.descendants()
            .filter(|n| {
                let trimmed = n.text.trim();
                !trimmed.is_empty() && trimmed.len() <= max_len
            })
            .collect()
    }

    /// Change-detection checksum over input values, checked state, and
    /// visible text. Not cryptographic; collisions only cost a re-parse.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        for node in self.descendants() {
            if let Some(value) = &node.value {
                hasher.write(value.as_bytes());
            }
            hasher.write_u8(u8::from(node.checked));
            hasher.write(node.text.trim().as_bytes());
        }
        hasher.finish()
    }
}

/// Depth-first (preorder) traversal of a [`TicketNode`] subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a TicketNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a TicketNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Path of nodes from `root` down to `target`, inclusive, located by node
/// identity. Empty when `target` is not in the subtree.
pub fn path_to<'a>(root: &'a TicketNode, target: &'a TicketNode) -> Vec<&'a TicketNode> {
    fn walk<'a>(
        node: &'a TicketNode,
        target: &'a TicketNode,
        path: &mut Vec<&'a TicketNode>,
    ) -> bool {
        path.push(node);
        if std::ptr::eq(node, target) {
            return true;
        }
        for child in &node.children {
            if walk(child, target, path) {
                return true;
            }
        }
        path.pop();
        false
    }

    let mut path = Vec::new();
    if walk(root, target, &mut path) {
        path
    } else {
        Vec::new()
    }
}
