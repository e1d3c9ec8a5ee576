mod node;
mod variable;

use std::collections::{BTreeMap, BTreeSet};

pub use node::{
    plain_text, Align, Cell, CellSpan, ElementList, Inline, ListKind, Node, Style,
};
pub use variable::{Value, ValueKind, VariableError, VariableLookup, VariableStore};

use crate::parser::error::ParseErrorKind;

/// A parsed Hamill document: the ordered top-level nodes plus the tables
/// collected while building them.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Source name, when the document came from a file.
    pub name: Option<String>,
    pub nodes: Vec<Node>,
    pub variables: VariableStore,
    /// Stylesheets and scripts requested with `!require`.
    pub required: Vec<String>,
    /// Inline CSS declared with `!css`.
    pub css: Vec<String>,
    ids: BTreeSet<String>,
    labels: BTreeMap<String, String>,
}

impl Document {
    pub fn new(name: Option<String>) -> Self {
        Document {
            name,
            ..Document::default()
        }
    }

    /// Append a top-level node. Consecutive empty lines collapse into one.
    pub fn push(&mut self, node: Node) {
        if node == Node::Empty && self.nodes.last() == Some(&Node::Empty) {
            return;
        }
        self.nodes.push(node);
    }

    pub fn register_id(&mut self, id: &str) -> Result<(), ParseErrorKind> {
        if !self.ids.insert(id.to_string()) {
            return Err(ParseErrorKind::DuplicateId(id.to_string()));
        }
        Ok(())
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Map a label to a url. A later declaration replaces an earlier one.
    pub fn add_label(&mut self, label: impl Into<String>, url: impl Into<String>) {
        self.labels.insert(label.into(), url.into());
    }

    pub fn label(&self, label: &str) -> Option<&str> {
        self.labels.get(label).map(String::as_str)
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Turn heading text into an anchor: spaces become dashes, letters are
/// lower-cased and anything between `<` and `>` is dropped.
pub fn make_anchor(text: &str) -> String {
    let mut anchor = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            ' ' => anchor.push('-'),
            _ => anchor.extend(c.to_lowercase()),
        }
    }
    anchor
}
