//! Markdown Formatting Module
//!
//! Normalizes a parsed [`Document`] in place before rendering.
//!
//! ## Rules
//!
//! Each rule claims one or more node kinds and carries a priority. The engine
//! keeps its rules sorted once, highest priority first, and for every node in a
//! single pre-order pass applies only the first rule that claims it.
//!
//! | Rule       | Priority | Claims              |
//! |------------|----------|---------------------|
//! | heading    | 100      | Heading             |
//! | paragraph  | 90       | Paragraph           |
//! | list       | 80       | List, ListItem      |
//! | code       | 70       | CodeBlock           |
//! | inline     | 60       | Text, Paragraph     |
//! | whitespace | 10       | every kind          |
//!
//! ## Usage
//!
//! ```rust
//! use mdfmt_rs::format::Engine;
//! use mdfmt_rs::models::Config;
//! use mdfmt_rs::tree::{Document, Heading, Node};
//!
//! let mut doc = Document::new(vec![Node::Heading(Heading::new(9, "  Deep  "))]);
//! Engine::new().format(&mut doc, &Config::default()).unwrap();
//! ```

pub mod inline;
pub mod reflow;
pub mod rules;

use crate::error::{MdfmtError, Result};
use crate::models::Config;
use crate::tree::{Document, NodeKind, NodeMut};
use std::cmp::Reverse;
use tracing::trace;

/// A node-level transformation.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32;

    /// Whether this rule handles nodes of `kind`.
    fn claims(&self, kind: NodeKind) -> bool;

    /// Mutate `node` in place. Nodes of kinds the rule does not claim are left alone.
    fn apply(&self, node: NodeMut<'_>, config: &Config) -> Result<()>;
}

/// Ordered rule set applied first-match-wins.
pub struct Engine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with the built-in rules registered.
    pub fn new() -> Self {
        let mut engine = Self::empty();
        engine.register(Box::new(rules::HeadingRule));
        engine.register(Box::new(rules::ParagraphRule));
        engine.register(Box::new(rules::ListRule));
        engine.register(Box::new(rules::CodeBlockRule));
        engine.register(Box::new(rules::InlineRule));
        engine.register(Box::new(rules::WhitespaceRule));
        engine
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule. Equal priorities keep registration order.
    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
        self.rules.sort_by_key(|r| Reverse(r.priority()));
    }

    /// Rule names in dispatch order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run one pass over `doc`, root included.
    ///
    /// The first failing rule aborts the pass; the document is then partially
    /// mutated and must be discarded.
    pub fn format(&self, doc: &mut Document, config: &Config) -> Result<()> {
        self.dispatch(NodeMut::Document(&mut *doc), config)?;
        for child in doc.children.iter_mut() {
            self.visit(child.as_node_mut(), config)?;
        }
        Ok(())
    }

    fn visit(&self, node: NodeMut<'_>, config: &Config) -> Result<()> {
        match node {
            NodeMut::Document(_) => Err(MdfmtError::Format {
                rule: "engine",
                node: NodeKind::Document,
                message: "documents cannot be nested".to_string(),
            }),
            NodeMut::List(list) => {
                self.dispatch(NodeMut::List(&mut *list), config)?;
                for item in list.items.iter_mut() {
                    self.visit(NodeMut::ListItem(item), config)?;
                }
                Ok(())
            }
            NodeMut::ListItem(item) => {
                self.dispatch(NodeMut::ListItem(&mut *item), config)?;
                for child in item.children.iter_mut() {
                    self.visit(child.as_node_mut(), config)?;
                }
                Ok(())
            }
            leaf => self.dispatch(leaf, config),
        }
    }

    fn dispatch(&self, node: NodeMut<'_>, config: &Config) -> Result<()> {
        let kind = node.kind();
        match self.rules.iter().find(|r| r.claims(kind)) {
            Some(rule) => {
                trace!(rule = rule.name(), node = %kind, "applying rule");
                rule.apply(node, config)
            }
            None => Ok(()),
        }
    }
}
