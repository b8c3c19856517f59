//! Document tree shared by the parser adapter, the rule engine and the renderer.
//!
//! The tree is built once per document, mutated in place by the rules and then
//! read by the renderer. Nodes are a closed set; dispatch is by `match`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Style Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingStyle {
    #[default]
    Atx,
    Setext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FenceStyle {
    #[default]
    #[serde(rename = "```")]
    Backtick,
    #[serde(rename = "~~~")]
    Tilde,
}

impl FenceStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            FenceStyle::Backtick => "```",
            FenceStyle::Tilde => "~~~",
        }
    }

    pub fn fence_char(self) -> char {
        match self {
            FenceStyle::Backtick => '`',
            FenceStyle::Tilde => '~',
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Type tag of a node, used by rules to declare what they claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Heading,
    Paragraph,
    List,
    ListItem,
    CodeBlock,
    Text,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Document => "Document",
            NodeKind::Heading => "Heading",
            NodeKind::Paragraph => "Paragraph",
            NodeKind::List => "List",
            NodeKind::ListItem => "ListItem",
            NodeKind::CodeBlock => "CodeBlock",
            NodeKind::Text => "Text",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub style: HeadingStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// Inline markup, possibly with literal line breaks from the source.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub ordered: bool,
    /// Bullet character for unordered lists, `.` or `)` for ordered ones.
    pub marker: String,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub text: String,
    /// Marker rendered before this item, e.g. `-` or `3.`.
    pub marker: String,
    /// Nested lists only.
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub content: String,
    pub fenced: bool,
    pub fence: FenceStyle,
}

/// Opaque markup passed through without structural formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Document(Document),
    Heading(Heading),
    Paragraph(Paragraph),
    List(List),
    ListItem(ListItem),
    CodeBlock(CodeBlock),
    Text(Text),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Document(_) => NodeKind::Document,
            Node::Heading(_) => NodeKind::Heading,
            Node::Paragraph(_) => NodeKind::Paragraph,
            Node::List(_) => NodeKind::List,
            Node::ListItem(_) => NodeKind::ListItem,
            Node::CodeBlock(_) => NodeKind::CodeBlock,
            Node::Text(_) => NodeKind::Text,
        }
    }

    pub fn as_node_mut(&mut self) -> NodeMut<'_> {
        match self {
            Node::Document(n) => NodeMut::Document(n),
            Node::Heading(n) => NodeMut::Heading(n),
            Node::Paragraph(n) => NodeMut::Paragraph(n),
            Node::List(n) => NodeMut::List(n),
            Node::ListItem(n) => NodeMut::ListItem(n),
            Node::CodeBlock(n) => NodeMut::CodeBlock(n),
            Node::Text(n) => NodeMut::Text(n),
        }
    }
}

/// Mutable view of any node in the tree, including list items that live
/// inside a `List` rather than as standalone `Node`s.
#[derive(Debug)]
pub enum NodeMut<'a> {
    Document(&'a mut Document),
    Heading(&'a mut Heading),
    Paragraph(&'a mut Paragraph),
    List(&'a mut List),
    ListItem(&'a mut ListItem),
    CodeBlock(&'a mut CodeBlock),
    Text(&'a mut Text),
}

impl NodeMut<'_> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeMut::Document(_) => NodeKind::Document,
            NodeMut::Heading(_) => NodeKind::Heading,
            NodeMut::Paragraph(_) => NodeKind::Paragraph,
            NodeMut::List(_) => NodeKind::List,
            NodeMut::ListItem(_) => NodeKind::ListItem,
            NodeMut::CodeBlock(_) => NodeKind::CodeBlock,
            NodeMut::Text(_) => NodeKind::Text,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }
}

impl Heading {
    pub fn new(level: u8, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            style: HeadingStyle::Atx,
        }
    }
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl List {
    pub fn unordered(items: Vec<ListItem>) -> Self {
        Self {
            ordered: false,
            marker: "-".to_string(),
            items,
        }
    }

    pub fn ordered(items: Vec<ListItem>) -> Self {
        Self {
            ordered: true,
            marker: ".".to_string(),
            items,
        }
    }
}

impl ListItem {
    pub fn new(marker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marker: marker.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, list: List) -> Self {
        self.children.push(Node::List(list));
        self
    }
}

impl CodeBlock {
    pub fn fenced(language: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            content: content.into(),
            fenced: true,
            fence: FenceStyle::Backtick,
        }
    }

    pub fn indented(content: impl Into<String>) -> Self {
        Self {
            language: String::new(),
            content: content.into(),
            fenced: false,
            fence: FenceStyle::Backtick,
        }
    }
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Debug outline of a document, one line per node, nested items indented.
pub fn outline(doc: &Document) -> String {
    fn walk(node: &Node, depth: usize, out: &mut Vec<String>) {
        let pad = "  ".repeat(depth);
        match node {
            Node::Document(d) => {
                out.push(format!("{}Document", pad));
                for child in &d.children {
                    walk(child, depth + 1, out);
                }
            }
            Node::Heading(h) => out.push(format!("{}Heading(level={}, text={:?})", pad, h.level, h.text)),
            Node::Paragraph(p) => out.push(format!("{}Paragraph(text={:?})", pad, p.text)),
            Node::List(l) => {
                out.push(format!("{}List(ordered={}, items={})", pad, l.ordered, l.items.len()));
                for item in &l.items {
                    out.push(format!("{}  ListItem({} {:?})", pad, item.marker, item.text));
                    for child in &item.children {
                        walk(child, depth + 2, out);
                    }
                }
            }
            Node::ListItem(i) => out.push(format!("{}ListItem({} {:?})", pad, i.marker, i.text)),
            Node::CodeBlock(c) => out.push(format!("{}CodeBlock(lang={:?}, fenced={})", pad, c.language, c.fenced)),
            Node::Text(t) => out.push(format!("{}Text(content={:?})", pad, t.content)),
        }
    }

    let mut lines = vec!["Document".to_string()];
    for child in &doc.children {
        walk(child, 1, &mut lines);
    }
    lines.join("\n")
}
