//! Built-in formatting rules.

use super::inline::normalize_inline;
use super::reflow::{collapse_whitespace, reflow, trim_trailing_spaces};
use super::Rule;
use crate::constants::{
    CODE_RULE_PRIORITY, HEADING_RULE_PRIORITY, INLINE_RULE_PRIORITY, LIST_RULE_PRIORITY,
    MAX_HEADING_LEVEL, MIN_HEADING_LEVEL, PARAGRAPH_RULE_PRIORITY, SETEXT_MAX_LEVEL,
    WHITESPACE_RULE_PRIORITY,
};
use crate::error::{MdfmtError, Result};
use crate::models::Config;
use crate::tree::{HeadingStyle, List, ListItem, Node, NodeKind, NodeMut};
use tracing::trace;

// ============================================================================
// Heading
// ============================================================================

pub struct HeadingRule;

impl Rule for HeadingRule {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn priority(&self) -> i32 {
        HEADING_RULE_PRIORITY
    }

    fn claims(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Heading
    }

    fn apply(&self, node: NodeMut<'_>, config: &Config) -> Result<()> {
        let NodeMut::Heading(heading) = node else {
            return Ok(());
        };

        if config.heading.normalize_levels {
            heading.level = heading.level.clamp(MIN_HEADING_LEVEL, MAX_HEADING_LEVEL);
        }

        heading.style = match config.heading.style {
            HeadingStyle::Setext if heading.level <= SETEXT_MAX_LEVEL => HeadingStyle::Setext,
            _ => HeadingStyle::Atx,
        };

        heading.text = heading.text.trim().to_string();
        Ok(())
    }
}

// ============================================================================
// Paragraph
// ============================================================================

pub struct ParagraphRule;

impl Rule for ParagraphRule {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn priority(&self) -> i32 {
        PARAGRAPH_RULE_PRIORITY
    }

    fn claims(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Paragraph
    }

    fn apply(&self, node: NodeMut<'_>, config: &Config) -> Result<()> {
        let NodeMut::Paragraph(paragraph) = node else {
            return Ok(());
        };

        if config.line_width > 0 {
            paragraph.text = reflow(&paragraph.text, config.line_width);
        }
        paragraph.text = collapse_whitespace(paragraph.text.trim());
        Ok(())
    }
}

// ============================================================================
// List
// ============================================================================

pub struct ListRule;

impl ListRule {
    fn format_list(&self, list: &mut List, config: &Config) -> Result<()> {
        if list.ordered {
            let delimiter = config.list.number_style.as_str();
            list.marker = delimiter.to_string();
            for (i, item) in list.items.iter_mut().enumerate() {
                item.marker = format!("{}{}", i + 1, delimiter);
            }
        } else {
            let bullet = config.list.bullet_style.as_str();
            list.marker = bullet.to_string();
            for item in list.items.iter_mut() {
                item.marker = bullet.to_string();
            }
        }

        for item in list.items.iter_mut() {
            self.format_item(item, config)?;
        }
        Ok(())
    }

    fn format_item(&self, item: &mut ListItem, config: &Config) -> Result<()> {
        item.text = collapse_whitespace(item.text.trim());

        for child in item.children.iter_mut() {
            match child {
                Node::List(nested) => self.format_list(nested, config)?,
                other => {
                    return Err(MdfmtError::Format {
                        rule: self.name(),
                        node: other.kind(),
                        message: "list items may only contain nested lists".to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

impl Rule for ListRule {
    fn name(&self) -> &'static str {
        "list"
    }

    fn priority(&self) -> i32 {
        LIST_RULE_PRIORITY
    }

    fn claims(&self, kind: NodeKind) -> bool {
        matches!(kind, NodeKind::List | NodeKind::ListItem)
    }

    fn apply(&self, node: NodeMut<'_>, config: &Config) -> Result<()> {
        match node {
            NodeMut::List(list) => self.format_list(list, config),
            NodeMut::ListItem(item) => self.format_item(item, config),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Code Block
// ============================================================================

pub struct CodeBlockRule;

impl Rule for CodeBlockRule {
    fn name(&self) -> &'static str {
        "code"
    }

    fn priority(&self) -> i32 {
        CODE_RULE_PRIORITY
    }

    fn claims(&self, kind: NodeKind) -> bool {
        kind == NodeKind::CodeBlock
    }

    fn apply(&self, node: NodeMut<'_>, config: &Config) -> Result<()> {
        let NodeMut::CodeBlock(block) = node else {
            return Ok(());
        };

        if block.fenced {
            block.fence = config.code.fence_style;
        }

        // Language detection is a policy hook with no detector behind it yet.
        if config.code.language_detection && block.language.is_empty() {
            trace!("no language tag on code block, leaving it untagged");
        }
        Ok(())
    }
}

// ============================================================================
// Inline
// ============================================================================

pub struct InlineRule;

impl Rule for InlineRule {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn priority(&self) -> i32 {
        INLINE_RULE_PRIORITY
    }

    fn claims(&self, kind: NodeKind) -> bool {
        matches!(kind, NodeKind::Text | NodeKind::Paragraph)
    }

    fn apply(&self, node: NodeMut<'_>, _config: &Config) -> Result<()> {
        match node {
            NodeMut::Text(text) => text.content = normalize_inline(&text.content),
            NodeMut::Paragraph(paragraph) => paragraph.text = normalize_inline(&paragraph.text),
            _ => {}
        }
        Ok(())
    }
}

// ============================================================================
// Whitespace
// ============================================================================

pub struct WhitespaceRule;

impl Rule for WhitespaceRule {
    fn name(&self) -> &'static str {
        "whitespace"
    }

    fn priority(&self) -> i32 {
        WHITESPACE_RULE_PRIORITY
    }

    fn claims(&self, _kind: NodeKind) -> bool {
        true
    }

    fn apply(&self, node: NodeMut<'_>, config: &Config) -> Result<()> {
        if !config.whitespace.trim_trailing_spaces {
            return Ok(());
        }

        match node {
            NodeMut::Paragraph(paragraph) => paragraph.text = trim_trailing_spaces(&paragraph.text),
            NodeMut::Heading(heading) => heading.text = heading.text.trim().to_string(),
            NodeMut::Text(text) => text.content = trim_trailing_spaces(&text.content),
            NodeMut::CodeBlock(block) => block.content = trim_trailing_spaces(&block.content),
            NodeMut::Document(_) | NodeMut::List(_) | NodeMut::ListItem(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BulletStyle, NumberStyle};
    use crate::tree::{CodeBlock, FenceStyle, Heading, Paragraph, Text};

    fn heading_with(level: u8, style: HeadingStyle, normalize: bool) -> Heading {
        let mut config = Config::default();
        config.heading.style = style;
        config.heading.normalize_levels = normalize;
        let mut heading = Heading::new(level, "  Title  ");
        HeadingRule
            .apply(NodeMut::Heading(&mut heading), &config)
            .unwrap();
        heading
    }

    #[test]
    fn test_heading_clamps_levels() {
        assert_eq!(heading_with(0, HeadingStyle::Atx, true).level, 1);
        assert_eq!(heading_with(9, HeadingStyle::Atx, true).level, 6);
        assert_eq!(heading_with(4, HeadingStyle::Atx, true).level, 4);
        assert_eq!(heading_with(9, HeadingStyle::Atx, false).level, 9);
    }

    #[test]
    fn test_heading_setext_only_for_two_levels() {
        assert_eq!(heading_with(1, HeadingStyle::Setext, true).style, HeadingStyle::Setext);
        assert_eq!(heading_with(2, HeadingStyle::Setext, true).style, HeadingStyle::Setext);
        assert_eq!(heading_with(3, HeadingStyle::Setext, true).style, HeadingStyle::Atx);
        assert_eq!(heading_with(0, HeadingStyle::Setext, true).style, HeadingStyle::Setext);
    }

    #[test]
    fn test_heading_atx_overrides_source_style() {
        let mut heading = Heading::new(1, "x");
        heading.style = HeadingStyle::Setext;
        HeadingRule
            .apply(NodeMut::Heading(&mut heading), &Config::default())
            .unwrap();
        assert_eq!(heading.style, HeadingStyle::Atx);
        assert_eq!(heading_with(1, HeadingStyle::Atx, true).text, "Title");
    }

    #[test]
    fn test_paragraph_reflow_and_collapse() {
        let mut config = Config::default();
        config.line_width = 10;
        let mut paragraph = Paragraph::new("  one   two three\nfour  ");
        ParagraphRule
            .apply(NodeMut::Paragraph(&mut paragraph), &config)
            .unwrap();
        assert_eq!(paragraph.text, "one two\nthree four");
    }

    #[test]
    fn test_paragraph_without_width_keeps_breaks() {
        let mut config = Config::default();
        config.line_width = 0;
        let mut paragraph = Paragraph::new(" a   b\n  c ");
        ParagraphRule
            .apply(NodeMut::Paragraph(&mut paragraph), &config)
            .unwrap();
        assert_eq!(paragraph.text, "a b\nc");
    }

    #[test]
    fn test_unordered_bullets_unified() {
        let mut list = List::unordered(vec![
            ListItem::new("*", "a"),
            ListItem::new("+", "b"),
            ListItem::new("-", "c"),
        ]);
        list.marker = "*".to_string();
        ListRule
            .apply(NodeMut::List(&mut list), &Config::default())
            .unwrap();
        assert_eq!(list.marker, "-");
        assert!(list.items.iter().all(|i| i.marker == "-"));
    }

    #[test]
    fn test_ordered_numbering_restarts_per_list() {
        let mut config = Config::default();
        config.list.number_style = NumberStyle::Paren;
        config.list.bullet_style = BulletStyle::Plus;

        let nested = List::ordered(vec![ListItem::new("7.", "x"), ListItem::new("9.", "y")]);
        let mut list = List::ordered(vec![
            ListItem::new("3.", "  a   b "),
            ListItem::new("3.", "c").with_child(nested),
            ListItem::new("3.", "d").with_child(List::unordered(vec![ListItem::new("*", "e")])),
        ]);
        ListRule.apply(NodeMut::List(&mut list), &config).unwrap();

        let markers: Vec<_> = list.items.iter().map(|i| i.marker.as_str()).collect();
        assert_eq!(markers, vec!["1)", "2)", "3)"]);
        assert_eq!(list.marker, ")");
        assert_eq!(list.items[0].text, "a b");

        let Node::List(nested) = &list.items[1].children[0] else {
            panic!("expected nested list");
        };
        let nested_markers: Vec<_> = nested.items.iter().map(|i| i.marker.as_str()).collect();
        assert_eq!(nested_markers, vec!["1)", "2)"]);

        let Node::List(bullets) = &list.items[2].children[0] else {
            panic!("expected nested list");
        };
        assert_eq!(bullets.items[0].marker, "+");
    }

    #[test]
    fn test_list_item_with_block_child_fails() {
        let mut item = ListItem::new("-", "a");
        item.children.push(Node::Paragraph(Paragraph::new("b")));
        let mut list = List::unordered(vec![item]);
        let err = ListRule
            .apply(NodeMut::List(&mut list), &Config::default())
            .unwrap_err();
        assert!(matches!(
            err,
            MdfmtError::Format { rule: "list", node: NodeKind::Paragraph, .. }
        ));
    }

    #[test]
    fn test_code_fence_rewritten_only_when_fenced() {
        let mut config = Config::default();
        config.code.fence_style = FenceStyle::Tilde;

        let mut fenced = CodeBlock::fenced("rust", "  let x = 1;  \n");
        CodeBlockRule
            .apply(NodeMut::CodeBlock(&mut fenced), &config)
            .unwrap();
        assert_eq!(fenced.fence, FenceStyle::Tilde);
        assert_eq!(fenced.content, "  let x = 1;  \n");

        let mut indented = CodeBlock::indented("x");
        CodeBlockRule
            .apply(NodeMut::CodeBlock(&mut indented), &config)
            .unwrap();
        assert_eq!(indented.fence, FenceStyle::Backtick);
    }

    #[test]
    fn test_inline_rule_on_text() {
        let mut text = Text::new("| _a_ | `  b  ` |");
        InlineRule
            .apply(NodeMut::Text(&mut text), &Config::default())
            .unwrap();
        assert_eq!(text.content, "| *a* | `b` |");
    }

    #[test]
    fn test_whitespace_rule() {
        let config = Config::default();

        let mut block = CodeBlock::fenced("", "    indented   \n\tx \n");
        WhitespaceRule
            .apply(NodeMut::CodeBlock(&mut block), &config)
            .unwrap();
        assert_eq!(block.content, "    indented\n\tx\n");

        let mut text = Text::new("> a  \n> b ");
        WhitespaceRule.apply(NodeMut::Text(&mut text), &config).unwrap();
        assert_eq!(text.content, "> a\n> b");

        let mut off = Config::default();
        off.whitespace.trim_trailing_spaces = false;
        let mut untouched = Text::new("a  ");
        WhitespaceRule.apply(NodeMut::Text(&mut untouched), &off).unwrap();
        assert_eq!(untouched.content, "a  ");
    }

    #[test]
    fn test_rules_ignore_unclaimed_nodes() {
        let mut text = Text::new("  keep  ");
        HeadingRule
            .apply(NodeMut::Text(&mut text), &Config::default())
            .unwrap();
        assert_eq!(text.content, "  keep  ");
    }
}
