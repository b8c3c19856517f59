//! Serializes a formatted [`Document`] back to markdown text.

use crate::constants::{MAX_HEADING_LEVEL, MIN_HEADING_LEVEL, MIN_SETEXT_UNDERLINE, SETEXT_MAX_LEVEL};
use crate::error::{MdfmtError, Result};
use crate::format::reflow::{contains_link, reflow, trim_trailing_spaces};
use crate::models::Config;
use crate::tree::{CodeBlock, Document, Heading, HeadingStyle, List, ListItem, Node, Paragraph, Text};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// A link whose label spans a line break.
static BROKEN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*\n[^\]]*)\]\(([^)]*)\)").unwrap());

static LABEL_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\n\s*").unwrap());

/// Render `doc` with `config`.
pub fn render(doc: &Document, config: &Config) -> Result<String> {
    Renderer::new(config).render(doc)
}

/// Stateful serializer. One instance renders one document.
pub struct Renderer<'a> {
    output: String,
    config: &'a Config,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            output: String::new(),
            config,
        }
    }

    pub fn render(mut self, doc: &Document) -> Result<String> {
        for child in &doc.children {
            self.render_node(child)?;
        }

        let mut result = normalize_blank_lines(&self.output, self.config.whitespace.max_blank_lines);
        let content_len = result.trim_end_matches('\n').len();
        result.truncate(content_len);

        if self.config.whitespace.ensure_final_newline {
            result.push('\n');
        }
        Ok(result)
    }

    fn render_node(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Document(_) => Err(MdfmtError::Render("documents cannot be nested".to_string())),
            Node::Heading(heading) => self.render_heading(heading),
            Node::Paragraph(paragraph) => {
                self.render_paragraph(paragraph);
                Ok(())
            }
            Node::List(list) => {
                self.render_list(list, 0)?;
                self.output.push('\n');
                Ok(())
            }
            Node::ListItem(item) => {
                self.render_item(item, 0)?;
                self.output.push('\n');
                Ok(())
            }
            Node::CodeBlock(block) => {
                self.render_code_block(block);
                Ok(())
            }
            Node::Text(text) => {
                self.render_text(text);
                Ok(())
            }
        }
    }

    fn render_heading(&mut self, heading: &Heading) -> Result<()> {
        if !(MIN_HEADING_LEVEL..=MAX_HEADING_LEVEL).contains(&heading.level) {
            return Err(MdfmtError::Render(format!(
                "heading level {} is outside {}..={}",
                heading.level, MIN_HEADING_LEVEL, MAX_HEADING_LEVEL
            )));
        }

        let text = heading.text.trim();
        if heading.style == HeadingStyle::Setext && heading.level <= SETEXT_MAX_LEVEL && !text.is_empty() {
            let underline = if heading.level == 1 { "=" } else { "-" };
            let width = text.chars().count().max(MIN_SETEXT_UNDERLINE);
            self.output.push_str(text);
            self.output.push('\n');
            self.output.push_str(&underline.repeat(width));
        } else {
            self.output.push_str(&"#".repeat(heading.level as usize));
            if !text.is_empty() {
                self.output.push(' ');
                self.output.push_str(text);
                // A trailing run of `#` would be read back as a closing sequence.
                if text.split_whitespace().last().is_some_and(|w| w.chars().all(|c| c == '#')) {
                    self.output.push_str(" #");
                }
            }
        }
        self.output.push_str("\n\n");
        Ok(())
    }

    fn render_paragraph(&mut self, paragraph: &Paragraph) {
        let mut text = repair_broken_links(&paragraph.text);

        // Any link at all disables reflow for the whole paragraph.
        if self.config.line_width > 0 && !contains_link(&text) {
            text = reflow(&text, self.config.line_width);
        }

        self.output.push_str(&text);
        self.output.push_str("\n\n");
    }

    fn render_list(&mut self, list: &List, indent: usize) -> Result<()> {
        for item in &list.items {
            self.render_item(item, indent)?;
        }
        Ok(())
    }

    fn render_item(&mut self, item: &ListItem, indent: usize) -> Result<()> {
        let marker = if item.marker.is_empty() {
            self.config.list.bullet_style.as_str()
        } else {
            item.marker.as_str()
        };
        let content_column = indent + marker.chars().count() + 1;

        let mut lines = item.text.split('\n');
        self.output.push_str(&" ".repeat(indent));
        self.output.push_str(marker);
        if let Some(first) = lines.next().filter(|line| !line.is_empty()) {
            self.output.push(' ');
            self.output.push_str(first);
        }
        self.output.push('\n');

        for line in lines {
            if !line.is_empty() {
                self.output.push_str(&" ".repeat(content_column));
                self.output.push_str(line);
            }
            self.output.push('\n');
        }

        let nested_indent = if self.config.list.consistent_indentation {
            content_column
        } else {
            indent + 2
        };

        for child in &item.children {
            match child {
                Node::List(nested) => self.render_list(nested, nested_indent)?,
                other => {
                    return Err(MdfmtError::Render(format!(
                        "list items may only contain nested lists, found {}",
                        other.kind()
                    )))
                }
            }
        }
        Ok(())
    }

    fn render_code_block(&mut self, block: &CodeBlock) {
        if block.fenced {
            let fence_char = block.fence.fence_char();
            let fence = fence_char
                .to_string()
                .repeat(longest_fence_run(&block.content, fence_char).map_or(3, |run| (run + 1).max(3)));

            self.output.push_str(&fence);
            self.output.push_str(&block.language);
            self.output.push('\n');
            if !block.content.is_empty() {
                self.output.push_str(&block.content);
                if !block.content.ends_with('\n') {
                    self.output.push('\n');
                }
            }
            self.output.push_str(&fence);
            self.output.push_str("\n\n");
        } else {
            let content = block.content.strip_suffix('\n').unwrap_or(&block.content);
            for line in content.split('\n') {
                if !line.trim().is_empty() {
                    self.output.push_str("    ");
                    self.output.push_str(line);
                }
                self.output.push('\n');
            }
            self.output.push('\n');
        }
    }

    fn render_text(&mut self, text: &Text) {
        if self.config.whitespace.trim_trailing_spaces {
            self.output.push_str(&trim_trailing_spaces(&text.content));
        } else {
            self.output.push_str(&text.content);
        }
        self.output.push_str("\n\n");
    }
}

/// Rejoin link labels broken across lines until none remain.
pub fn repair_broken_links(text: &str) -> String {
    let mut text = text.to_string();
    while BROKEN_LINK_RE.is_match(&text) {
        text = BROKEN_LINK_RE
            .replace_all(&text, |caps: &Captures| {
                format!("[{}]({})", LABEL_BREAK_RE.replace_all(&caps[1], " "), &caps[2])
            })
            .into_owned();
    }
    text
}

/// Longest run of `fence_char` opening a line of `content`.
fn longest_fence_run(content: &str, fence_char: char) -> Option<usize> {
    content
        .lines()
        .map(|line| line.trim_start().chars().take_while(|&c| c == fence_char).count())
        .filter(|&run| run > 0)
        .max()
}

/// Cap runs of blank lines at `max`. A negative `max` disables capping.
pub fn normalize_blank_lines(text: &str, max: i32) -> String {
    let Ok(max) = usize::try_from(max) else {
        return text.to_string();
    };

    let mut kept = Vec::new();
    let mut blank_run = 0;
    for line in text.split('\n') {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > max {
                continue;
            }
        } else {
            blank_run = 0;
        }
        kept.push(line);
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BulletStyle, Config};
    use crate::tree::FenceStyle;

    fn fragment(node: Node, config: &Config) -> String {
        let mut renderer = Renderer::new(config);
        renderer.render_node(&node).unwrap();
        renderer.output
    }

    fn doc(children: Vec<Node>) -> Document {
        Document::new(children)
    }

    #[test]
    fn test_atx_heading() {
        let out = fragment(Node::Heading(Heading::new(3, "Title")), &Config::default());
        assert_eq!(out, "### Title\n\n");
        let out = fragment(Node::Heading(Heading::new(2, "")), &Config::default());
        assert_eq!(out, "##\n\n");
    }

    #[test]
    fn test_atx_heading_ending_in_hashes_gets_closing_sequence() {
        let out = fragment(Node::Heading(Heading::new(1, "C #")), &Config::default());
        assert_eq!(out, "# C # #\n\n");
        let out = fragment(Node::Heading(Heading::new(2, "C\\#")), &Config::default());
        assert_eq!(out, "## C\\#\n\n");
    }

    #[test]
    fn test_setext_heading_underline_length() {
        let mut heading = Heading::new(1, "Hi");
        heading.style = HeadingStyle::Setext;
        assert_eq!(fragment(Node::Heading(heading.clone()), &Config::default()), "Hi\n===\n\n");

        heading.level = 2;
        heading.text = "Longer title".to_string();
        assert_eq!(
            fragment(Node::Heading(heading), &Config::default()),
            "Longer title\n------------\n\n"
        );
    }

    #[test]
    fn test_setext_falls_back_for_deep_or_empty() {
        let mut deep = Heading::new(3, "Deep");
        deep.style = HeadingStyle::Setext;
        assert_eq!(fragment(Node::Heading(deep), &Config::default()), "### Deep\n\n");

        let mut empty = Heading::new(1, "");
        empty.style = HeadingStyle::Setext;
        assert_eq!(fragment(Node::Heading(empty), &Config::default()), "#\n\n");
    }

    #[test]
    fn test_heading_level_out_of_range_fails() {
        let err = render(&doc(vec![Node::Heading(Heading::new(7, "x"))]), &Config::default());
        assert!(matches!(err, Err(MdfmtError::Render(_))));
        let err = render(&doc(vec![Node::Heading(Heading::new(0, "x"))]), &Config::default());
        assert!(matches!(err, Err(MdfmtError::Render(_))));
    }

    #[test]
    fn test_paragraph_reflow_skipped_with_link() {
        let mut config = Config::default();
        config.line_width = 20;
        let text = "Check [the docs](http://example.com/very/long/path) now";
        let out = fragment(Node::Paragraph(Paragraph::new(text)), &config);
        assert_eq!(out, format!("{}\n\n", text));

        let out = fragment(Node::Paragraph(Paragraph::new("one two three four five six")), &config);
        assert_eq!(out, "one two three four\nfive six\n\n");
    }

    #[test]
    fn test_repair_broken_links() {
        assert_eq!(
            repair_broken_links("see [the\n  long\ndocs](http://x) now"),
            "see [the long docs](http://x) now"
        );
        assert_eq!(repair_broken_links("[a](b)\n[c](d)"), "[a](b)\n[c](d)");
        assert_eq!(repair_broken_links("plain\ntext"), "plain\ntext");
    }

    #[test]
    fn test_list_rendering_with_nesting() {
        let nested = List::ordered(vec![ListItem::new("1.", "x"), ListItem::new("2.", "y")]);
        let list = List::unordered(vec![
            ListItem::new("-", "a").with_child(nested),
            ListItem::new("-", "b\ncontinued"),
        ]);
        let out = render(&doc(vec![Node::List(list)]), &Config::default()).unwrap();
        assert_eq!(out, "- a\n  1. x\n  2. y\n- b\n  continued\n");
    }

    #[test]
    fn test_nested_indent_follows_marker_width() {
        let nested = List::unordered(vec![ListItem::new("-", "inner")]);
        let list = List::ordered(vec![ListItem::new("10.", "outer").with_child(nested.clone())]);

        let out = render(&doc(vec![Node::List(list.clone())]), &Config::default()).unwrap();
        assert_eq!(out, "10. outer\n    - inner\n");

        let mut config = Config::default();
        config.list.consistent_indentation = false;
        let out = render(&doc(vec![Node::List(list)]), &config).unwrap();
        assert_eq!(out, "10. outer\n  - inner\n");
    }

    #[test]
    fn test_list_item_without_marker_or_text() {
        let mut config = Config::default();
        config.list.bullet_style = BulletStyle::Plus;
        let list = List::unordered(vec![ListItem::new("", "a"), ListItem::new("-", "")]);
        let out = render(&doc(vec![Node::List(list)]), &config).unwrap();
        assert_eq!(out, "+ a\n-\n");
    }

    #[test]
    fn test_list_item_non_list_child_fails() {
        let mut item = ListItem::new("-", "a");
        item.children.push(Node::Text(Text::new("x")));
        let err = render(&doc(vec![Node::List(List::unordered(vec![item]))]), &Config::default());
        assert!(matches!(err, Err(MdfmtError::Render(_))));
    }

    #[test]
    fn test_fenced_code() {
        let block = CodeBlock::fenced("rust", "fn main() {}");
        assert_eq!(
            fragment(Node::CodeBlock(block), &Config::default()),
            "```rust\nfn main() {}\n```\n\n"
        );

        let mut tilde = CodeBlock::fenced("", "");
        tilde.fence = FenceStyle::Tilde;
        assert_eq!(fragment(Node::CodeBlock(tilde), &Config::default()), "~~~\n~~~\n\n");
    }

    #[test]
    fn test_fence_outgrows_content_fences() {
        let block = CodeBlock::fenced("md", "````\ninner\n````\n");
        assert_eq!(
            fragment(Node::CodeBlock(block), &Config::default()),
            "`````md\n````\ninner\n````\n`````\n\n"
        );
    }

    #[test]
    fn test_indented_code() {
        let block = CodeBlock::indented("let x = 1;\n\n  y\n");
        assert_eq!(
            fragment(Node::CodeBlock(block), &Config::default()),
            "    let x = 1;\n\n      y\n\n"
        );
    }

    #[test]
    fn test_text_trailing_trim_is_optional() {
        let text = Node::Text(Text::new("> a  \n> b"));
        assert_eq!(fragment(text.clone(), &Config::default()), "> a\n> b\n\n");

        let mut config = Config::default();
        config.whitespace.trim_trailing_spaces = false;
        assert_eq!(fragment(text, &config), "> a  \n> b\n\n");
    }

    #[test]
    fn test_document_end_normalization() {
        let config = Config::default();
        assert_eq!(render(&Document::default(), &config).unwrap(), "\n");

        let mut bare = Config::default();
        bare.whitespace.ensure_final_newline = false;
        let d = doc(vec![Node::Paragraph(Paragraph::new("x"))]);
        assert_eq!(render(&d, &bare).unwrap(), "x");
        assert_eq!(render(&d, &config).unwrap(), "x\n");
    }

    #[test]
    fn test_nested_document_fails() {
        let d = doc(vec![Node::Document(Document::default())]);
        assert!(matches!(render(&d, &Config::default()), Err(MdfmtError::Render(_))));
    }

    #[test]
    fn test_normalize_blank_lines() {
        assert_eq!(normalize_blank_lines("a\n\n\n\n\nb", 2), "a\n\n\nb");
        assert_eq!(normalize_blank_lines("a\n\n\nb", 0), "a\nb");
        assert_eq!(normalize_blank_lines("a\n\n\n\nb", -1), "a\n\n\n\nb");
        assert_eq!(normalize_blank_lines("a\n  \n\t\n\nb", 1), "a\n  \nb");
    }
}
