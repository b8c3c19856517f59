//! Greedy text reflow that keeps link constructs whole.
//!
//! Shared by the paragraph rule and the renderer. A link or image construct
//! `[label](destination)` is one atomic token even when the label contains
//! spaces; everything else splits on whitespace.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[[^\]]*\]\([^)]*\)").unwrap());

/// A reflow unit and whether the source forced a line break after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub hard_break: bool,
}

/// True if `text` holds at least one `[label](destination)` construct.
pub fn contains_link(text: &str) -> bool {
    LINK_RE.is_match(text)
}

/// Byte ranges of every link construct in `text`.
pub fn link_ranges(text: &str) -> Vec<Range<usize>> {
    LINK_RE.find_iter(text).map(|m| m.range()).collect()
}

/// Split `text` into reflow tokens.
///
/// Whitespace inside a link construct does not split. A token ending in an
/// unescaped backslash followed by a line break is a hard break.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let links = link_ranges(text);
    let mut link_idx = 0;
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut pending: Option<usize> = None;
    let mut saw_newline = false;

    for (i, c) in text.char_indices() {
        while link_idx < links.len() && links[link_idx].end <= i {
            link_idx += 1;
        }
        let in_link = links.get(link_idx).is_some_and(|r| r.start <= i);

        if c.is_whitespace() && !in_link {
            if let Some(s) = start.take() {
                pending = Some(tokens.len());
                tokens.push(Token {
                    text: &text[s..i],
                    hard_break: false,
                });
                saw_newline = false;
            }
            if c == '\n' {
                saw_newline = true;
            }
            continue;
        }

        if start.is_none() {
            if let Some(idx) = pending.take() {
                tokens[idx].hard_break = saw_newline && ends_with_hard_break(tokens[idx].text);
            }
            start = Some(i);
        }
    }

    if let Some(s) = start {
        tokens.push(Token {
            text: &text[s..],
            hard_break: false,
        });
    }

    tokens
}

fn ends_with_hard_break(token: &str) -> bool {
    let backslashes = token.chars().rev().take_while(|&c| c == '\\').count();
    backslashes % 2 == 1
}

/// Tag names that start an HTML block able to interrupt a paragraph.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "pre", "script",
    "search", "section", "style", "summary", "table", "tbody", "td", "textarea", "tfoot", "th",
    "thead", "title", "tr", "track", "ul",
];

/// True if a line starting with `token` would open a new block instead of
/// continuing the paragraph.
pub fn opens_block(token: &str) -> bool {
    if matches!(token, "-" | "+" | "*" | "_" | "1." | "1)") {
        return true;
    }
    if token.starts_with('>') || token.starts_with("```") || token.starts_with("~~~") {
        return true;
    }
    if token.len() <= 6 && token.chars().all(|c| c == '#') {
        return true;
    }
    if token.chars().all(|c| c == '=') || token.chars().all(|c| c == '-') {
        return true;
    }
    if token.len() >= 3 && (token.chars().all(|c| c == '*') || token.chars().all(|c| c == '_')) {
        return true;
    }
    token.strip_prefix('<').is_some_and(opens_html_block)
}

/// `rest` follows a `<` at the start of a line.
fn opens_html_block(rest: &str) -> bool {
    if rest.starts_with("!--") || rest.starts_with('?') || rest.starts_with("![CDATA[") {
        return true;
    }
    if rest.strip_prefix('!').is_some_and(|r| r.starts_with(|c: char| c.is_ascii_alphabetic())) {
        return true;
    }

    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let name_len = rest.chars().take_while(|c| c.is_ascii_alphanumeric()).count();
    let (name, after) = rest.split_at(name_len);
    (after.is_empty() || after.starts_with('>') || after.starts_with("/>"))
        && BLOCK_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(name))
}

/// Group tokens into units that must share a line: a token followed by every
/// block-opening token after it. A hard break always ends a unit.
fn units<'a>(tokens: &[Token<'a>]) -> Vec<Vec<Token<'a>>> {
    let mut units: Vec<Vec<Token<'a>>> = Vec::new();

    for token in tokens {
        let joins = opens_block(token.text);
        match units.last_mut().filter(|unit| joins && unit.last().is_some_and(|t| !t.hard_break)) {
            Some(unit) => unit.push(*token),
            None => units.push(vec![*token]),
        }
    }

    units
}

/// Re-break `text` into lines no longer than `width` characters.
///
/// Lines are filled greedily with single spaces between tokens. A token that
/// would open a block at the start of a line stays on the line of the token
/// before it. A token or such a group longer than `width` sits alone on its
/// line and is never split. A width of 0 returns the text unchanged.
pub fn reflow(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }

    let tokens = tokenize(text);
    if tokens.is_empty() {
        return text.to_string();
    }

    let mut lines: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for unit in units(&tokens) {
        let unit_len = unit.iter().map(|t| t.text.chars().count()).sum::<usize>() + unit.len() - 1;

        if !current.is_empty() && current_len + 1 + unit_len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current_len += 1;
        }
        current.extend(unit.iter().map(|t| t.text));
        current_len += unit_len;

        if unit.last().is_some_and(|t| t.hard_break) {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
        .iter()
        .map(|line| line.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse whitespace runs within each line to one space and trim each line.
/// Line breaks are kept.
pub fn collapse_whitespace(text: &str) -> String {
    text.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove trailing spaces and tabs from every line, leaving indentation alone.
pub fn trim_trailing_spaces(text: &str) -> String {
    text.split('\n')
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n")
}
