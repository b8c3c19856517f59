//! Markdown → [`Document`] adapter on top of `pulldown-cmark`.
//!
//! The event stream is walked with byte offsets so inline content can be taken
//! straight from the source: emphasis, links, escapes and entities keep the
//! literal markup the renderer writes back out. Constructs the tree cannot
//! represent become opaque [`Text`] blocks holding their exact source.

use crate::error::{MdfmtError, Result};
use crate::format::inline::code_span_ranges;
use crate::tree::{CodeBlock, Document, FenceStyle, Heading, HeadingStyle, List, ListItem, Node, Paragraph, Text};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use std::ops::Range;
use tracing::debug;

type Spanned<'a> = (Event<'a>, Range<usize>);

/// Borrow raw input as text. Input must be UTF-8.
pub fn decode(raw: &[u8]) -> Result<&str> {
    std::str::from_utf8(raw).map_err(|e| MdfmtError::Parse(format!("input is not valid UTF-8: {}", e)))
}

/// Parse raw bytes.
pub fn parse_bytes(raw: &[u8]) -> Result<Document> {
    parse(decode(raw)?)
}

/// Parse markdown source into a document tree.
pub fn parse(source: &str) -> Result<Document> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(source, options);

    let mut definitions: Vec<Range<usize>> = parser
        .reference_definitions()
        .iter()
        .map(|(_, def)| def.span.clone())
        .collect();
    definitions.sort_by_key(|span| span.start);

    let events: Vec<Spanned> = parser.into_offset_iter().collect();

    let mut children = Vec::new();
    let mut opaque: Vec<Range<usize>> = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let end = matching_end(&events, i);
        let (event, range) = &events[i];
        let inner = inner_events(&events, i, end);

        let node = match event {
            Event::Start(Tag::Heading { level, .. }) => {
                let text = collapse_outside_code(&inline_text(source, inner));
                let style = if source[range.clone()].trim_start().starts_with('#') {
                    HeadingStyle::Atx
                } else {
                    HeadingStyle::Setext
                };
                Node::Heading(Heading {
                    level: *level as u8,
                    text,
                    style,
                })
            }
            Event::Start(Tag::Paragraph) => Node::Paragraph(Paragraph::new(inline_text(source, inner))),
            Event::Start(Tag::CodeBlock(kind)) => Node::CodeBlock(code_block(source, range, kind, inner)),
            Event::Start(Tag::List(first)) => match build_list(source, inner, first.is_some()) {
                Some(list) => {
                    push_list(&mut children, list);
                    i = end + 1;
                    continue;
                }
                None => {
                    debug!(offset = range.start, "list holds block content, passing it through");
                    opaque.push(range.clone());
                    opaque_text(source, range)
                }
            },
            _ => {
                opaque.push(range.clone());
                opaque_text(source, range)
            }
        };

        children.push(node);
        i = end + 1;
    }

    let definitions: Vec<&str> = definitions
        .iter()
        .filter(|def| !opaque.iter().any(|o| o.start <= def.start && def.end <= o.end))
        .map(|def| source[def.clone()].trim())
        .collect();
    if !definitions.is_empty() {
        children.push(Node::Text(Text::new(definitions.join("\n"))));
    }

    Ok(Document::new(children))
}

/// Append `list`, joining it onto a directly preceding list of the same kind.
///
/// Lists that differ only in their marker character are separate lists in the
/// source but become one once markers are unified.
fn push_list(nodes: &mut Vec<Node>, list: List) {
    if let Some(Node::List(previous)) = nodes.last_mut() {
        if previous.ordered == list.ordered {
            previous.items.extend(list.items);
            return;
        }
    }
    nodes.push(Node::List(list));
}

/// Index of the event closing the element opened at `start`.
fn matching_end(events: &[Spanned], start: usize) -> usize {
    if !matches!(events[start].0, Event::Start(_)) {
        return start;
    }

    let mut depth = 0usize;
    for (i, (event, _)) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    events.len() - 1
}

fn inner_events<'e, 'a>(events: &'e [Spanned<'a>], start: usize, end: usize) -> &'e [Spanned<'a>] {
    if end > start {
        &events[start + 1..end]
    } else {
        &[]
    }
}

fn opaque_text(source: &str, range: &Range<usize>) -> Node {
    Node::Text(Text::new(source[range.clone()].trim_end()))
}

/// Source text covered by a run of inline events.
fn inline_text(source: &str, events: &[Spanned]) -> String {
    let start = events.iter().map(|(_, r)| r.start).min();
    let end = events.iter().map(|(_, r)| r.end).max();
    match (start, end) {
        (Some(start), Some(end)) => inline_slice(source, start..end),
        _ => String::new(),
    }
}

/// Slice `range` out of `source`, dropping continuation-line indentation.
///
/// The event for an escaped character starts after its backslash, so the
/// slice is widened back over any backslashes directly before `range`.
fn inline_slice(source: &str, range: Range<usize>) -> String {
    let bytes = source.as_bytes();
    let mut start = range.start;
    while start > 0 && bytes[start - 1] == b'\\' {
        start -= 1;
    }

    source[start..range.end]
        .split('\n')
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse whitespace runs to one space, leaving code spans intact apart
/// from line breaks.
fn collapse_outside_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in code_span_ranges(text) {
        push_collapsed(&mut out, &text[last..span.start]);
        out.push_str(&text[span.clone()].replace('\n', " "));
        last = span.end;
    }
    push_collapsed(&mut out, &text[last..]);
    out.trim().to_string()
}

fn push_collapsed(out: &mut String, text: &str) {
    for c in text.chars() {
        if !c.is_whitespace() {
            out.push(c);
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
    }
}

fn code_block(source: &str, range: &Range<usize>, kind: &CodeBlockKind, events: &[Spanned]) -> CodeBlock {
    let content: String = events
        .iter()
        .filter_map(|(event, _)| match event {
            Event::Text(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect();

    match kind {
        CodeBlockKind::Fenced(info) => {
            let fence = if source[range.clone()].trim_start().starts_with('~') {
                FenceStyle::Tilde
            } else {
                FenceStyle::Backtick
            };
            CodeBlock {
                language: info.trim().to_string(),
                content,
                fenced: true,
                fence,
            }
        }
        CodeBlockKind::Indented => CodeBlock::indented(content),
    }
}

fn is_inline_tag(tag: &Tag) -> bool {
    matches!(
        tag,
        Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
    )
}

/// Build a list from the events between its start and end, or `None` when an
/// item holds content the tree cannot represent.
fn build_list(source: &str, events: &[Spanned], ordered: bool) -> Option<List> {
    let mut items = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let end = matching_end(events, i);
        match &events[i] {
            (Event::Start(Tag::Item), range) => {
                items.push(build_item(source, range, inner_events(events, i, end))?);
            }
            _ => return None,
        }
        i = end + 1;
    }

    let marker = match items.first() {
        Some(item) if ordered => item.marker.trim_start_matches(|c: char| c.is_ascii_digit()).to_string(),
        Some(item) => item.marker.clone(),
        None if ordered => ".".to_string(),
        None => "-".to_string(),
    };

    Some(List {
        ordered,
        marker,
        items,
    })
}

fn build_item(source: &str, range: &Range<usize>, events: &[Spanned]) -> Option<ListItem> {
    let mut run: Option<Range<usize>> = None;
    let mut text: Option<String> = None;
    let mut children = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let end = matching_end(events, i);
        let (event, span) = &events[i];

        match event {
            Event::Start(Tag::List(first)) => {
                if let Some(r) = run.take() {
                    text = Some(inline_slice(source, r));
                }
                let nested = build_list(source, inner_events(events, i, end), first.is_some())?;
                push_list(&mut children, nested);
            }
            Event::Start(Tag::Paragraph) => {
                if text.is_some() || run.is_some() || !children.is_empty() {
                    return None;
                }
                text = Some(inline_text(source, inner_events(events, i, end)));
            }
            Event::Start(tag) if !is_inline_tag(tag) => return None,
            Event::End(_) => return None,
            _ => {
                if text.is_some() || !children.is_empty() {
                    return None;
                }
                run = Some(match run {
                    Some(r) => r.start.min(span.start)..r.end.max(span.end),
                    None => span.clone(),
                });
            }
        }
        i = end + 1;
    }

    if let Some(r) = run {
        text = Some(inline_slice(source, r));
    }

    Some(ListItem {
        text: text.unwrap_or_default(),
        marker: item_marker(&source[range.clone()]),
        children,
    })
}

/// Marker at the start of an item's source, e.g. `*` or `12)`.
fn item_marker(item_source: &str) -> String {
    let trimmed = item_source.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    match trimmed[digits..].chars().next() {
        Some(c) if digits > 0 && (c == '.' || c == ')') => trimmed[..=digits].to_string(),
        Some(c) if digits == 0 && matches!(c, '-' | '*' | '+') => c.to_string(),
        _ => String::new(),
    }
}
