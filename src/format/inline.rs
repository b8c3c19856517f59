//! Best-effort inline markup cleanup.
//!
//! Substitutions never touch code: fenced regions are skipped line by line and
//! code spans are found with a backtick-run scanner before any pattern runs.
//! Link destinations, angle-bracketed autolinks and tags, and bare URLs are
//! left alone as well.

use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::LazyLock;

static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b_([^_]+)_\b").unwrap());

static LINK_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s+([^\]\s](?:[^\]]*[^\]\s])?)\s+\]([(\[])").unwrap()
});

static PROTECTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\([^)]*\)|<[^<>]+>|\S+://\S+").unwrap());

/// Apply all inline substitutions to `text`, outside of code.
pub fn normalize_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prose = String::new();
    let mut fence: Option<(char, usize)> = None;

    for line in text.split_inclusive('\n') {
        let marker = fence_marker(line);
        match (fence, marker) {
            (None, Some(opened)) => {
                out.push_str(&rewrite_outside_code(&std::mem::take(&mut prose)));
                out.push_str(line);
                fence = Some(opened);
            }
            (Some((open_char, open_len)), Some((c, len)))
                if c == open_char && len >= open_len && is_bare_fence(line) =>
            {
                out.push_str(line);
                fence = None;
            }
            (Some(_), _) => out.push_str(line),
            (None, None) => prose.push_str(line),
        }
    }

    out.push_str(&rewrite_outside_code(&prose));
    out
}

/// Fence character and run length if `line` opens or closes a fenced block.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run = trimmed.chars().take_while(|&c| c == first).count();
    (run >= 3).then_some((first, run))
}

fn is_bare_fence(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.chars().all(|c| c == '`') || trimmed.chars().all(|c| c == '~')
}

/// Rewrite prose, passing code spans to `normalize_code_span` and everything
/// else to `rewrite_plain`.
fn rewrite_outside_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for span in code_span_ranges(text) {
        out.push_str(&rewrite_plain(&text[last..span.start]));
        let run = backtick_run(text.as_bytes(), span.start);
        out.push_str(&normalize_code_span(&text[span.clone()], run));
        last = span.end;
    }

    out.push_str(&rewrite_plain(&text[last..]));
    out
}

/// Byte ranges of the code spans in `text`, backtick delimiters included.
/// Escaped backticks never open a span.
pub fn code_span_ranges(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => {
                let run = backtick_run(bytes, i);
                match find_closing_run(bytes, i + run, run) {
                    Some(close) => {
                        spans.push(i..close + run);
                        i = close + run;
                    }
                    None => i += run,
                }
            }
            _ => i += 1,
        }
    }

    spans
}

fn backtick_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|&&b| b == b'`').count()
}

fn find_closing_run(bytes: &[u8], from: usize, run: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let len = backtick_run(bytes, j);
            if len == run {
                return Some(j);
            }
            j += len;
        } else {
            j += 1;
        }
    }
    None
}

/// Trim a code span padded with whitespace on both sides.
fn normalize_code_span(span: &str, run: usize) -> String {
    let content = &span[run..span.len() - run];
    let padded = content.starts_with(char::is_whitespace) && content.ends_with(char::is_whitespace);
    let trimmed = content.trim();

    if !padded || trimmed.is_empty() || trimmed.starts_with('`') || trimmed.ends_with('`') {
        return span.to_string();
    }

    let delimiter = &span[..run];
    format!("{}{}{}", delimiter, trimmed, delimiter)
}

/// Link-label trimming, then underscore emphasis on unprotected stretches.
fn rewrite_plain(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = LINK_LABEL_RE.replace_all(text, |caps: &Captures| {
        format!("[{}]{}", &caps[1], &caps[2])
    });

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in PROTECTED_RE.find_iter(&text) {
        out.push_str(&EMPHASIS_RE.replace_all(&text[last..m.start()], "*$1*"));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&EMPHASIS_RE.replace_all(&text[last..], "*$1*"));
    out
}
