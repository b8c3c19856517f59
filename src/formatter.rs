use crate::error::Result;
use crate::format::Engine;
use crate::models::Config;
use crate::tree::outline;
use crate::{parser, renderer};
use tracing::{debug, trace};

/// Format one document: parse, apply the rule pass, render.
///
/// A leading front-matter block is set aside before parsing and written back
/// unchanged, followed by one blank line.
pub fn format_and_render(raw: &[u8], config: &Config) -> Result<String> {
    let source = parser::decode(raw)?;
    let (front_matter, body) = split_front_matter(source);

    let mut doc = parser::parse(body)?;
    debug!(blocks = doc.children.len(), "parsed document");

    Engine::new().format(&mut doc, config)?;
    trace!("formatted tree:\n{}", outline(&doc));
    let rendered = renderer::render(&doc, config)?;

    Ok(match front_matter {
        Some(front) if rendered.trim().is_empty() => format!("{}{}", front, rendered),
        Some(front) => format!("{}\n\n{}", front, rendered),
        None => rendered,
    })
}

pub fn format_str(source: &str, config: &Config) -> Result<String> {
    format_and_render(source.as_bytes(), config)
}

/// Split a leading `---` delimited metadata block from the document body.
///
/// The returned block excludes the trailing line break. Without a closing
/// delimiter there is no front matter.
pub fn split_front_matter(source: &str) -> (Option<&str>, &str) {
    let Some(rest) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return (None, source);
    };

    let mut offset = source.len() - rest.len();
    for line in rest.split_inclusive('\n') {
        let end = offset + line.len();
        if line.trim_end() == "---" {
            return (Some(source[..end].trim_end()), &source[end..]);
        }
        offset = end;
    }
    (None, source)
}
