//! Markdown formatter: parse into a small document tree, normalize it with a
//! priority-ordered rule engine, and render it back to markdown.

pub mod constants;
pub mod error;
pub mod format;
pub mod formatter;
pub mod loader;
pub mod models;
pub mod parser;
pub mod processor;
pub mod renderer;
pub mod tree;

pub use error::{MdfmtError, Result};
pub use formatter::{format_and_render, format_str};
pub use models::Config;
