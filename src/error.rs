use crate::tree::NodeKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MdfmtError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse markdown: {0}")]
    Parse(String),

    #[error("Failed to format document: {rule} rule rejected {node} node: {message}")]
    Format {
        rule: &'static str,
        node: NodeKind,
        message: String,
    },

    #[error("Failed to render document: {0}")]
    Render(String),

    #[error("Path not found: {0}")]
    MissingPath(PathBuf),

    #[error("Worker task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, MdfmtError>;
