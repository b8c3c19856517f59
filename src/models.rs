use crate::constants::{
    DEFAULT_EXTENSIONS, DEFAULT_IGNORE_PATTERNS, DEFAULT_LINE_WIDTH, DEFAULT_MAX_BLANK_LINES,
};
use crate::error::{MdfmtError, Result};
use crate::tree::{FenceStyle, HeadingStyle};
use serde::{Deserialize, Serialize};

// ============================================================================
// Style Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BulletStyle {
    #[default]
    #[serde(rename = "-")]
    Dash,
    #[serde(rename = "*")]
    Asterisk,
    #[serde(rename = "+")]
    Plus,
}

impl BulletStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            BulletStyle::Dash => "-",
            BulletStyle::Asterisk => "*",
            BulletStyle::Plus => "+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NumberStyle {
    #[default]
    #[serde(rename = ".")]
    Period,
    #[serde(rename = ")")]
    Paren,
}

impl NumberStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            NumberStyle::Period => ".",
            NumberStyle::Paren => ")",
        }
    }
}

// ============================================================================
// Configuration Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target width for paragraph reflow; 0 disables reflow.
    pub line_width: usize,
    pub heading: HeadingConfig,
    pub list: ListConfig,
    pub code: CodeConfig,
    pub whitespace: WhitespaceConfig,
    pub files: FilesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingConfig {
    pub style: HeadingStyle,
    /// Clamp heading levels into 1..=6.
    pub normalize_levels: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    pub bullet_style: BulletStyle,
    pub number_style: NumberStyle,
    /// Align nested lists with the parent item's content column.
    pub consistent_indentation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    pub fence_style: FenceStyle,
    pub language_detection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitespaceConfig {
    /// Longest allowed run of blank lines; negative disables collapsing.
    pub max_blank_lines: i32,
    pub trim_trailing_spaces: bool,
    pub ensure_final_newline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            heading: HeadingConfig::default(),
            list: ListConfig::default(),
            code: CodeConfig::default(),
            whitespace: WhitespaceConfig::default(),
            files: FilesConfig::default(),
        }
    }
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            style: HeadingStyle::Atx,
            normalize_levels: true,
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            bullet_style: BulletStyle::Dash,
            number_style: NumberStyle::Period,
            consistent_indentation: true,
        }
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            fence_style: FenceStyle::Backtick,
            language_detection: true,
        }
    }
}

impl Default for WhitespaceConfig {
    fn default() -> Self {
        Self {
            max_blank_lines: DEFAULT_MAX_BLANK_LINES,
            trim_trailing_spaces: true,
            ensure_final_newline: true,
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Check the settings serde cannot enforce on its own.
    pub fn validate(&self) -> Result<()> {
        if self.files.extensions.is_empty() {
            return Err(MdfmtError::InvalidConfig(
                "files.extensions must list at least one extension".to_string(),
            ));
        }

        if let Some(ext) = self.files.extensions.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
            return Err(MdfmtError::InvalidConfig(format!(
                "files.extensions entry '{}' must look like '.md'",
                ext
            )));
        }

        if self.files.ignore_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(MdfmtError::InvalidConfig(
                "files.ignore_patterns must not contain empty patterns".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize the configuration as a YAML config file.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
