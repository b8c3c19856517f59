/// Rule priorities. Higher runs first; the first claiming rule wins.
pub const HEADING_RULE_PRIORITY: i32 = 100;
pub const PARAGRAPH_RULE_PRIORITY: i32 = 90;
pub const LIST_RULE_PRIORITY: i32 = 80;
pub const CODE_RULE_PRIORITY: i32 = 70;
pub const INLINE_RULE_PRIORITY: i32 = 60;
pub const WHITESPACE_RULE_PRIORITY: i32 = 10;

pub const MIN_HEADING_LEVEL: u8 = 1;
pub const MAX_HEADING_LEVEL: u8 = 6;
/// Setext underlines only exist for levels 1 and 2.
pub const SETEXT_MAX_LEVEL: u8 = 2;
pub const MIN_SETEXT_UNDERLINE: usize = 3;

pub const DEFAULT_LINE_WIDTH: usize = 80;
pub const DEFAULT_MAX_BLANK_LINES: i32 = 2;

pub const DEFAULT_EXTENSIONS: &[&str] = &[".md", ".markdown", ".mdown"];
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &["node_modules/**", ".git/**", "vendor/**"];

/// Config file names searched in each directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".mdfmt.yaml",
    ".mdfmt.yml",
    ".mdfmt.json",
    ".mdfmt.toml",
    "mdfmt.yaml",
    "mdfmt.yml",
    "mdfmt.json",
    "mdfmt.toml",
];

/// Upper bound on files formatted concurrently.
pub const MAX_WORKERS: usize = 8;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_CHANGES_NEEDED: u8 = 1;
pub const EXIT_ERROR: u8 = 2;

/// Suffix appended to a file name by `--backup`.
pub const BACKUP_SUFFIX: &str = ".backup";

/// Serialization format of a config file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Map a config file extension (without the dot) to its format.
pub fn config_format_for_extension(ext: &str) -> Option<ConfigFormat> {
    match ext.to_ascii_lowercase().as_str() {
        "yaml" | "yml" => Some(ConfigFormat::Yaml),
        "json" => Some(ConfigFormat::Json),
        "toml" => Some(ConfigFormat::Toml),
        _ => None,
    }
}
