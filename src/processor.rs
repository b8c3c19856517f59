//! File discovery and concurrent batch formatting.

use crate::constants::{BACKUP_SUFFIX, MAX_WORKERS};
use crate::error::{MdfmtError, Result};
use crate::formatter::format_and_render;
use crate::models::Config;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

// ============================================================================
// Ignore Patterns
// ============================================================================

#[derive(Debug)]
enum IgnoreRule {
    /// `dir/**`: the directory and everything below it.
    Directory(Vec<String>),
    /// Wildcard pattern matched against the file name.
    Glob(Regex),
    /// Exact path or file name.
    Exact(String),
}

#[derive(Debug)]
pub struct IgnoreMatcher {
    rules: Vec<IgnoreRule>,
}

impl IgnoreMatcher {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|pattern| {
                if let Some(dir) = pattern.strip_suffix("/**") {
                    Ok(IgnoreRule::Directory(
                        dir.split('/').filter(|c| !c.is_empty()).map(str::to_string).collect(),
                    ))
                } else if pattern.contains(['*', '?']) {
                    glob_to_regex(pattern).map(IgnoreRule::Glob)
                } else {
                    Ok(IgnoreRule::Exact(pattern.clone()))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let components: Vec<&str> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

        self.rules.iter().any(|rule| match rule {
            IgnoreRule::Directory(dir) => {
                !dir.is_empty()
                    && components
                        .windows(dir.len())
                        .any(|window| window.iter().zip(dir).all(|(a, b)| *a == b.as_str()))
            }
            IgnoreRule::Glob(re) => re.is_match(file_name),
            IgnoreRule::Exact(exact) => path == Path::new(exact) || file_name == exact,
        })
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str("[^/]*"),
            '?' => expr.push_str("[^/]"),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| MdfmtError::InvalidConfig(format!("bad ignore pattern '{}': {}", pattern, e)))
}

// ============================================================================
// Processing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
}

/// What to do with each formatted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Print formatted content.
    #[default]
    Stdout,
    Write,
    Check,
    List,
    Diff,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    pub mode: Mode,
    /// Copy the original to `<file>.backup` before overwriting it.
    pub backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub original: String,
    pub formatted: String,
    pub changed: bool,
}

#[derive(Debug)]
pub struct ProcessingResult {
    pub file: FileInfo,
    pub outcome: Result<FileOutcome>,
}

impl ProcessingResult {
    pub fn changed(&self) -> bool {
        matches!(&self.outcome, Ok(outcome) if outcome.changed)
    }
}

pub struct FileProcessor {
    config: Arc<Config>,
    ignore: IgnoreMatcher,
}

impl FileProcessor {
    pub fn new(config: Config) -> Result<Self> {
        let ignore = IgnoreMatcher::new(&config.files.ignore_patterns)?;
        Ok(Self {
            config: Arc::new(config),
            ignore,
        })
    }

    fn is_markdown(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = format!(".{}", ext.to_lowercase());
        self.config
            .files
            .extensions
            .iter()
            .any(|allowed| allowed.to_lowercase() == ext)
    }

    /// Collect markdown files under `paths`, in discovery order, without duplicates.
    pub fn find_files(&self, paths: &[PathBuf]) -> Result<Vec<FileInfo>> {
        let mut files = Vec::new();
        let mut seen = HashSet::new();

        for path in paths {
            if !path.exists() {
                return Err(MdfmtError::MissingPath(path.clone()));
            }

            if path.is_file() {
                if self.is_markdown(path) && !self.ignore.is_ignored(path) {
                    self.push_file(path, &mut files, &mut seen)?;
                }
                continue;
            }

            let walker = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !self.ignore.is_ignored(entry.path()));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "skipping unreadable path");
                        continue;
                    }
                };
                if entry.file_type().is_file() && self.is_markdown(entry.path()) {
                    self.push_file(entry.path(), &mut files, &mut seen)?;
                }
            }
        }

        debug!(count = files.len(), "discovered markdown files");
        Ok(files)
    }

    fn push_file(&self, path: &Path, files: &mut Vec<FileInfo>, seen: &mut HashSet<PathBuf>) -> Result<()> {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if seen.insert(canonical) {
            files.push(FileInfo {
                path: path.to_path_buf(),
                size: std::fs::metadata(path)?.len(),
            });
        }
        Ok(())
    }

    /// Format `files` concurrently. Results come back in input order and a
    /// failing file does not stop the others.
    pub async fn process_files(&self, files: Vec<FileInfo>, options: ProcessOptions) -> Vec<ProcessingResult> {
        let semaphore = Arc::new(Semaphore::new(MAX_WORKERS));

        let tasks: Vec<_> = files
            .iter()
            .map(|file| {
                let semaphore = Arc::clone(&semaphore);
                let config = Arc::clone(&self.config);
                let path = file.path.clone();

                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| MdfmtError::Task(e.to_string()))?;
                    process_file(&path, config, options).await
                })
            })
            .collect();

        let joined = futures::future::join_all(tasks).await;

        files
            .into_iter()
            .zip(joined)
            .map(|(file, joined)| {
                let outcome = joined.map_err(|e| MdfmtError::Task(e.to_string())).and_then(|r| r);
                if let Err(e) = &outcome {
                    warn!(path = %file.path.display(), error = %e, "failed to process file");
                }
                ProcessingResult { file, outcome }
            })
            .collect()
    }
}

async fn process_file(path: &Path, config: Arc<Config>, options: ProcessOptions) -> Result<FileOutcome> {
    debug!(path = %path.display(), "reading file");
    let raw = fs::read(path).await?;

    let (raw, formatted) = tokio::task::spawn_blocking(move || {
        let formatted = format_and_render(&raw, &config);
        (raw, formatted)
    })
    .await
    .map_err(|e| MdfmtError::Task(e.to_string()))?;
    let formatted = formatted?;

    let original = String::from_utf8_lossy(&raw).into_owned();
    let changed = original != formatted;

    if changed && options.mode == Mode::Write {
        if options.backup {
            let mut backup = path.as_os_str().to_owned();
            backup.push(BACKUP_SUFFIX);
            fs::write(&backup, &raw).await?;
        }
        fs::write(path, &formatted).await?;
        info!(path = %path.display(), "formatted");
    }

    Ok(FileOutcome {
        original,
        formatted,
        changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as sync_fs;
    use tempfile::TempDir;

    fn matcher(patterns: &[&str]) -> IgnoreMatcher {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        IgnoreMatcher::new(&patterns).unwrap()
    }

    #[test]
    fn test_directory_patterns_match_any_depth() {
        let m = matcher(&["node_modules/**", "docs/build/**"]);
        assert!(m.is_ignored(Path::new("node_modules")));
        assert!(m.is_ignored(Path::new("/proj/node_modules/pkg/README.md")));
        assert!(m.is_ignored(Path::new("docs/build/out.md")));
        assert!(!m.is_ignored(Path::new("docs/guide.md")));
        assert!(!m.is_ignored(Path::new("my_node_modules/a.md")));
    }

    #[test]
    fn test_glob_patterns_match_file_name() {
        let m = matcher(&["*.draft.md", "CHANGELOG?.md"]);
        assert!(m.is_ignored(Path::new("a/b/notes.draft.md")));
        assert!(m.is_ignored(Path::new("CHANGELOG2.md")));
        assert!(!m.is_ignored(Path::new("notes.md")));
        assert!(!m.is_ignored(Path::new("CHANGELOG.md")));
    }

    #[test]
    fn test_exact_patterns() {
        let m = matcher(&["README.md", "docs/skip.md"]);
        assert!(m.is_ignored(Path::new("sub/README.md")));
        assert!(m.is_ignored(Path::new("docs/skip.md")));
        assert!(!m.is_ignored(Path::new("docs/keep.md")));
    }

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            sync_fs::create_dir_all(parent).unwrap();
        }
        sync_fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_find_files_filters_and_dedups() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.md", "# a\n");
        write(dir.path(), "b.MARKDOWN", "# b\n");
        write(dir.path(), "c.txt", "c\n");
        write(dir.path(), "node_modules/dep/d.md", "# d\n");
        write(dir.path(), "sub/e.mdown", "# e\n");

        let processor = FileProcessor::new(Config::default()).unwrap();
        let files = processor
            .find_files(&[dir.path().to_path_buf(), a.clone()])
            .unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.md", "b.MARKDOWN", "e.mdown"]);
        assert_eq!(files[0].size, 4);
    }

    #[test]
    fn test_find_files_missing_path() {
        let processor = FileProcessor::new(Config::default()).unwrap();
        let err = processor
            .find_files(&[PathBuf::from("/definitely/not/here.md")])
            .unwrap_err();
        assert!(matches!(err, MdfmtError::MissingPath(_)));
    }

    #[tokio::test]
    async fn test_process_files_check_mode_leaves_files() {
        let dir = TempDir::new().unwrap();
        let clean = write(dir.path(), "clean.md", "# Title\n");
        let dirty = write(dir.path(), "dirty.md", "#   Title\n\n\n\n\ntext   here");

        let processor = FileProcessor::new(Config::default()).unwrap();
        let files = processor.find_files(&[dir.path().to_path_buf()]).unwrap();
        let options = ProcessOptions {
            mode: Mode::Check,
            backup: false,
        };
        let results = processor.process_files(files, options).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].file.path, clean);
        assert!(!results[0].changed());
        assert_eq!(results[1].file.path, dirty);
        assert!(results[1].changed());
        assert_eq!(
            sync_fs::read_to_string(&dirty).unwrap(),
            "#   Title\n\n\n\n\ntext   here"
        );
    }

    #[tokio::test]
    async fn test_process_files_write_with_backup() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "doc.md", "* a\n* b");

        let processor = FileProcessor::new(Config::default()).unwrap();
        let files = processor.find_files(&[path.clone()]).unwrap();
        let options = ProcessOptions {
            mode: Mode::Write,
            backup: true,
        };
        let results = processor.process_files(files, options).await;

        assert!(results[0].changed());
        assert_eq!(sync_fs::read_to_string(&path).unwrap(), "- a\n- b\n");
        assert_eq!(
            sync_fs::read_to_string(dir.path().join("doc.md.backup")).unwrap(),
            "* a\n* b"
        );
    }

    #[tokio::test]
    async fn test_failed_file_does_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.md");
        sync_fs::write(&bad, [0xffu8, 0xfe]).unwrap();
        let good = write(dir.path(), "good.md", "text\n");

        let processor = FileProcessor::new(Config::default()).unwrap();
        let files = processor.find_files(&[bad, good]).unwrap();
        let results = processor.process_files(files, ProcessOptions::default()).await;

        assert!(matches!(results[0].outcome, Err(MdfmtError::Parse(_))));
        assert!(results[1].outcome.is_ok());
        assert!(!results[1].changed());
    }

    #[tokio::test]
    async fn test_many_files_keep_order() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<_> = (0..20)
            .map(|i| write(dir.path(), &format!("f{:02}.md", i), &format!("# {}\n", i)))
            .collect();

        let processor = FileProcessor::new(Config::default()).unwrap();
        let files = processor.find_files(&paths).unwrap();
        let results = processor.process_files(files, ProcessOptions::default()).await;

        let got: Vec<_> = results.iter().map(|r| r.file.path.clone()).collect();
        assert_eq!(got, paths);
    }
}
