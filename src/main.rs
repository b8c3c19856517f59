use clap::{ArgGroup, Parser};
use mdfmt_rs::constants::{EXIT_CHANGES_NEEDED, EXIT_ERROR, EXIT_SUCCESS};
use mdfmt_rs::error::Result;
use mdfmt_rs::loader::load_config;
use mdfmt_rs::processor::{FileOutcome, FileProcessor, Mode, ProcessOptions, ProcessingResult};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mdfmt", version)]
#[command(about = "Format Markdown files with consistent, diff-friendly style")]
#[command(group(ArgGroup::new("mode").args(["write", "check", "list", "diff"])))]
struct Cli {
    /// Files or directories to format
    #[arg(required_unless_present = "print_config")]
    paths: Vec<PathBuf>,

    /// Write the result back to the source files
    #[arg(short, long)]
    write: bool,

    /// Exit with status 1 if any file needs formatting
    #[arg(short, long)]
    check: bool,

    /// List files whose formatting differs
    #[arg(short, long)]
    list: bool,

    /// Show a diff of the changes instead of writing them
    #[arg(short, long)]
    diff: bool,

    /// Config file (YAML, JSON or TOML); searched upwards from the current directory otherwise
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep a `.backup` copy of every file rewritten by --write
    #[arg(long)]
    backup: bool,

    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.write {
            Mode::Write
        } else if self.check {
            Mode::Check
        } else if self.list {
            Mode::List
        } else if self.diff {
            Mode::Diff
        } else {
            Mode::Stdout
        }
    }
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let working_dir = std::env::current_dir()?;
    let config = load_config(cli.config.as_deref(), &working_dir)?;

    if cli.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(EXIT_SUCCESS);
    }

    let processor = FileProcessor::new(config)?;
    let files = processor.find_files(&cli.paths)?;
    if files.is_empty() {
        warn!("no markdown files found");
        return Ok(EXIT_SUCCESS);
    }

    let mode = cli.mode();
    debug!(count = files.len(), ?mode, "processing files");

    let options = ProcessOptions {
        mode,
        backup: cli.backup,
    };
    let results = processor.process_files(files, options).await;

    Ok(report(&results, mode, cli.quiet))
}

/// Print per-file output for `mode` and pick the exit status.
fn report(results: &[ProcessingResult], mode: Mode, quiet: bool) -> u8 {
    let mut failed = 0;
    let mut needs_formatting = 0;

    for result in results {
        let path = &result.file.path;
        let outcome = match &result.outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                failed += 1;
                eprintln!("Error: {}: {}", path.display(), e);
                continue;
            }
        };

        match mode {
            Mode::Stdout => print!("{}", outcome.formatted),
            Mode::Write if outcome.changed && !quiet => println!("Formatted: {}", path.display()),
            Mode::Write => {}
            Mode::Check if outcome.changed => {
                needs_formatting += 1;
                if !quiet {
                    println!("would reformat {}", path.display());
                }
            }
            Mode::Check => {}
            Mode::List if outcome.changed => println!("{}", path.display()),
            Mode::List => {}
            Mode::Diff if outcome.changed => print_diff(path, outcome),
            Mode::Diff => {}
        }
    }

    if failed > 0 {
        EXIT_ERROR
    } else if mode == Mode::Check && needs_formatting > 0 {
        EXIT_CHANGES_NEEDED
    } else {
        EXIT_SUCCESS
    }
}

fn print_diff(path: &Path, outcome: &FileOutcome) {
    println!("--- {}", path.display());
    println!("+++ {}", path.display());

    let diff = TextDiff::from_lines(&outcome.original, &outcome.formatted);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        print!("{}{}", sign, change);
        if change.missing_newline() {
            println!();
        }
    }
}
