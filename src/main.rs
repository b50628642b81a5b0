//! CLI entry point for fosum

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use fosum::config::SUMMARY_LINES;
use fosum::{
    Cancellation, FosumError, OmissionPolicy, OutputFormat, SummaryConfig, Summarizer,
    TruncationPolicy, parse_size, parse_timeout,
};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fosum")]
#[command(about = "Summarize a folder into one bounded report for LLM context")]
#[command(version)]
struct Args {
    /// Directory to summarize
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Write the report to PATH instead of stdout
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Global output budget. Use suffixes: K, M, G (e.g., 64K)
    #[arg(short = 'b', long = "max-bytes", value_name = "SIZE", default_value = "100000", value_parser = parse_size)]
    max_bytes: u64,

    /// Per-file cap before truncation
    #[arg(long = "max-file-bytes", value_name = "SIZE", default_value = "20000", value_parser = parse_size)]
    max_file_bytes: u64,

    /// Files larger than this are listed but not read (default: 1MB)
    #[arg(long = "max-file-size", value_name = "SIZE", value_parser = parse_size)]
    max_file_size: Option<u64>,

    /// Ignore entries matching pattern (can be used multiple times)
    #[arg(short = 'I', long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Include entries whose name starts with '.'
    #[arg(short = 'a', long = "include-hidden")]
    include_hidden: bool,

    /// Do not apply .gitignore files or .git/info/exclude
    #[arg(long = "no-gitignore")]
    no_gitignore: bool,

    /// Do not skip version control and dependency directories
    #[arg(long = "no-default-ignores")]
    no_default_ignores: bool,

    /// Only include files with these extensions (comma separated)
    #[arg(long = "ext", value_name = "EXT,...")]
    ext: Vec<String>,

    /// Skip files with these extensions (comma separated)
    #[arg(long = "exclude-ext", value_name = "EXT,...")]
    exclude_ext: Vec<String>,

    /// List matching files but leave their contents out (can be used multiple times)
    #[arg(long = "skip-contents", value_name = "PATTERN")]
    skip_contents: Vec<String>,

    /// Descend only N levels deep
    #[arg(short = 'L', long = "level")]
    level: Option<usize>,

    /// Keep only the first lines of each file
    #[arg(short = 's', long = "summary", conflicts_with = "lines")]
    summary: bool,

    /// Keep at most N lines of each file
    #[arg(long = "lines", value_name = "N")]
    lines: Option<usize>,

    /// Which part of an oversized file to keep
    #[arg(long = "truncate", value_name = "POLICY", default_value = "head")]
    truncate: TruncationPolicy,

    /// What to do with a file that does not fit the remaining budget
    #[arg(long = "omit", value_name = "POLICY", default_value = "whole")]
    omit: OmissionPolicy,

    /// Show the outline and statistics only
    #[arg(short = 't', long = "tree-only")]
    tree_only: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "text")]
    format: OutputFormat,

    /// Number of parallel workers for reading files
    /// (0 = auto-detect, 1 = sequential, N = use N workers)
    #[arg(short = 'j', long = "jobs", default_value = "0")]
    jobs: usize,

    /// Per-file read timeout (e.g., 5s, 500ms; 0 disables)
    #[arg(long = "timeout", value_name = "DURATION", default_value = "5s")]
    timeout: String,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fosum: {:#}", err);
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<FosumError>())
                .map(FosumError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;

    let cancel = Cancellation::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        handler_flag.cancel();
    })
    .context("Failed to set signal handler")?;

    let report = Summarizer::new(config)
        .with_cancellation(cancel.clone())
        .run()?;
    cancel.check()?;

    info!(
        bytes = report.stats.bytes_emitted,
        files = report.stats.files_scanned,
        "writing report"
    );
    write_report(args.output.as_deref(), &report.text)
}

/// Map command-line arguments onto a validated configuration.
fn build_config(args: &Args) -> Result<SummaryConfig, FosumError> {
    let max_bytes = usize::try_from(args.max_bytes)
        .map_err(|_| FosumError::invalid_config("--max-bytes is too large"))?;
    let max_file_bytes = usize::try_from(args.max_file_bytes)
        .map_err(|_| FosumError::invalid_config("--max-file-bytes is too large"))?;
    let read_timeout = parse_timeout(&args.timeout)
        .map_err(|e| FosumError::invalid_config(format!("invalid --timeout '{}': {}", args.timeout, e)))?;

    let defaults = SummaryConfig::default();
    let config = SummaryConfig {
        root: args.root.clone(),
        max_bytes,
        max_file_bytes,
        large_file_threshold: args.max_file_size.unwrap_or(defaults.large_file_threshold),
        max_lines: args.lines.or(args.summary.then_some(SUMMARY_LINES)),
        ignore_patterns: args.ignore.clone(),
        include_hidden: args.include_hidden,
        respect_gitignore: !args.no_gitignore,
        default_ignores: !args.no_default_ignores,
        allow_extensions: args.ext.clone(),
        deny_extensions: args.exclude_ext.clone(),
        skip_contents: args.skip_contents.clone(),
        max_depth: args.level,
        truncation: args.truncate,
        omission: args.omit,
        format: args.format,
        tree_only: args.tree_only,
        parallel_workers: args.jobs,
        read_timeout,
    };
    config.validate()?;
    debug!(?config, "configuration");
    Ok(config)
}

/// Write to stdout, or atomically to `path` so a failed run never leaves a
/// partial file behind.
fn write_report(path: Option<&Path>, text: &str) -> Result<()> {
    let Some(path) = path else {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(text.as_bytes())
            .and_then(|()| stdout.flush())
            .context("cannot write report to stdout")?;
        return Ok(());
    };

    let output_error = |source: io::Error| FosumError::Output {
        path: path.to_path_buf(),
        source,
    };
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut file = NamedTempFile::new_in(parent).map_err(output_error)?;
    file.write_all(text.as_bytes()).map_err(output_error)?;
    file.persist(path).map_err(|e| output_error(e.error))?;
    debug!(path = %path.display(), "report written");
    Ok(())
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("fosum=debug")
        } else {
            EnvFilter::new("fosum=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
