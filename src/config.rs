//! Configuration for a summary run

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::error::{FosumError, Result};

/// Default global output budget in bytes.
pub const DEFAULT_MAX_BYTES: usize = 100_000;

/// Default per-file cap before truncation.
pub const DEFAULT_MAX_FILE_BYTES: usize = 20_000;

/// Files larger than this are listed but never read (1MB).
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 1_000_000;

/// Smallest per-file cap that still leaves room for the truncation marker.
pub const MIN_FILE_BYTES: usize = 128;

/// Lines kept per file in summary mode.
pub const SUMMARY_LINES: usize = 10;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Which part of an oversized file is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TruncationPolicy {
    /// Keep the beginning of the file
    #[default]
    Head,
    /// Keep the end of the file
    Tail,
    /// Keep both ends, eliding the middle
    Both,
}

/// What happens to a file whose section does not fit the remaining budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OmissionPolicy {
    /// Replace the whole section with an omission notice
    #[default]
    Whole,
    /// Truncate the section to whatever budget is left
    Partial,
}

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    #[default]
    Text,
    /// Markdown with fenced code blocks
    Markdown,
    /// A single JSON document
    Json,
}

/// Configuration for a summary run.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub root: PathBuf,
    /// Global budget for the whole report.
    pub max_bytes: usize,
    /// Per-file cap on condensed content.
    pub max_file_bytes: usize,
    /// Files above this size get a placeholder and are not read.
    pub large_file_threshold: u64,
    /// Keep at most this many lines per file.
    pub max_lines: Option<usize>,
    pub ignore_patterns: Vec<String>,
    pub include_hidden: bool,
    pub respect_gitignore: bool,
    pub default_ignores: bool,
    /// Only include files with these extensions (case-insensitive, no dot).
    pub allow_extensions: Vec<String>,
    pub deny_extensions: Vec<String>,
    /// Files matching these globs are listed with their contents skipped.
    pub skip_contents: Vec<String>,
    pub max_depth: Option<usize>,
    pub truncation: TruncationPolicy,
    pub omission: OmissionPolicy,
    pub format: OutputFormat,
    pub tree_only: bool,
    /// Number of parallel workers for reading files.
    /// 0 = auto-detect (use all available cores)
    /// 1 = sequential (no parallelism)
    /// N = use N worker threads
    pub parallel_workers: usize,
    pub read_timeout: Option<Duration>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            max_bytes: DEFAULT_MAX_BYTES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            max_lines: None,
            ignore_patterns: Vec::new(),
            include_hidden: false,
            respect_gitignore: true,
            default_ignores: true,
            allow_extensions: Vec::new(),
            deny_extensions: Vec::new(),
            skip_contents: Vec::new(),
            max_depth: None,
            truncation: TruncationPolicy::default(),
            omission: OmissionPolicy::default(),
            format: OutputFormat::default(),
            tree_only: false,
            parallel_workers: 0,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }
}

impl SummaryConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Reject values that cannot produce a well-formed report.
    pub fn validate(&self) -> Result<()> {
        if self.max_bytes == 0 {
            return Err(FosumError::invalid_config("--max-bytes must be greater than 0"));
        }
        if self.max_file_bytes < MIN_FILE_BYTES {
            return Err(FosumError::invalid_config(format!(
                "--max-file-bytes must be at least {MIN_FILE_BYTES}"
            )));
        }
        if self.max_lines == Some(0) {
            return Err(FosumError::invalid_config("--lines must be greater than 0"));
        }
        Ok(())
    }
}

/// Parse a size string like "5M", "100K", "1G" into bytes.
/// Supports suffixes: K/KB (1024), M/MB (1024^2), G/GB (1024^3)
/// Without suffix, interprets as bytes.
pub fn parse_size(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_uppercase();
    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}

/// Parse a read timeout such as "5s" or "250ms". "0" disables the timeout.
pub fn parse_timeout(s: &str) -> std::result::Result<Option<Duration>, String> {
    let s = s.trim();
    if s == "0" {
        return Ok(None);
    }
    let duration = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        Ok(None)
    } else {
        Ok(Some(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100"), Ok(100));
        assert_eq!(parse_size("4K"), Ok(4096));
        assert_eq!(parse_size("4kb"), Ok(4096));
        assert_eq!(parse_size("2M"), Ok(2 * 1024 * 1024));
        assert_eq!(parse_size("1G"), Ok(1024 * 1024 * 1024));
        assert_eq!(parse_size(" 12B "), Ok(12));
        assert!(parse_size("lots").is_err());
        assert!(parse_size("-5").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("0"), Ok(None));
        assert_eq!(parse_timeout("0s"), Ok(None));
        assert_eq!(parse_timeout("5s"), Ok(Some(Duration::from_secs(5))));
        assert_eq!(
            parse_timeout("250ms"),
            Ok(Some(Duration::from_millis(250)))
        );
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn test_defaults_validate() {
        let config = SummaryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_bytes, 100_000);
        assert!(!config.include_hidden);
        assert!(config.respect_gitignore);
    }

    #[test]
    fn test_validate_rejects_bad_budgets() {
        let config = SummaryConfig {
            max_bytes: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FosumError::InvalidConfig { .. })
        ));

        let config = SummaryConfig {
            max_file_bytes: MIN_FILE_BYTES - 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SummaryConfig {
            max_lines: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
