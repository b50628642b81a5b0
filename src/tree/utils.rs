//! Shared utility functions for tree walking

use glob::Pattern;

use crate::error::{FosumError, Result};

use super::node::RelPath;

/// Entry names skipped unless default ignores are disabled:
/// version control metadata and dependency/tooling directories.
pub const DEFAULT_IGNORED_NAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    "bower_components",
];

/// Files whose contents are skipped by default (lock files).
pub const DEFAULT_SKIPPED_CONTENTS: &[&str] = &[
    "Cargo.lock",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Gemfile.lock",
    "composer.lock",
];

/// Compile glob patterns, rejecting invalid ones.
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref();
            Pattern::new(p).map_err(|e| FosumError::InvalidPattern {
                pattern: p.to_string(),
                message: e.msg.to_string(),
            })
        })
        .collect()
}

/// True if any pattern matches the entry name or its `/`-joined relative path.
pub fn matches_any(patterns: &[Pattern], rel_path: &RelPath) -> bool {
    let name = rel_path.name().unwrap_or_default();
    let full = rel_path.to_string();
    patterns
        .iter()
        .any(|p| p.as_str() == name || p.matches(name) || p.matches(&full))
}

/// Lowercased extension of the last path segment, without the dot.
pub fn extension_of(rel_path: &RelPath) -> Option<String> {
    let name = rel_path.name()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Normalize user-supplied extensions: lowercase, no leading dot, comma lists split.
pub fn normalize_extensions(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|s| s.split(','))
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Format a size in bytes to human-readable format.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1}G", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}K", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}
