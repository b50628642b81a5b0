//! Per-file content condensing
//!
//! Every selected file is turned into a [`CondensedContent`]: its text, its
//! text cut down to the per-file cap with a truncation marker, or a one-line
//! placeholder when the contents cannot or should not be shown.

use glob::Pattern;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{SummaryConfig, TruncationPolicy};
use crate::error::{EntryError, Result};
use crate::file_utils::{Loaded, ReadFailure, load_with_timeout};
use crate::tree::{
    DEFAULT_SKIPPED_CONTENTS, EntryId, EntryKind, FileEntry, compile_patterns, format_size,
};

/// What a file's contents turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentClass {
    Text,
    Binary,
    Unreadable,
}

/// Stand-in for contents that are not shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Binary,
    TooLarge,
    Skipped,
    Unreadable(EntryError),
}

/// Bytes and lines dropped at a truncation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elision {
    pub bytes: u64,
    pub lines: usize,
}

impl Elision {
    fn marker(self) -> String {
        format!(
            "[... truncated: {} bytes, {} lines omitted ...]\n",
            self.bytes, self.lines
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Body {
    /// `head` holds the whole text when nothing was elided.
    Text {
        head: String,
        tail: String,
        elided: Option<Elision>,
    },
    Placeholder(Placeholder),
}

/// The condensed form of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondensedContent {
    pub entry: EntryId,
    pub class: ContentClass,
    /// Size of the file as found on disk.
    pub original_size: u64,
    /// Newlines in the full text, the upper bound for elided lines.
    original_newlines: usize,
    policy: TruncationPolicy,
    body: Body,
}

impl CondensedContent {
    fn placeholder(entry: EntryId, size: u64, placeholder: Placeholder) -> Self {
        let class = match placeholder {
            Placeholder::Binary => ContentClass::Binary,
            Placeholder::Unreadable(_) => ContentClass::Unreadable,
            Placeholder::TooLarge | Placeholder::Skipped => ContentClass::Text,
        };
        Self {
            entry,
            class,
            original_size: size,
            original_newlines: 0,
            policy: TruncationPolicy::default(),
            body: Body::Placeholder(placeholder),
        }
    }

    pub fn is_truncated(&self) -> bool {
        matches!(
            self.body,
            Body::Text {
                elided: Some(_),
                ..
            }
        )
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.body, Body::Placeholder(_))
    }

    /// The error recorded for this file, if it could not be read.
    pub fn error(&self) -> Option<&EntryError> {
        match &self.body {
            Body::Placeholder(Placeholder::Unreadable(err)) => Some(err),
            _ => None,
        }
    }

    pub fn elision(&self) -> Option<Elision> {
        match &self.body {
            Body::Text { elided, .. } => *elided,
            Body::Placeholder(_) => None,
        }
    }

    /// Render the body shown under the file's heading. `display_path` is
    /// used by the binary placeholder.
    pub fn render(&self, display_path: &str) -> String {
        match &self.body {
            Body::Text {
                head,
                tail,
                elided: None,
            } => {
                let mut out = head.clone();
                out.push_str(tail);
                out
            }
            Body::Text {
                head,
                tail,
                elided: Some(elision),
            } => {
                let mut out = String::with_capacity(head.len() + tail.len() + 64);
                out.push_str(head);
                if !head.is_empty() && !head.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&elision.marker());
                out.push_str(tail);
                out
            }
            Body::Placeholder(Placeholder::Binary) => {
                format!("[binary] {} ({} bytes)", display_path, self.original_size)
            }
            Body::Placeholder(Placeholder::TooLarge) => {
                format!("[too large: {}]", format_size(self.original_size))
            }
            Body::Placeholder(Placeholder::Skipped) => {
                "[skipped: contents not included]".to_string()
            }
            Body::Placeholder(Placeholder::Unreadable(err)) => format!("[unreadable: {err}]"),
        }
    }

    /// Re-truncate a text body so its rendering is at most `limit` bytes,
    /// keeping the same policy. Returns `None` for placeholders and when the
    /// limit cannot hold the truncation marker.
    pub fn refit(&self, limit: usize) -> Option<Self> {
        let Body::Text { head, tail, elided } = &self.body else {
            return None;
        };
        if self.render("").len() <= limit {
            return Some(self.clone());
        }

        let (head_src, tail_src) = match (elided, self.policy) {
            (Some(_), _) => (head.as_str(), tail.as_str()),
            (None, TruncationPolicy::Head) => (head.as_str(), ""),
            (None, TruncationPolicy::Tail) => ("", head.as_str()),
            (None, TruncationPolicy::Both) => (head.as_str(), head.as_str()),
        };

        let body = fit(
            head_src,
            tail_src,
            self.original_size,
            self.original_newlines,
            limit,
            self.policy,
        )?;
        Some(Self {
            body,
            ..self.clone()
        })
    }
}

/// Condenses files according to the configured caps and policies.
pub struct ContentCondenser {
    max_file_bytes: usize,
    large_file_threshold: u64,
    max_lines: Option<usize>,
    policy: TruncationPolicy,
    read_timeout: Option<std::time::Duration>,
    skip: Vec<Pattern>,
}

impl ContentCondenser {
    pub fn new(config: &SummaryConfig) -> Result<Self> {
        let mut skip = if config.default_ignores {
            compile_patterns(DEFAULT_SKIPPED_CONTENTS)?
        } else {
            Vec::new()
        };
        skip.extend(compile_patterns(&config.skip_contents)?);

        Ok(Self {
            max_file_bytes: config.max_file_bytes,
            large_file_threshold: config.large_file_threshold,
            max_lines: config.max_lines,
            policy: config.truncation,
            read_timeout: config.read_timeout,
            skip,
        })
    }

    /// Condense one file. Failures are recorded in the result, never returned.
    pub fn condense(&self, entry: &FileEntry) -> CondensedContent {
        if crate::tree::matches_any(&self.skip, &entry.rel_path) {
            debug!(path = %entry.rel_path, "contents skipped");
            return CondensedContent::placeholder(entry.id, entry.size, Placeholder::Skipped);
        }

        if entry.size > self.large_file_threshold {
            debug!(path = %entry.rel_path, size = entry.size, "file too large to read");
            return CondensedContent::placeholder(entry.id, entry.size, Placeholder::TooLarge);
        }

        let special = entry.kind == EntryKind::Special;
        if special && self.read_timeout.is_none() {
            // Opening a FIFO with no writer never returns
            warn!(path = %entry.rel_path, "special file not read without a timeout");
            return CondensedContent::placeholder(
                entry.id,
                entry.size,
                Placeholder::Unreadable(EntryError::SpecialFile),
            );
        }

        if entry.size == 0 && !special {
            return self.condense_text(entry.id, String::new());
        }

        match load_with_timeout(&entry.path, self.large_file_threshold, self.read_timeout) {
            Ok(Loaded::Text(text)) => self.condense_text(entry.id, text),
            Ok(Loaded::Binary) => {
                CondensedContent::placeholder(entry.id, entry.size, Placeholder::Binary)
            }
            Err(failure) => {
                let error = match failure {
                    ReadFailure::Timeout => EntryError::Timeout,
                    ReadFailure::Io(err) => EntryError::io(&err),
                };
                warn!(path = %entry.rel_path, %error, "cannot read file");
                CondensedContent::placeholder(
                    entry.id,
                    entry.size,
                    Placeholder::Unreadable(error),
                )
            }
        }
    }

    /// Apply the caps to text that has already been read.
    pub fn condense_text(&self, entry: EntryId, text: String) -> CondensedContent {
        let original_size = text.len() as u64;
        let original_newlines = count_newlines(&text);
        let over_lines = self
            .max_lines
            .is_some_and(|max| line_count(&text) > max);

        let body = if text.len() <= self.max_file_bytes && !over_lines {
            None
        } else {
            let (head_src, tail_src) = match self.max_lines.filter(|_| over_lines) {
                Some(max) => line_window(&text, max, self.policy),
                None => full_window(&text, self.policy),
            };
            fit(
                head_src,
                tail_src,
                original_size,
                original_newlines,
                self.max_file_bytes,
                self.policy,
            )
        };

        let body = body.unwrap_or(Body::Text {
            head: text,
            tail: String::new(),
            elided: None,
        });

        CondensedContent {
            entry,
            class: ContentClass::Text,
            original_size,
            original_newlines,
            policy: self.policy,
            body,
        }
    }
}

/// Sources for a byte-only cut.
fn full_window(text: &str, policy: TruncationPolicy) -> (&str, &str) {
    match policy {
        TruncationPolicy::Head => (text, ""),
        TruncationPolicy::Tail => ("", text),
        TruncationPolicy::Both => (text, text),
    }
}

/// Sources limited to `max` lines, split between the ends for `Both`.
fn line_window(text: &str, max: usize, policy: TruncationPolicy) -> (&str, &str) {
    match policy {
        TruncationPolicy::Head => (first_lines(text, max), ""),
        TruncationPolicy::Tail => ("", last_lines(text, max)),
        TruncationPolicy::Both => {
            let tail = max / 2;
            (first_lines(text, max - tail), last_lines(text, tail))
        }
    }
}

/// Keep as much of the sources as fits in `limit` bytes together with the
/// marker. The marker is sized for the whole file, so the real one is never
/// longer than the space reserved for it.
fn fit(
    head_src: &str,
    tail_src: &str,
    original_size: u64,
    original_newlines: usize,
    limit: usize,
    policy: TruncationPolicy,
) -> Option<Body> {
    let worst = Elision {
        bytes: original_size,
        lines: original_newlines,
    };
    // One extra byte for the newline before a marker that follows a partial line
    let reserve = worst.marker().len() + 1;
    let avail = limit.checked_sub(reserve)?;

    let (head_budget, tail_budget) = match policy {
        TruncationPolicy::Head => (avail, 0),
        TruncationPolicy::Tail => (0, avail),
        TruncationPolicy::Both => (avail - avail / 2, avail / 2),
    };

    let head = cut_head(head_src, head_budget);
    let tail = cut_tail(tail_src, tail_budget);
    let kept_bytes = (head.len() + tail.len()) as u64;
    let kept_lines = count_newlines(head) + count_newlines(tail);

    Some(Body::Text {
        head: head.to_string(),
        tail: tail.to_string(),
        elided: Some(Elision {
            bytes: original_size.saturating_sub(kept_bytes),
            lines: original_newlines.saturating_sub(kept_lines),
        }),
    })
}

/// Longest prefix of at most `max` bytes, cut back to the last whole line
/// when the prefix contains one.
fn cut_head(src: &str, max: usize) -> &str {
    if src.len() <= max {
        return src;
    }
    let mut end = max;
    while !src.is_char_boundary(end) {
        end -= 1;
    }
    if let Some(pos) = src[..end].rfind('\n') {
        end = pos + 1;
    }
    &src[..end]
}

/// Longest suffix of at most `max` bytes, moved forward to the start of the
/// next whole line when one follows.
fn cut_tail(src: &str, max: usize) -> &str {
    if src.len() <= max {
        return src;
    }
    let mut start = src.len() - max;
    while !src.is_char_boundary(start) {
        start += 1;
    }
    if src.as_bytes()[start - 1] != b'\n' {
        if let Some(pos) = src[start..].find('\n') {
            if start + pos + 1 < src.len() {
                start += pos + 1;
            }
        }
    }
    &src[start..]
}

fn first_lines(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.match_indices('\n').nth(n - 1) {
        Some((pos, _)) => &text[..=pos],
        None => text,
    }
}

fn last_lines(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    match body.rmatch_indices('\n').nth(n - 1) {
        Some((pos, _)) => &text[pos + 1..],
        None => text,
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

fn line_count(text: &str) -> usize {
    let newlines = count_newlines(text);
    if text.is_empty() || text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}
