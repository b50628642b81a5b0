//! Markdown report format
//!
//! The outline goes in a plain fenced block and every file in a fenced block
//! tagged with its extension, suitable as LLM context.

use crate::summary::{FileOutcome, ReportStats};

use super::ReportFormat;

/// Markdown output with one `##` heading per file.
pub struct MarkdownFormat;

impl ReportFormat for MarkdownFormat {
    fn header(&self, root_label: &str, outline: &str) -> String {
        let fence = fence_for(outline);
        format!("# {}\n\n{}\n{}{}\n\n", root_label, fence, outline, fence)
    }

    fn file_block(&self, path: &str, outcome: FileOutcome, body: &str, _first: bool) -> String {
        let fence = fence_for(body);
        let mut block = String::with_capacity(path.len() + body.len() + 32);
        block.push_str("## `");
        block.push_str(path);
        block.push('`');
        if outcome == FileOutcome::Truncated {
            block.push_str(" (truncated)");
        }
        block.push_str("\n\n");

        block.push_str(&fence);
        if outcome != FileOutcome::Omitted {
            block.push_str(language_hint(path));
        }
        block.push('\n');
        block.push_str(body);
        if !body.is_empty() && !body.ends_with('\n') {
            block.push('\n');
        }
        block.push_str(&fence);
        block.push_str("\n\n");
        block
    }

    fn footer(&self, stats: &ReportStats) -> String {
        format!("---\n\n*{}*\n", stats.summary_line())
    }
}

/// A backtick fence longer than any backtick run in `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Info string for the code fence, taken from the file extension.
fn language_hint(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            ext
        }
        _ => "",
    }
}
