//! Report formatting
//!
//! This module provides the formats a summary report can be written in:
//! - Plain text with `=== path ===` section headings
//! - Markdown with fenced code blocks
//! - A single JSON document
//!
//! # Module Structure
//!
//! - `outline` - Box-drawing outline of the directory tree
//! - `text` - Plain text format
//! - `markdown` - Markdown format
//! - `json` - JSON format
//!
//! Every format renders the report as independent pieces (header, one block
//! per file, footer) whose concatenation is the report. The assembler sizes
//! each piece exactly, so the budget holds for every format.

mod json;
mod markdown;
mod outline;
mod text;

pub use json::JsonFormat;
pub use markdown::MarkdownFormat;
pub use outline::render_outline;
pub use text::TextFormat;

use crate::config::OutputFormat;
use crate::summary::{FileOutcome, ReportStats};

/// Notice shown in place of a file that did not fit the budget.
pub const OMITTED_NOTICE: &str = "[omitted: over budget]";

/// One report format. Pieces are concatenated in order: header, file
/// blocks in traversal order, footer.
pub trait ReportFormat: Send + Sync {
    /// Everything before the first file block.
    fn header(&self, root_label: &str, outline: &str) -> String;

    /// A file section. `first` is true for the first block of the report.
    fn file_block(&self, path: &str, outcome: FileOutcome, body: &str, first: bool) -> String;

    /// The block used for a file that did not fit the budget.
    fn omitted_block(&self, path: &str, first: bool) -> String {
        self.file_block(path, FileOutcome::Omitted, OMITTED_NOTICE, first)
    }

    /// Everything after the last file block.
    fn footer(&self, stats: &ReportStats) -> String;
}

/// Pick the formatter for `format`.
pub fn formatter_for(format: OutputFormat) -> Box<dyn ReportFormat> {
    match format {
        OutputFormat::Text => Box::new(TextFormat),
        OutputFormat::Markdown => Box::new(MarkdownFormat),
        OutputFormat::Json => Box::new(JsonFormat),
    }
}
