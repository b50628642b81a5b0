//! Plain text report format

use crate::summary::{FileOutcome, ReportStats};

use super::ReportFormat;

/// Plain text: the outline, `=== path ===` sections, and a bracketed
/// statistics line.
pub struct TextFormat;

impl ReportFormat for TextFormat {
    fn header(&self, _root_label: &str, outline: &str) -> String {
        format!("{}\n", outline)
    }

    fn file_block(&self, path: &str, _outcome: FileOutcome, body: &str, _first: bool) -> String {
        let mut block = String::with_capacity(path.len() + body.len() + 16);
        block.push_str("=== ");
        block.push_str(path);
        block.push_str(" ===\n");
        block.push_str(body);
        if !body.is_empty() && !body.ends_with('\n') {
            block.push('\n');
        }
        block.push('\n');
        block
    }

    fn footer(&self, stats: &ReportStats) -> String {
        format!("[{}]\n", stats.summary_line())
    }
}
