//! JSON report format
//!
//! The report is a single object with the outline, a `files` array and the
//! statistics. Each file object sits on its own line so the document can
//! be assembled piece by piece.

use serde::Serialize;

use crate::summary::{FileOutcome, ReportStats};

use super::ReportFormat;

pub struct JsonFormat;

#[derive(Serialize)]
struct JsonSection<'a> {
    path: &'a str,
    status: FileOutcome,
    content: &'a str,
}

impl ReportFormat for JsonFormat {
    fn header(&self, root_label: &str, outline: &str) -> String {
        format!(
            "{{\n  \"root\": {},\n  \"outline\": {},\n  \"files\": [\n",
            json_string(root_label),
            json_string(outline)
        )
    }

    fn file_block(&self, path: &str, outcome: FileOutcome, body: &str, first: bool) -> String {
        let section = JsonSection {
            path,
            status: outcome,
            content: body,
        };
        // Serializing borrowed strings cannot fail
        let object = serde_json::to_string(&section).unwrap_or_default();
        if first {
            format!("    {}", object)
        } else {
            format!(",\n    {}", object)
        }
    }

    fn footer(&self, stats: &ReportStats) -> String {
        let stats = serde_json::to_value(stats).unwrap_or_default();
        format!("\n  ],\n  \"stats\": {}\n}}\n", stats)
    }
}

fn json_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}
