//! Fosum - Summarize a folder into one bounded report for LLM context

pub mod cancel;
pub mod condense;
pub mod config;
pub mod error;
pub mod file_utils;
pub mod output;
pub mod summarize;
pub mod summary;
pub mod tree;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cancel::Cancellation;
pub use condense::{CondensedContent, ContentClass, ContentCondenser, Elision, Placeholder};
pub use config::{
    OmissionPolicy, OutputFormat, SummaryConfig, TruncationPolicy, parse_size, parse_timeout,
};
pub use error::{EntryError, FosumError, Result};
pub use output::{ReportFormat, formatter_for, render_outline};
pub use summarize::Summarizer;
pub use summary::{FileOutcome, FileSection, ReportStats, SummaryAssembler, SummaryReport};
pub use tree::{FileEntry, FileTree, PathFilter, RelPath, TreeWalker};
