//! Budgeted report assembly
//!
//! The assembler reserves room for the outline, the footer and an omission
//! notice per file, then walks the files in traversal order and upgrades
//! each notice to the file's real section while the budget allows.

mod budget;
mod stats;

pub use budget::Slack;
pub use stats::ReportStats;

use serde::Serialize;
use tracing::{debug, info};

use crate::cancel::Cancellation;
use crate::condense::CondensedContent;
use crate::config::{OmissionPolicy, SummaryConfig};
use crate::error::{FosumError, Result};
use crate::output::{ReportFormat, formatter_for, render_outline};
use crate::tree::FileTree;

/// How a file ended up in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOutcome {
    Included,
    Truncated,
    Omitted,
}

/// One file's section of the report.
#[derive(Debug, Clone)]
pub struct FileSection {
    pub path: String,
    pub outcome: FileOutcome,
    pub rendered: String,
}

/// The finished report.
#[derive(Debug, Clone)]
pub struct SummaryReport {
    pub outline: String,
    pub sections: Vec<FileSection>,
    pub stats: ReportStats,
    pub text: String,
}

/// Fixed parts of a report, sized before any file is decided.
struct Frame {
    outline: String,
    header: String,
    omitted: Vec<String>,
    baseline: usize,
}

/// Combines the outline and condensed files into a report that never
/// exceeds the budget.
pub struct SummaryAssembler {
    budget: usize,
    omission: OmissionPolicy,
    tree_only: bool,
    format: Box<dyn ReportFormat>,
    cancel: Cancellation,
}

impl SummaryAssembler {
    pub fn new(config: &SummaryConfig) -> Self {
        Self {
            budget: config.max_bytes,
            omission: config.omission,
            tree_only: config.tree_only,
            format: formatter_for(config.format),
            cancel: Cancellation::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Smallest budget that can hold the report with every file omitted.
    pub fn minimum_size(&self, tree: &FileTree, contents: &[CondensedContent]) -> usize {
        self.frame(tree, contents).baseline
    }

    /// Build the report. `contents` must be in traversal order.
    pub fn assemble(
        &self,
        tree: &FileTree,
        contents: &[CondensedContent],
    ) -> Result<SummaryReport> {
        let contents = if self.tree_only { &[][..] } else { contents };
        let frame = self.frame(tree, contents);
        let mut slack = Slack::new(self.budget, frame.baseline).ok_or(
            FosumError::BudgetTooSmall {
                budget: self.budget,
                required: frame.baseline,
            },
        )?;
        debug!(
            budget = self.budget,
            baseline = frame.baseline,
            slack = slack.remaining(),
            "budget reserved"
        );

        let mut stats = ReportStats {
            files_scanned: tree.file_count(),
            errors: error_count(tree, contents),
            bytes_scanned: tree.bytes_scanned(),
            ..Default::default()
        };
        let mut text = frame.header;
        let mut sections = Vec::with_capacity(contents.len());

        for (i, (content, omitted)) in contents.iter().zip(&frame.omitted).enumerate() {
            self.cancel.check()?;
            let path = tree.entry(content.entry).rel_path.to_string();
            let (outcome, rendered) =
                self.decide(content, &path, i == 0, omitted, &mut slack);
            debug!(%path, ?outcome, bytes = rendered.len(), "section decided");

            match outcome {
                FileOutcome::Included => stats.included += 1,
                FileOutcome::Truncated => {
                    stats.included += 1;
                    stats.truncated += 1;
                }
                FileOutcome::Omitted => stats.omitted += 1,
            }
            text.push_str(&rendered);
            sections.push(FileSection {
                path,
                outcome,
                rendered,
            });
        }

        text.push_str(&self.format.footer(&stats));
        stats.bytes_emitted = text.len();
        debug_assert!(text.len() <= self.budget);
        info!(
            included = stats.included,
            truncated = stats.truncated,
            omitted = stats.omitted,
            bytes = stats.bytes_emitted,
            "report assembled"
        );

        Ok(SummaryReport {
            outline: frame.outline,
            sections,
            stats,
            text,
        })
    }

    fn frame(&self, tree: &FileTree, contents: &[CondensedContent]) -> Frame {
        let outline = render_outline(tree);
        let header = self.format.header(tree.root_label(), &outline);
        let omitted: Vec<String> = contents
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let path = tree.entry(content.entry).rel_path.to_string();
                self.format.omitted_block(&path, i == 0)
            })
            .collect();

        let bound = ReportStats::upper_bound(
            tree.file_count(),
            error_count(tree, contents),
            tree.bytes_scanned(),
        );
        let baseline = header.len()
            + omitted.iter().map(String::len).sum::<usize>()
            + self.format.footer(&bound).len();

        Frame {
            outline,
            header,
            omitted,
            baseline,
        }
    }

    /// Choose the block for one file and charge it to the slack.
    fn decide(
        &self,
        content: &CondensedContent,
        path: &str,
        first: bool,
        omitted: &str,
        slack: &mut Slack,
    ) -> (FileOutcome, String) {
        let outcome = if content.is_truncated() {
            FileOutcome::Truncated
        } else {
            FileOutcome::Included
        };
        let full = self
            .format
            .file_block(path, outcome, &content.render(path), first);
        if slack.take(full.len(), omitted.len()) {
            return (outcome, full);
        }

        if self.omission == OmissionPolicy::Partial {
            if let Some((outcome, block)) =
                self.refit_block(content, path, first, slack.room(omitted.len()))
            {
                slack.take(block.len(), omitted.len());
                return (outcome, block);
            }
        }

        (FileOutcome::Omitted, omitted.to_string())
    }

    /// Shrink a text body until its block fits in `room` bytes.
    fn refit_block(
        &self,
        content: &CondensedContent,
        path: &str,
        first: bool,
        room: usize,
    ) -> Option<(FileOutcome, String)> {
        let overhead = self
            .format
            .file_block(path, FileOutcome::Truncated, "", first)
            .len();
        let mut limit = room.checked_sub(overhead)?;

        loop {
            let refit = content.refit(limit)?;
            let outcome = if refit.is_truncated() {
                FileOutcome::Truncated
            } else {
                FileOutcome::Included
            };
            let block = self
                .format
                .file_block(path, outcome, &refit.render(path), first);
            if block.len() <= room {
                return Some((outcome, block));
            }
            // Escaping or fencing made the block larger than its body
            limit = limit.checked_sub((block.len() - room).max(1))?;
        }
    }
}

fn error_count(tree: &FileTree, contents: &[CondensedContent]) -> usize {
    tree.error_count() + contents.iter().filter(|c| c.error().is_some()).count()
}
