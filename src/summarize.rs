//! Summarizer - walk, condense in parallel, assemble
//!
//! Files are condensed on a rayon pool. Workers finish in any order, so each
//! result is tagged with its traversal index and the collected results are
//! put back in order before the budget fold, which depends on it.

use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cancel::Cancellation;
use crate::condense::{CondensedContent, ContentCondenser};
use crate::config::SummaryConfig;
use crate::error::Result;
use crate::summary::{SummaryAssembler, SummaryReport};
use crate::tree::{FileEntry, FileTree, PathFilter, TreeWalker};

/// Runs the whole pipeline for one configuration.
pub struct Summarizer {
    config: SummaryConfig,
    cancel: Cancellation,
}

impl Summarizer {
    pub fn new(config: SummaryConfig) -> Self {
        Self {
            config,
            cancel: Cancellation::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Produce the report. Configuration is checked before anything is read.
    pub fn run(&self) -> Result<SummaryReport> {
        self.config.validate()?;
        let root = self.config.root.as_path();

        let filter = PathFilter::new(&self.config, root)?;
        let condenser = ContentCondenser::new(&self.config)?;

        let tree = TreeWalker::new(&filter)
            .with_max_depth(self.config.max_depth)
            .with_cancellation(self.cancel.clone())
            .walk(root)?;
        info!(
            files = tree.file_count(),
            dirs = tree.dir_count(),
            bytes = tree.bytes_scanned(),
            "walk complete"
        );

        let contents = if self.config.tree_only {
            Vec::new()
        } else {
            self.condense_all(&tree, &condenser)?
        };

        SummaryAssembler::new(&self.config)
            .with_cancellation(self.cancel.clone())
            .assemble(&tree, &contents)
    }

    /// Condense every file, returning results in traversal order.
    fn condense_all(
        &self,
        tree: &FileTree,
        condenser: &ContentCondenser,
    ) -> Result<Vec<CondensedContent>> {
        let entries = tree.entries();
        let collected: Mutex<Vec<(usize, CondensedContent)>> =
            Mutex::new(Vec::with_capacity(entries.len()));
        let cancel = &self.cancel;

        let work = |entry: &FileEntry| {
            if cancel.is_cancelled() {
                return;
            }
            let content = condenser.condense(entry);
            collected
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((entry.id.index(), content));
        };

        match self.config.parallel_workers {
            1 => entries.iter().for_each(work),
            0 => entries.par_iter().for_each(work),
            workers => match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => pool.install(|| entries.par_iter().for_each(work)),
                Err(err) => {
                    // Fall back to rayon's global pool if custom pool creation fails
                    warn!(error = %err, workers, "cannot build worker pool");
                    entries.par_iter().for_each(work);
                }
            },
        }
        self.cancel.check()?;

        let mut results = collected.into_inner().unwrap_or_else(PoisonError::into_inner);
        results.sort_by_key(|(index, _)| *index);
        debug!(files = results.len(), "contents condensed");

        Ok(results.into_iter().map(|(_, content)| content).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::error::FosumError;
    use crate::test_utils::TestTree;

    fn many_files() -> TestTree {
        let fixture = TestTree::new();
        for i in 0..40 {
            fixture.add_file(
                &format!("dir{}/file{:02}.txt", i % 4, i),
                &format!("contents of file {i}\n").repeat(i + 1),
            );
        }
        fixture
    }

    #[test]
    fn test_worker_counts_produce_identical_reports() {
        let fixture = many_files();
        let reports: Vec<String> = [0, 1, 3]
            .into_iter()
            .map(|workers| {
                let config = SummaryConfig {
                    parallel_workers: workers,
                    max_bytes: 4_000,
                    ..SummaryConfig::new(fixture.path())
                };
                Summarizer::new(config).run().unwrap().text
            })
            .collect();

        assert_eq!(reports[0], reports[1]);
        assert_eq!(reports[1], reports[2]);
    }

    #[test]
    fn test_sections_follow_traversal_order() {
        let fixture = many_files();
        let report = Summarizer::new(SummaryConfig::new(fixture.path()))
            .run()
            .unwrap();

        let paths: Vec<&str> = report.sections.iter().map(|s| s.path.as_str()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert_eq!(paths.len(), 40);
    }

    #[test]
    fn test_invalid_config_fails_before_walk() {
        let config = SummaryConfig {
            max_bytes: 0,
            ..SummaryConfig::new("/definitely/not/here")
        };
        let err = Summarizer::new(config).run().unwrap_err();
        assert!(matches!(err, FosumError::InvalidConfig { .. }));
    }

    #[test]
    fn test_missing_root() {
        let err = Summarizer::new(SummaryConfig::new("/definitely/not/here"))
            .run()
            .unwrap_err();
        assert!(matches!(err, FosumError::RootNotFound { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_cancelled_before_start() {
        let fixture = many_files();
        let cancel = Cancellation::new();
        cancel.cancel();

        let result = Summarizer::new(SummaryConfig::new(fixture.path()))
            .with_cancellation(cancel)
            .run();
        assert!(matches!(result, Err(FosumError::Cancelled)));
    }

    #[test]
    fn test_markdown_run() {
        let fixture = TestTree::new();
        fixture.add_file("src/main.rs", "fn main() {}\n");

        let config = SummaryConfig {
            format: OutputFormat::Markdown,
            ..SummaryConfig::new(fixture.path())
        };
        let report = Summarizer::new(config).run().unwrap();
        assert!(report.text.contains("## `src/main.rs`\n\n```rs\nfn main() {}\n```\n"));
    }
}
