//! Report statistics

use serde::Serialize;

/// Counts shown in the report footer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub files_scanned: usize,
    /// Sections shown with content, truncated ones included.
    pub included: usize,
    pub truncated: usize,
    pub omitted: usize,
    /// Tree entries and files recorded with an error.
    pub errors: usize,
    /// Sum of the sizes of all selected files.
    pub bytes_scanned: u64,
    /// Length of the final report. Not part of the rendered footer.
    #[serde(skip)]
    pub bytes_emitted: usize,
}

impl ReportStats {
    /// Stats whose every count is at least the final one. A footer rendered
    /// from these is never shorter than the real footer.
    pub fn upper_bound(files: usize, errors: usize, bytes_scanned: u64) -> Self {
        Self {
            files_scanned: files,
            included: files,
            truncated: files,
            omitted: files,
            errors,
            bytes_scanned,
            bytes_emitted: 0,
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "files scanned: {}, included: {} ({} truncated), omitted: {}, errors: {}, total bytes: {}",
            self.files_scanned,
            self.included,
            self.truncated,
            self.omitted,
            self.errors,
            self.bytes_scanned
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_bound_line_is_never_shorter() {
        let bound = ReportStats::upper_bound(12, 3, 4_096);
        for (included, truncated) in [(0, 0), (12, 12), (7, 2), (10, 0)] {
            let actual = ReportStats {
                files_scanned: 12,
                included,
                truncated,
                omitted: 12 - included,
                errors: 3,
                bytes_scanned: 4_096,
                bytes_emitted: 0,
            };
            assert!(actual.summary_line().len() <= bound.summary_line().len());
        }
    }
}
