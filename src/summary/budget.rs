//! Slack accounting for the budget fold
//!
//! Every file starts out reserved at the size of its omitted block. Showing a
//! file costs the difference between its real block and that reservation,
//! paid from the slack left over once everything has been reserved.

/// Remaining slack, threaded through the fold in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slack(usize);

impl Slack {
    /// Slack left after reserving `baseline` bytes, or `None` if the
    /// baseline alone exceeds the budget.
    pub fn new(budget: usize, baseline: usize) -> Option<Self> {
        budget.checked_sub(baseline).map(Self)
    }

    pub fn remaining(self) -> usize {
        self.0
    }

    /// Largest block that can replace an omitted block of `omitted` bytes.
    pub fn room(self, omitted: usize) -> usize {
        omitted.saturating_add(self.0)
    }

    /// Spend what a block of `full` bytes costs over its reservation.
    /// Returns false, leaving the slack untouched, when it does not fit.
    pub fn take(&mut self, full: usize, omitted: usize) -> bool {
        if full <= omitted {
            self.0 += omitted - full;
            return true;
        }
        let extra = full - omitted;
        if extra > self.0 {
            return false;
        }
        self.0 -= extra;
        true
    }
}
