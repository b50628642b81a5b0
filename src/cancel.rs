//! Cooperative cancellation shared between the walker, workers and assembler

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{FosumError, Result};

/// Cloneable flag; once set, every stage stops at its next checkpoint.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Return `Err(Cancelled)` once the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FosumError::Cancelled)
        } else {
            Ok(())
        }
    }
}
