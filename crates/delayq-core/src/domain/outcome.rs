//! Outcome model: how one attempt ended and what a pass did overall.

use serde::{Deserialize, Serialize};

/// Terminal state of one record within one pass.
///
/// `Completed` and `Dropped` imply the record was deleted; `Rescheduled`
/// leaves it due again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    Completed,
    Rescheduled,
    Dropped,
}

/// Result of running one attempt, including the store write that followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptReport {
    pub outcome: AttemptOutcome,

    /// The store mutation for `outcome` failed; the record keeps whatever
    /// state was last committed.
    pub store_failed: bool,
}

/// Per-pass counters, logged when the pass finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    /// Processor succeeded.
    pub processed: usize,

    /// Processor failed (rescheduled + dropped).
    pub errors: usize,

    pub rescheduled: usize,
    pub dropped: usize,

    /// Due records whose processor is not registered (left untouched).
    pub skipped: usize,

    /// Due records claimed by someone else first.
    pub contended: usize,

    /// Store reads/writes that failed during the pass.
    pub store_failures: usize,
}

impl PassSummary {
    pub fn record(&mut self, report: AttemptReport) {
        match report.outcome {
            AttemptOutcome::Completed => self.processed += 1,
            AttemptOutcome::Rescheduled => {
                self.errors += 1;
                self.rescheduled += 1;
            }
            AttemptOutcome::Dropped => {
                self.errors += 1;
                self.dropped += 1;
            }
        }
        if report.store_failed {
            self.store_failures += 1;
        }
    }

    /// Records for which a processor was actually invoked.
    pub fn attempted(&self) -> usize {
        self.processed + self.errors
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}
