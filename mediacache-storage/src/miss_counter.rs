//! Search index miss telemetry.
//!
//! Counts media that the repository knows but the search index did not
//! return. The counter stops at its threshold and is never reset, so the
//! warning it raises is logged once per counter.

use std::sync::atomic::{AtomicU32, Ordering};

/// Result of recording one miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissRecord {
    /// Counted, threshold not reached yet.
    Counted(u32),
    /// This miss reached the threshold.
    Saturated(u32),
    /// The threshold was reached earlier.
    AlreadySaturated,
}

/// Saturating counter of index misses.
#[derive(Debug)]
pub struct MissCounter {
    count: AtomicU32,
    threshold: u32,
}

impl MissCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            count: AtomicU32::new(0),
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_saturated(&self) -> bool {
        self.count() >= self.threshold
    }

    /// Record a miss. The increment and the threshold check are one atomic
    /// step, so exactly one caller observes [`MissRecord::Saturated`].
    pub fn record(&self) -> MissRecord {
        let threshold = self.threshold;
        match self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < threshold).then_some(n + 1)
            }) {
            Ok(previous) if previous + 1 == threshold => {
                tracing::warn!(
                    threshold,
                    "The search index returned no result for media known to the repository \
                     {threshold} times, the search index may be corrupt or out of date; \
                     consider rebuilding it"
                );
                MissRecord::Saturated(threshold)
            }
            Ok(previous) => MissRecord::Counted(previous + 1),
            Err(_) => MissRecord::AlreadySaturated,
        }
    }
}
