//! Run counters.

use serde::{Deserialize, Serialize};

/// Counters of one run. Every field only ever grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Every wait that returned without error: generator interrupts, unrelated
    /// wakeups and timeouts alike.
    pub irq_count: u64,
    /// Samples at or beyond the histogram range.
    pub irq_missed: u64,
    /// Wakeups on which the generator bit fired and a sample was taken.
    pub irq_sampled: u64,
    /// Generator count register read before stopping, when cross-checking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irq_generated: Option<u32>,
}

impl RunStatistics {
    /// Wakeups that produced no sample.
    #[must_use]
    pub fn irq_unmatched(&self) -> u64 {
        self.irq_count.saturating_sub(self.irq_sampled)
    }

    /// Samples that landed in the histogram.
    #[must_use]
    pub fn irq_in_range(&self) -> u64 {
        self.irq_sampled.saturating_sub(self.irq_missed)
    }
}
