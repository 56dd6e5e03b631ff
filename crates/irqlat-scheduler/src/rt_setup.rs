//! Real-time setup configuration.

/// Highest CPU index addressable through an affinity mask.
pub const MAX_AFFINITY_CPUS: usize = 64;

/// Real-time setup configuration.
///
/// Describes what to apply to a freshly spawned task thread before its work
/// runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTSetup {
    /// Switch the thread to `SCHED_FIFO` at the policy's maximum priority.
    ///
    /// Turning this off is meant for environments without real-time
    /// privileges (CI, containers); measurements taken that way reflect the
    /// time-shared scheduler.
    pub high_priority: bool,

    /// Lock all current and future pages (`mlockall`).
    ///
    /// Failure is logged and otherwise ignored.
    pub lock_memory: bool,

    /// CPU affinity mask (None = no affinity).
    ///
    /// Each bit represents a CPU core (bit 0 = core 0, etc.).
    pub cpu_affinity: Option<u64>,
}

impl Default for RTSetup {
    fn default() -> Self {
        Self {
            high_priority: true,
            lock_memory: true,
            cpu_affinity: None,
        }
    }
}

impl RTSetup {
    /// Create a new RTSetup with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a minimal RTSetup (no special configuration).
    pub fn minimal() -> Self {
        Self {
            high_priority: false,
            lock_memory: false,
            cpu_affinity: None,
        }
    }

    /// Set high priority.
    pub fn with_high_priority(mut self, enabled: bool) -> Self {
        self.high_priority = enabled;
        self
    }

    /// Set memory locking.
    pub fn with_lock_memory(mut self, enabled: bool) -> Self {
        self.lock_memory = enabled;
        self
    }

    /// Set CPU affinity mask.
    pub fn with_cpu_affinity(mut self, mask: u64) -> Self {
        self.cpu_affinity = Some(mask);
        self
    }

    /// Pin to a single CPU.
    ///
    /// CPUs at or beyond [`MAX_AFFINITY_CPUS`] cannot be expressed and leave
    /// the affinity unset.
    pub fn with_cpu(self, cpu: usize) -> Self {
        match 1u64.checked_shl(u32::try_from(cpu).unwrap_or(u32::MAX)) {
            Some(mask) => self.with_cpu_affinity(mask),
            None => self,
        }
    }

    /// Check if any RT features are enabled.
    pub fn has_rt_features(&self) -> bool {
        self.high_priority || self.lock_memory || self.cpu_affinity.is_some()
    }

    /// CPU indices selected by the affinity mask, in ascending order.
    pub fn affinity_cpus(&self) -> impl Iterator<Item = usize> + '_ {
        let mask = self.cpu_affinity.unwrap_or(0);
        (0..MAX_AFFINITY_CPUS).filter(move |cpu| mask & (1u64 << cpu) != 0)
    }
}
