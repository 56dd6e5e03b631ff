//! Cooperative stop signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run-scoped cancellation flag.
///
/// Clones share the flag. The operator side raises it once; the engine polls
/// it after every wait and never blocks on it.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    raised: Arc<AtomicBool>,
}

impl StopToken {
    /// Create a clear token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn request_stop(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Check whether the flag is raised.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
