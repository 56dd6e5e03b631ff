//! Fallback platform implementation for non-Linux systems.

use crate::error::{RTResult, RTSetupError};
use crate::rt_setup::RTSetup;
use tracing::warn;

/// Apply RT setup. Only the no-op configuration succeeds here.
pub(crate) fn apply_rt_setup(setup: &RTSetup) -> RTResult<Option<i32>> {
    if setup.high_priority || setup.cpu_affinity.is_some() {
        return Err(RTSetupError::Unsupported);
    }
    if setup.lock_memory {
        warn!("memory locking is not supported on this platform");
    }
    Ok(None)
}
