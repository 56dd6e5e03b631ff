//! Error types for the scheduler crate.

use std::io;

use thiserror::Error;

/// Failure to put the calling thread into its real-time configuration.
#[derive(Debug, Error)]
pub enum RTSetupError {
    /// The platform has no fixed-priority real-time policy we know how to use.
    #[error("real-time scheduling is not supported on this platform")]
    Unsupported,

    /// The maximum priority of the real-time policy could not be queried.
    #[error("failed to query maximum SCHED_FIFO priority")]
    PriorityQuery(#[source] io::Error),

    /// The kernel refused the policy change (usually missing `CAP_SYS_NICE`).
    #[error("failed to switch thread to SCHED_FIFO priority {priority}")]
    SetScheduler {
        /// Priority that was requested.
        priority: i32,
        /// OS error returned by the kernel.
        #[source]
        source: io::Error,
    },

    /// An affinity mask with no CPU in it was requested.
    #[error("CPU affinity mask is empty")]
    EmptyAffinity,

    /// The kernel refused the affinity mask.
    #[error("failed to set CPU affinity mask {mask:#x}")]
    Affinity {
        /// Requested mask.
        mask: u64,
        /// OS error returned by the kernel.
        #[source]
        source: io::Error,
    },
}

/// Outcome of a real-time task that did not complete successfully.
#[derive(Debug, Error)]
pub enum RtTaskError<E> {
    /// Elevation failed, the work was never invoked.
    #[error("real-time elevation failed")]
    Elevation(#[source] RTSetupError),

    /// The work panicked; the payload message is kept when it was a string.
    #[error("real-time task panicked: {0}")]
    Panicked(String),

    /// The work itself returned an error.
    #[error(transparent)]
    Task(E),
}

impl<E> RtTaskError<E> {
    /// Check whether the work ever ran.
    pub fn work_started(&self) -> bool {
        !matches!(self, RtTaskError::Elevation(_))
    }

    /// Return the work's own error, if that is what this is.
    pub fn into_task_error(self) -> Option<E> {
        match self {
            RtTaskError::Task(e) => Some(e),
            _ => None,
        }
    }
}

/// Result of applying an [`RTSetup`](crate::RTSetup).
pub type RTResult<T = ()> = Result<T, RTSetupError>;
