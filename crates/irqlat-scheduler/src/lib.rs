//! Real-time task wrapper for latency-critical measurement loops.
//!
//! This crate runs a unit of work on a dedicated thread that has been promoted
//! to the platform's highest fixed-priority real-time scheduling class before
//! the work starts. It provides:
//!
//! - **RTSetup**: the real-time parameters to apply (priority, memory locking,
//!   CPU affinity)
//! - **RtTask**: spawn/wait handle that records either the elevation failure
//!   or the work's own outcome
//!
//! # Starvation Risk
//!
//! A `SCHED_FIFO` thread at maximum priority is never preempted by ordinary
//! threads on the same CPU. If the work busy-loops, lower-priority threads
//! (including the one waiting in [`RtTask::wait`]) can be starved. Keep at least
//! one CPU available to non-real-time work, either by pinning the task with
//! [`RTSetup::with_cpu_affinity`] or by making sure the work blocks regularly.
//!
//! # Example
//!
//! ```no_run
//! use irqlat_scheduler::{RTSetup, RtTask};
//!
//! let task = RtTask::spawn("rt-worker", RTSetup::default(), || {
//!     // Latency-critical work here
//!     Ok::<u64, std::io::Error>(42)
//! })?;
//!
//! match task.wait() {
//!     Ok(value) => println!("work finished: {value}"),
//!     Err(e) => eprintln!("work failed: {e}"),
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod error;
pub mod rt_setup;
pub mod task;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(target_os = "linux"))]
mod fallback;

pub mod prelude;

pub use error::{RTResult, RTSetupError, RtTaskError};
pub use rt_setup::RTSetup;
pub use task::RtTask;

/// Scheduling policy name reported in logs.
pub const RT_POLICY_NAME: &str = "SCHED_FIFO";
