//! Dedicated real-time task thread.
//!
//! [`RtTask::spawn`] creates a named thread, applies an [`RTSetup`] to it and
//! only then invokes the unit of work. [`RtTask::wait`] joins the thread and
//! yields the recorded outcome. The join is the only synchronization point
//! between the work and its supervisor: whatever the work returns is moved
//! back to the caller through it.

use crate::error::RtTaskError;
use crate::rt_setup::RTSetup;
use std::any::Any;
use std::io;
use std::thread::{self, JoinHandle};
use tracing::{error, info};

#[cfg(target_os = "linux")]
use crate::linux::apply_rt_setup;

#[cfg(not(target_os = "linux"))]
use crate::fallback::apply_rt_setup;

/// Handle to a unit of work running on its own real-time thread.
///
/// # Starvation Risk
///
/// With `high_priority` set, the task thread runs at the highest
/// `SCHED_FIFO` priority. Until it blocks, it starves every time-shared
/// thread on its CPU, the one blocked in [`RtTask::wait`] included. Callers
/// must keep at least one CPU free for non-real-time work (see
/// [`RTSetup::with_cpu_affinity`]) or accept degraded responsiveness of the
/// rest of the process.
#[derive(Debug)]
pub struct RtTask<T, E> {
    name: String,
    handle: JoinHandle<Result<T, RtTaskError<E>>>,
}

impl<T, E> RtTask<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Spawn `work` on a new thread configured by `setup`.
    ///
    /// If the setup cannot be applied, `work` is dropped without being
    /// called and [`RtTask::wait`] reports [`RtTaskError::Elevation`].
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread itself cannot be created.
    pub fn spawn<F>(name: impl Into<String>, setup: RTSetup, work: F) -> io::Result<Self>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        let name = name.into();
        let thread_name = name.clone();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            match apply_rt_setup(&setup) {
                Ok(Some(priority)) => {
                    info!(
                        task = %thread_name,
                        priority,
                        policy = crate::RT_POLICY_NAME,
                        "real-time task elevated"
                    );
                }
                Ok(None) => {
                    info!(task = %thread_name, "real-time task running without elevation");
                }
                Err(e) => {
                    error!(
                        task = %thread_name,
                        error = &e as &dyn std::error::Error,
                        "real-time elevation failed, task not started"
                    );
                    return Err(RtTaskError::Elevation(e));
                }
            }
            work().map_err(RtTaskError::Task)
        })?;

        Ok(Self { name, handle })
    }

    /// Thread name given at spawn time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether the thread has finished, without blocking.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the task finishes and return its outcome.
    ///
    /// # Errors
    ///
    /// - [`RtTaskError::Elevation`] if the setup could not be applied
    /// - [`RtTaskError::Task`] with the work's own error
    /// - [`RtTaskError::Panicked`] if the work panicked
    pub fn wait(self) -> Result<T, RtTaskError<E>> {
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(task = %self.name, %message, "real-time task panicked");
                Err(RtTaskError::Panicked(message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_work_result_is_returned() -> TestResult {
        let task = RtTask::spawn("test-ok", RTSetup::minimal(), || Ok::<_, String>(7u32))?;
        assert_eq!(task.name(), "test-ok");
        assert_eq!(task.wait().map_err(|e| e.to_string())?, 7);
        Ok(())
    }

    #[test]
    fn test_work_error_is_returned() -> TestResult {
        let task = RtTask::spawn("test-err", RTSetup::minimal(), || {
            Err::<(), _>(io::Error::other("boom"))
        })?;
        match task.wait() {
            Err(RtTaskError::Task(e)) => assert_eq!(e.to_string(), "boom"),
            other => return Err(format!("unexpected outcome: {other:?}").into()),
        }
        Ok(())
    }

    #[test]
    fn test_panic_is_reported() -> TestResult {
        let task = RtTask::spawn("test-panic", RTSetup::minimal(), || -> Result<(), ()> {
            std::panic::panic_any("work exploded")
        })?;
        match task.wait() {
            Err(RtTaskError::Panicked(message)) => assert_eq!(message, "work exploded"),
            other => return Err(format!("unexpected outcome: {other:?}").into()),
        }
        Ok(())
    }

    #[test]
    fn test_work_not_invoked_when_elevation_fails() -> TestResult {
        // An empty affinity mask is rejected on every platform.
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_task = Arc::clone(&ran);
        let setup = RTSetup::minimal().with_cpu_affinity(0);

        let task = RtTask::spawn("test-elevation", setup, move || {
            ran_in_task.store(true, Ordering::SeqCst);
            Ok::<_, ()>(())
        })?;

        let outcome = task.wait();
        assert!(matches!(outcome, Err(RtTaskError::Elevation(_))));
        assert!(!ran.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn test_panic_message_variants() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
