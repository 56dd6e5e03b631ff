//! Interrupt subscription over a Linux UIO device node.
//!
//! The UIO protocol: writing a native-endian `1u32` to `/dev/uioN` unmasks the
//! interrupt line, writing `0u32` masks it, and a 4-byte read blocks until the
//! next interrupt and returns the running event count. The line is masked by
//! the kernel after each interrupt, so it is re-armed after every event.

#![expect(unsafe_code, reason = "poll(2) on the UIO descriptor")]

use crate::access::{InterruptWait, WaitOutcome};
use crate::error::{HwError, HwResult};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

/// Default UIO node of the generator.
pub const DEFAULT_UIO_DEVICE: &str = "/dev/uio0";

/// Open UIO interrupt line.
///
/// The line is delivered as whatever source bits are currently subscribed;
/// with no subscription, events are reported with an empty mask.
#[derive(Debug)]
pub struct UioInterrupts {
    file: File,
    path: PathBuf,
    subscribed: u32,
    last_count: Option<u32>,
}

impl UioInterrupts {
    /// Open the UIO node at `path`.
    ///
    /// # Errors
    ///
    /// [`HwError::Open`] if the node cannot be opened read/write.
    pub fn open(path: &Path) -> HwResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| HwError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "UIO device opened");
        Ok(Self::from_file(file, path))
    }

    /// Wrap an already open UIO descriptor. `path` is only used in messages.
    #[must_use]
    pub fn from_file(file: File, path: impl Into<PathBuf>) -> Self {
        Self {
            file,
            path: path.into(),
            subscribed: 0,
            last_count: None,
        }
    }

    /// Node path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Currently subscribed source bits.
    #[must_use]
    pub fn subscribed(&self) -> u32 {
        self.subscribed
    }

    /// Event count returned by the most recent read.
    #[must_use]
    pub fn last_count(&self) -> Option<u32> {
        self.last_count
    }

    fn irq_control(&mut self, enable: bool) -> io::Result<()> {
        let value: u32 = u32::from(enable);
        self.file.write_all(&value.to_ne_bytes())
    }

    /// `Ok(true)` when readable, `Ok(false)` on timeout or signal interruption.
    fn poll_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        // SAFETY: `pfd` is a single valid pollfd for the duration of the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        let err = (rc < 0).then(io::Error::last_os_error);
        poll_outcome(rc, pfd.revents, err)
    }
}

/// Interpret a `poll` return: `Ok(true)` readable, `Ok(false)` nothing to read.
fn poll_outcome(
    rc: libc::c_int,
    revents: libc::c_short,
    err: Option<io::Error>,
) -> io::Result<bool> {
    match rc {
        0 => Ok(false),
        n if n > 0 => {
            if revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
                return Err(io::Error::other(format!(
                    "poll reported revents {revents:#x}"
                )));
            }
            Ok(true)
        }
        _ => match err {
            // A signal (Ctrl-C) landing on this thread ends the wait early;
            // the caller re-polls its stop flag.
            Some(e) if e.kind() == io::ErrorKind::Interrupted => Ok(false),
            Some(e) => Err(e),
            None => Err(io::Error::other("poll failed")),
        },
    }
}

impl InterruptWait for UioInterrupts {
    fn set_mask(&mut self, bits: u32, enabled: bool) -> HwResult<()> {
        let subscribed = if enabled {
            self.subscribed | bits
        } else {
            self.subscribed & !bits
        };
        self.irq_control(subscribed != 0)
            .map_err(|source| HwError::Mask { bits, source })?;
        self.subscribed = subscribed;
        debug!(subscribed = format_args!("{subscribed:#x}"), "UIO mask updated");
        Ok(())
    }

    fn wait(&mut self, timeout: Duration) -> HwResult<WaitOutcome> {
        if !self.poll_readable(timeout).map_err(HwError::Wait)? {
            return Ok(WaitOutcome::TimedOut);
        }

        let mut buf = [0u8; 4];
        self.file.read_exact(&mut buf).map_err(HwError::Wait)?;
        let count = u32::from_ne_bytes(buf);
        self.last_count = Some(count);
        trace!(count, "UIO interrupt");

        if self.subscribed != 0 {
            self.irq_control(true).map_err(HwError::Wait)?;
        }
        Ok(WaitOutcome::Fired(self.subscribed))
    }
}
