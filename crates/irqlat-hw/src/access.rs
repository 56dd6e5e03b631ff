//! Capability traits the measurement engine is written against.
//!
//! A backend supplies a [`DevicePlatform`] that opens two independent handles:
//! the register block ([`RegisterAccess`]) and the interrupt subscription
//! ([`InterruptWait`]). Handles release their resources when dropped, so a
//! caller that opens them in order and lets them go out of scope gets reverse
//! order teardown of exactly what it acquired.

use crate::error::{HwError, HwResult};
use crate::registers::{ControlWord, Register};
use std::time::Duration;

/// Read/write access to the generator registers.
pub trait RegisterAccess {
    /// Read a 32-bit register.
    ///
    /// # Errors
    ///
    /// Backend-specific access failure.
    fn read(&mut self, reg: Register) -> HwResult<u32>;

    /// Write a 32-bit register.
    ///
    /// # Errors
    ///
    /// [`HwError::ReadOnlyRegister`] for anything but [`Register::Control`],
    /// or a backend-specific access failure.
    fn write(&mut self, reg: Register, value: u32) -> HwResult<()>;

    /// Write an encoded control word.
    ///
    /// # Errors
    ///
    /// Same as [`RegisterAccess::write`].
    fn write_control(&mut self, word: ControlWord) -> HwResult<()> {
        self.write(Register::Control, word.encode())
    }
}

/// Result of a blocking interrupt wait that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The wait returned with these source bits pending. May be zero or
    /// unrelated to the caller's subscription.
    Fired(u32),
    /// Nothing arrived before the timeout.
    TimedOut,
}

impl WaitOutcome {
    /// Check whether any of `bits` fired.
    #[must_use]
    pub fn matches(self, bits: u32) -> bool {
        match self {
            WaitOutcome::Fired(mask) => mask & bits != 0,
            WaitOutcome::TimedOut => false,
        }
    }
}

/// Mask-based interrupt subscription with a blocking wait.
pub trait InterruptWait {
    /// Subscribe to (`enabled`) or unsubscribe from the given source bits.
    ///
    /// # Errors
    ///
    /// [`HwError::Mask`] if the backend refuses the change.
    fn set_mask(&mut self, bits: u32, enabled: bool) -> HwResult<()>;

    /// Block until a subscribed source fires or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// [`HwError::Wait`] or another backend error when the wait itself fails.
    /// A timeout is not an error.
    fn wait(&mut self, timeout: Duration) -> HwResult<WaitOutcome>;
}

/// Factory for the two generator handles.
pub trait DevicePlatform {
    /// Register handle type.
    type Registers: RegisterAccess;
    /// Interrupt handle type.
    type Interrupts: InterruptWait;

    /// Short backend name for logs and reports.
    fn name(&self) -> &'static str;

    /// Route generator interrupts to the host before subscribing.
    ///
    /// # Errors
    ///
    /// Backend-specific failure. The default does nothing.
    fn enable_interrupt_forwarding(&mut self) -> HwResult<()> {
        Ok(())
    }

    /// Open the interrupt subscription handle.
    ///
    /// # Errors
    ///
    /// Backend-specific open failure.
    fn open_interrupts(&mut self) -> HwResult<Self::Interrupts>;

    /// Open the register handle.
    ///
    /// # Errors
    ///
    /// Backend-specific open failure.
    fn open_registers(&mut self) -> HwResult<Self::Registers>;
}

/// Reject writes to read-only registers; shared by every backend.
pub(crate) fn check_writable(reg: Register) -> HwResult<()> {
    if reg.is_writable() {
        Ok(())
    } else {
        Err(HwError::ReadOnlyRegister(reg))
    }
}
