//! Scripted generator double.
//!
//! [`ScriptedPlatform`] replays a fixed list of wait outcomes and register
//! values, and journals every open, close, mask change and register write.
//! Tests use the journal to check bring-up order and that teardown releases
//! exactly what was acquired.

use crate::access::{DevicePlatform, InterruptWait, RegisterAccess, WaitOutcome, check_writable};
use crate::error::{HwError, HwResult};
use crate::registers::{ControlWord, DEVICE_MAGIC, GENERATOR_IRQ_BIT, Register};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// One scripted return of [`InterruptWait::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedEvent {
    /// Generator interrupt; the start/now registers read these values until
    /// the next sample.
    Sample {
        /// Latched start time.
        start: u32,
        /// Counter value read at service time.
        now: u32,
    },
    /// Wait returns with this mask, without a generator sample.
    Fired(u32),
    /// Wait times out.
    Timeout,
    /// Wait fails hard.
    Fault,
}

/// Recorded side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalEntry {
    /// Bridge forwarding enabled.
    ForwardingEnabled,
    /// Interrupt handle opened.
    InterruptsOpened,
    /// Subscription changed.
    MaskChanged {
        /// Bits changed.
        bits: u32,
        /// Subscribed or unsubscribed.
        enabled: bool,
    },
    /// Register handle opened.
    RegistersOpened,
    /// Register written.
    RegisterWritten {
        /// Target register.
        reg: Register,
        /// Raw value.
        value: u32,
    },
    /// Register handle dropped.
    RegistersClosed,
    /// Interrupt handle dropped.
    InterruptsClosed,
}

/// Step at which the double reports a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// [`DevicePlatform::enable_interrupt_forwarding`].
    Forwarding,
    /// [`DevicePlatform::open_interrupts`].
    OpenInterrupts,
    /// [`InterruptWait::set_mask`].
    SetMask,
    /// [`DevicePlatform::open_registers`].
    OpenRegisters,
}

#[derive(Debug)]
struct ScriptState {
    magic: u32,
    fclk: u32,
    control: u32,
    generated: u32,
    events: VecDeque<ScriptedEvent>,
    current: (u32, u32),
    journal: Vec<JournalEntry>,
    fail_at: Option<FailurePoint>,
    wait_delay: Duration,
    waits: u64,
}

impl ScriptState {
    fn fail_if(&self, point: FailurePoint) -> HwResult<()> {
        if self.fail_at == Some(point) {
            return Err(HwError::fault(format!("scripted failure at {point:?}")));
        }
        Ok(())
    }
}

/// Deterministic generator double.
///
/// Clones share state, so a test can keep one handle for inspection while the
/// engine owns another.
///
/// # Example
///
/// ```rust
/// use irqlat_hw::{DevicePlatform, InterruptWait, JournalEntry, ScriptedEvent, ScriptedPlatform};
/// use std::time::Duration;
///
/// # fn main() -> Result<(), irqlat_hw::HwError> {
/// let platform = ScriptedPlatform::new().with_events([ScriptedEvent::Timeout]);
/// {
///     let mut engine_side = platform.clone();
///     let mut irq = engine_side.open_interrupts()?;
///     irq.wait(Duration::from_millis(1))?;
/// }
/// assert_eq!(
///     platform.journal(),
///     vec![JournalEntry::InterruptsOpened, JournalEntry::InterruptsClosed]
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedPlatform {
    state: Arc<Mutex<ScriptState>>,
}

impl Default for ScriptedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPlatform {
    /// A genuine-looking device at 100 MHz with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                magic: DEVICE_MAGIC,
                fclk: 100_000_000,
                control: 0,
                generated: 0,
                events: VecDeque::new(),
                current: (0, 0),
                journal: Vec::new(),
                fail_at: None,
                wait_delay: Duration::ZERO,
                waits: 0,
            })),
        }
    }

    /// Value of the magic register.
    #[must_use]
    pub fn with_magic(self, magic: u32) -> Self {
        self.state.lock().magic = magic;
        self
    }

    /// Value of the clock frequency register.
    #[must_use]
    pub fn with_fclk(self, fclk: u32) -> Self {
        self.state.lock().fclk = fclk;
        self
    }

    /// Append events to the script. Once the script is exhausted every wait
    /// times out.
    #[must_use]
    pub fn with_events(self, events: impl IntoIterator<Item = ScriptedEvent>) -> Self {
        self.state.lock().events.extend(events);
        self
    }

    /// Fail at the given bring-up step.
    #[must_use]
    pub fn failing_at(self, point: FailurePoint) -> Self {
        self.state.lock().fail_at = Some(point);
        self
    }

    /// Sleep this long in every wait.
    #[must_use]
    pub fn with_wait_delay(self, delay: Duration) -> Self {
        self.state.lock().wait_delay = delay;
        self
    }

    /// Side effects recorded so far.
    #[must_use]
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state.lock().journal.clone()
    }

    /// Number of waits served.
    #[must_use]
    pub fn waits(&self) -> u64 {
        self.state.lock().waits
    }

    /// Events not consumed yet.
    #[must_use]
    pub fn remaining_events(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Last value written to the control register.
    #[must_use]
    pub fn control(&self) -> ControlWord {
        ControlWord::decode(self.state.lock().control)
    }
}

impl DevicePlatform for ScriptedPlatform {
    type Registers = ScriptedRegisters;
    type Interrupts = ScriptedInterrupts;

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn enable_interrupt_forwarding(&mut self) -> HwResult<()> {
        let mut state = self.state.lock();
        state.fail_if(FailurePoint::Forwarding)?;
        state.journal.push(JournalEntry::ForwardingEnabled);
        Ok(())
    }

    fn open_interrupts(&mut self) -> HwResult<ScriptedInterrupts> {
        let mut state = self.state.lock();
        state.fail_if(FailurePoint::OpenInterrupts)?;
        state.journal.push(JournalEntry::InterruptsOpened);
        Ok(ScriptedInterrupts {
            state: Arc::clone(&self.state),
        })
    }

    fn open_registers(&mut self) -> HwResult<ScriptedRegisters> {
        let mut state = self.state.lock();
        state.fail_if(FailurePoint::OpenRegisters)?;
        state.journal.push(JournalEntry::RegistersOpened);
        Ok(ScriptedRegisters {
            state: Arc::clone(&self.state),
        })
    }
}

/// Register handle of the double.
#[derive(Debug)]
pub struct ScriptedRegisters {
    state: Arc<Mutex<ScriptState>>,
}

impl RegisterAccess for ScriptedRegisters {
    fn read(&mut self, reg: Register) -> HwResult<u32> {
        let state = self.state.lock();
        Ok(match reg {
            Register::Control => state.control,
            Register::Toggle => 0,
            Register::Magic => state.magic,
            Register::ClockFrequency => state.fclk,
            Register::StartTime => state.current.0,
            Register::NowTime => state.current.1,
            Register::Count => state.generated,
        })
    }

    fn write(&mut self, reg: Register, value: u32) -> HwResult<()> {
        check_writable(reg)?;
        let mut state = self.state.lock();
        state.control = value;
        state.journal.push(JournalEntry::RegisterWritten { reg, value });
        Ok(())
    }
}

impl Drop for ScriptedRegisters {
    fn drop(&mut self) {
        self.state.lock().journal.push(JournalEntry::RegistersClosed);
    }
}

/// Interrupt handle of the double.
#[derive(Debug)]
pub struct ScriptedInterrupts {
    state: Arc<Mutex<ScriptState>>,
}

impl InterruptWait for ScriptedInterrupts {
    fn set_mask(&mut self, bits: u32, enabled: bool) -> HwResult<()> {
        let mut state = self.state.lock();
        state.fail_if(FailurePoint::SetMask)?;
        state.journal.push(JournalEntry::MaskChanged { bits, enabled });
        Ok(())
    }

    fn wait(&mut self, _timeout: Duration) -> HwResult<WaitOutcome> {
        let delay = self.state.lock().wait_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        state.waits += 1;
        match state.events.pop_front() {
            Some(ScriptedEvent::Sample { start, now }) => {
                state.current = (start, now);
                state.generated = state.generated.wrapping_add(1);
                Ok(WaitOutcome::Fired(GENERATOR_IRQ_BIT))
            }
            Some(ScriptedEvent::Fired(mask)) => Ok(WaitOutcome::Fired(mask)),
            Some(ScriptedEvent::Timeout) | None => Ok(WaitOutcome::TimedOut),
            Some(ScriptedEvent::Fault) => Err(HwError::Wait(io::Error::other("scripted fault"))),
        }
    }
}

impl Drop for ScriptedInterrupts {
    fn drop(&mut self) {
        self.state.lock().journal.push(JournalEntry::InterruptsClosed);
    }
}
