//! Software emulation of the IRQ generator.
//!
//! This module provides [`SoftwareTimerPlatform`], an in-process stand-in for
//! the generator card for hosts without the hardware. It keeps the card's
//! observable behaviour:
//!
//! - a free-running 32-bit counter at `fclk`, derived from the monotonic clock
//! - periodic "interrupts" every `divider` ticks once the control register is
//!   started
//! - the start-time register latching the tick of the most recent interrupt
//! - the count register holding the number of interrupts generated
//!
//! Waiting sleeps the calling thread until the next period boundary, so the
//! latency the engine measures is the host's real wake-up latency.

use crate::access::{DevicePlatform, InterruptWait, RegisterAccess, WaitOutcome, check_writable};
use crate::error::HwResult;
use crate::registers::{ControlWord, DEVICE_MAGIC, GENERATOR_IRQ_BIT, Register};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Counter frequency of the emulated card.
pub const DEFAULT_SOFTWARE_FCLK_HZ: u32 = 100_000_000;

const NANOS_PER_SEC: u128 = 1_000_000_000;

#[derive(Debug)]
struct GeneratorCore {
    epoch: Instant,
    fclk: u32,
    control: ControlWord,
    armed_at: u64,
    latched: u64,
    generated: u64,
}

impl GeneratorCore {
    fn new(fclk: u32) -> Self {
        Self {
            epoch: Instant::now(),
            fclk: fclk.max(1),
            control: ControlWord::STOP,
            armed_at: 0,
            latched: 0,
            generated: 0,
        }
    }

    fn ticks_at(&self, t: Instant) -> u64 {
        let ns = t.saturating_duration_since(self.epoch).as_nanos();
        let ticks = ns.saturating_mul(u128::from(self.fclk)) / NANOS_PER_SEC;
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    /// Earliest instant at which the counter has reached `tick`.
    fn instant_of(&self, tick: u64) -> Instant {
        let fclk = u128::from(self.fclk);
        let ns = (u128::from(tick) * NANOS_PER_SEC).div_ceil(fclk);
        self.epoch + Duration::from_nanos(u64::try_from(ns).unwrap_or(u64::MAX))
    }

    fn next_irq_tick(&self) -> Option<u64> {
        self.control
            .running
            .then(|| self.latched.saturating_add(u64::from(self.control.divider)))
    }

    /// Latch the most recent period boundary at or before `now_tick`.
    fn catch_up(&mut self, now_tick: u64) {
        let divider = u64::from(self.control.divider.max(1));
        let periods = now_tick.saturating_sub(self.armed_at) / divider;
        if periods > self.generated {
            self.generated = periods;
            self.latched = self.armed_at + periods * divider;
        }
    }

    fn write_control(&mut self, word: ControlWord) {
        if word.running && word.divider != 0 {
            let now = self.ticks_at(Instant::now());
            self.armed_at = now;
            self.latched = now;
            self.generated = 0;
        }
        self.control = word;
        debug!(%word, "software generator control written");
    }
}

/// Wrap an absolute tick into the 32-bit counter register.
#[expect(
    clippy::cast_possible_truncation,
    reason = "masked to 32 bits before the cast"
)]
fn counter_value(tick: u64) -> u32 {
    (tick & u64::from(u32::MAX)) as u32
}

/// In-process generator emulation.
///
/// # Example
///
/// ```rust
/// use irqlat_hw::{ControlWord, DevicePlatform, InterruptWait, RegisterAccess, Register,
///                 SoftwareTimerPlatform, WaitOutcome, GENERATOR_IRQ_BIT};
/// use std::time::Duration;
///
/// # fn main() -> Result<(), irqlat_hw::HwError> {
/// let mut platform = SoftwareTimerPlatform::new(1_000_000);
/// let mut irq = platform.open_interrupts()?;
/// let mut regs = platform.open_registers()?;
///
/// irq.set_mask(GENERATOR_IRQ_BIT, true)?;
/// if let Some(word) = ControlWord::start(1_000) {
///     regs.write_control(word)?;
/// }
/// let outcome = irq.wait(Duration::from_secs(1))?;
/// assert!(outcome.matches(GENERATOR_IRQ_BIT));
/// regs.write_control(ControlWord::STOP)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SoftwareTimerPlatform {
    core: Arc<Mutex<GeneratorCore>>,
}

impl SoftwareTimerPlatform {
    /// Emulate a card whose counter runs at `fclk` Hz.
    #[must_use]
    pub fn new(fclk: u32) -> Self {
        Self {
            core: Arc::new(Mutex::new(GeneratorCore::new(fclk))),
        }
    }

    /// Counter frequency in Hz.
    #[must_use]
    pub fn fclk(&self) -> u32 {
        self.core.lock().fclk
    }
}

impl Default for SoftwareTimerPlatform {
    fn default() -> Self {
        Self::new(DEFAULT_SOFTWARE_FCLK_HZ)
    }
}

impl DevicePlatform for SoftwareTimerPlatform {
    type Registers = SoftwareRegisters;
    type Interrupts = SoftwareInterrupts;

    fn name(&self) -> &'static str {
        "software"
    }

    fn open_interrupts(&mut self) -> HwResult<SoftwareInterrupts> {
        Ok(SoftwareInterrupts {
            core: Arc::clone(&self.core),
            subscribed: 0,
        })
    }

    fn open_registers(&mut self) -> HwResult<SoftwareRegisters> {
        Ok(SoftwareRegisters {
            core: Arc::clone(&self.core),
        })
    }
}

/// Register view of the emulated card.
#[derive(Debug)]
pub struct SoftwareRegisters {
    core: Arc<Mutex<GeneratorCore>>,
}

impl RegisterAccess for SoftwareRegisters {
    fn read(&mut self, reg: Register) -> HwResult<u32> {
        let core = self.core.lock();
        let value = match reg {
            Register::Control => core.control.encode(),
            Register::Toggle => 0,
            Register::Magic => DEVICE_MAGIC,
            Register::ClockFrequency => core.fclk,
            Register::StartTime => counter_value(core.latched),
            Register::NowTime => counter_value(core.ticks_at(Instant::now())),
            Register::Count => counter_value(core.generated),
        };
        Ok(value)
    }

    fn write(&mut self, reg: Register, value: u32) -> HwResult<()> {
        check_writable(reg)?;
        self.core.lock().write_control(ControlWord::decode(value));
        Ok(())
    }
}

/// Interrupt view of the emulated card. The generator raises
/// [`GENERATOR_IRQ_BIT`].
#[derive(Debug)]
pub struct SoftwareInterrupts {
    core: Arc<Mutex<GeneratorCore>>,
    subscribed: u32,
}

impl InterruptWait for SoftwareInterrupts {
    fn set_mask(&mut self, bits: u32, enabled: bool) -> HwResult<()> {
        if enabled {
            self.subscribed |= bits;
        } else {
            self.subscribed &= !bits;
        }
        Ok(())
    }

    fn wait(&mut self, timeout: Duration) -> HwResult<WaitOutcome> {
        let started = Instant::now();
        let limit = started + timeout;

        let target = {
            let core = self.core.lock();
            if self.subscribed & GENERATOR_IRQ_BIT == 0 {
                None
            } else {
                core.next_irq_tick()
                    .map(|tick| core.instant_of(tick))
                    .filter(|at| *at <= limit)
            }
        };

        let Some(target) = target else {
            std::thread::sleep(timeout);
            return Ok(WaitOutcome::TimedOut);
        };

        let now = Instant::now();
        if target > now {
            std::thread::sleep(target - now);
        }

        let mut core = self.core.lock();
        let now_tick = core.ticks_at(Instant::now());
        core.catch_up(now_tick);
        Ok(WaitOutcome::Fired(GENERATOR_IRQ_BIT))
    }
}
