//! Measurement run state machine.
//!
//! ```text
//! INIT -> ARMED -> RUNNING -> DRAINING -> DONE
//!   \        \         \          \
//!    +--------+---------+----------+--> ERROR -> DONE
//! ```
//!
//! Each acquired resource is held by a guard that releases it on drop. Guards
//! are declared in acquisition order, so leaving the run by any path, the
//! error paths included, releases exactly what was acquired in reverse order.
//! The generator guard only writes the stop word if the generator was
//! started.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::histogram::{LatencyHistogram, SampleClass};
use crate::latency::latency_us;
use crate::stats::RunStatistics;
use crate::stop::StopToken;
use core::fmt;
use irqlat_hw::{
    ControlWord, DEVICE_MAGIC, DevicePlatform, GENERATOR_IRQ_BIT, HwResult, InterruptWait,
    Register, RegisterAccess,
};
use std::num::NonZeroU32;
use tracing::{debug, error, info, warn};

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Opening and identifying the device.
    Init,
    /// Deriving and programming the divider.
    Armed,
    /// Sampling interrupts.
    Running,
    /// Stopping the generator and releasing handles.
    Draining,
    /// Releasing after a failure.
    Error,
    /// Terminal.
    Done,
}

impl EngineState {
    /// Get the state name as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EngineState::Init => "INIT",
            EngineState::Armed => "ARMED",
            EngineState::Running => "RUNNING",
            EngineState::Draining => "DRAINING",
            EngineState::Error => "ERROR",
            EngineState::Done => "DONE",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed run, handed back to the supervisor.
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Run counters.
    pub statistics: RunStatistics,
    /// Latency distribution.
    pub histogram: LatencyHistogram,
    /// Generator clock in Hz.
    pub fclk_hz: u32,
    /// Programmed divider.
    pub divider: u32,
    /// Requested interrupt frequency in Hz.
    pub irq_frequency_hz: u32,
}

/// Interrupt subscription; unsubscribes on drop.
struct Subscription<I: InterruptWait> {
    irq: I,
    bits: u32,
}

impl<I: InterruptWait> Subscription<I> {
    fn subscribe(mut irq: I, bits: u32) -> HwResult<Self> {
        irq.set_mask(bits, true)?;
        Ok(Self { irq, bits })
    }
}

impl<I: InterruptWait> Drop for Subscription<I> {
    fn drop(&mut self) {
        if let Err(e) = self.irq.set_mask(self.bits, false) {
            warn!(
                bits = self.bits,
                error = &e as &dyn std::error::Error,
                "failed to unsubscribe generator interrupt"
            );
        }
        debug!("interrupt handle released");
    }
}

/// Register handle; writes the stop word on drop while started.
struct Generator<R: RegisterAccess> {
    regs: R,
    started: bool,
}

impl<R: RegisterAccess> Generator<R> {
    fn start(&mut self, word: ControlWord) -> HwResult<()> {
        self.regs.write_control(word)?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> HwResult<()> {
        if self.started {
            self.regs.write_control(ControlWord::STOP)?;
            self.started = false;
            debug!("generator stopped");
        }
        Ok(())
    }
}

impl<R: RegisterAccess> Drop for Generator<R> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(
                error = &e as &dyn std::error::Error,
                "failed to stop generator during teardown"
            );
        }
        debug!("register handle released");
    }
}

/// The latency measurement engine.
///
/// Owns the device platform for the run. [`LatencyEngine::run`] blocks the
/// calling thread, which should be the real-time task thread, until the stop
/// token is raised, the wakeup budget is spent, or a fatal error occurs.
#[derive(Debug)]
pub struct LatencyEngine<P: DevicePlatform> {
    platform: P,
    config: EngineConfig,
    stop: StopToken,
    state: EngineState,
}

impl<P: DevicePlatform> LatencyEngine<P> {
    /// Create an engine in [`EngineState::Init`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if `config` is invalid.
    pub fn new(platform: P, config: EngineConfig, stop: StopToken) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            platform,
            config,
            stop,
            state: EngineState::Init,
        })
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Run configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one run, filling `histogram`.
    ///
    /// The engine ends in [`EngineState::Done`] whatever the outcome, and
    /// `Done` is terminal: a finished engine never touches the device again.
    /// On failure the histogram is discarded.
    ///
    /// # Errors
    ///
    /// - [`EngineError::AlreadyFinished`] if this engine has already run
    /// - [`EngineError::Device`] if a handle cannot be opened or driven
    /// - [`EngineError::IdentityMismatch`] if the magic register is wrong
    /// - [`EngineError::UnsatisfiableFrequency`] if no divider fits
    /// - [`EngineError::Wait`] if an interrupt wait fails hard
    pub fn run(&mut self, mut histogram: LatencyHistogram) -> EngineResult<Measurement> {
        if self.state == EngineState::Done {
            return Err(EngineError::AlreadyFinished);
        }
        match self.execute(&mut histogram) {
            Ok((statistics, fclk_hz, divider)) => {
                self.transition(EngineState::Done);
                info!(
                    irq_count = statistics.irq_count,
                    irq_sampled = statistics.irq_sampled,
                    irq_missed = statistics.irq_missed,
                    "measurement finished"
                );
                Ok(Measurement {
                    statistics,
                    histogram,
                    fclk_hz,
                    divider,
                    irq_frequency_hz: self.config.irq_frequency_hz,
                })
            }
            Err(e) => {
                error!(
                    error = &e as &dyn std::error::Error,
                    state = %self.state,
                    "measurement failed"
                );
                self.transition(EngineState::Error);
                self.transition(EngineState::Done);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: EngineState) {
        debug!(from = %self.state, to = %next, "engine state change");
        self.state = next;
    }

    fn execute(
        &mut self,
        histogram: &mut LatencyHistogram,
    ) -> EngineResult<(RunStatistics, u32, u32)> {
        info!(platform = self.platform.name(), "bringing up generator");
        self.platform
            .enable_interrupt_forwarding()
            .map_err(EngineError::Device)?;

        let irq = self.platform.open_interrupts().map_err(EngineError::Device)?;
        let mut subscription =
            Subscription::subscribe(irq, GENERATOR_IRQ_BIT).map_err(EngineError::Device)?;

        let regs = self.platform.open_registers().map_err(EngineError::Device)?;
        let mut generator = Generator {
            regs,
            started: false,
        };

        let magic = read(&mut generator.regs, Register::Magic)?;
        if magic != DEVICE_MAGIC {
            return Err(EngineError::IdentityMismatch {
                found: magic,
                expected: DEVICE_MAGIC,
            });
        }

        self.transition(EngineState::Armed);
        let fclk_hz = read(&mut generator.regs, Register::ClockFrequency)?;
        let requested_hz = self.config.irq_frequency_hz;
        let unsatisfiable = EngineError::UnsatisfiableFrequency {
            fclk_hz,
            requested_hz,
        };
        let divider = fclk_hz.checked_div(requested_hz).unwrap_or(0);
        let (Some(fclk), Some(word)) = (NonZeroU32::new(fclk_hz), ControlWord::start(divider))
        else {
            return Err(unsatisfiable);
        };
        info!(fclk_hz, requested_hz, divider, "generator armed");
        generator.start(word).map_err(EngineError::Device)?;

        self.transition(EngineState::Running);
        let mut stats = RunStatistics::default();
        let limit = self.config.irq_count_limit;
        let timeout = self.config.wait_timeout;
        loop {
            let outcome = subscription.irq.wait(timeout).map_err(EngineError::Wait)?;
            stats.irq_count += 1;

            if outcome.matches(GENERATOR_IRQ_BIT) {
                let start = read(&mut generator.regs, Register::StartTime)?;
                let now = read(&mut generator.regs, Register::NowTime)?;
                stats.irq_sampled += 1;
                if histogram.record(latency_us(start, now, fclk)) == SampleClass::Missed {
                    stats.irq_missed += 1;
                }
            }

            if self.stop.is_stop_requested() || (limit > 0 && stats.irq_count == limit) {
                break;
            }
        }

        self.transition(EngineState::Draining);
        if self.config.cross_check {
            let generated = read(&mut generator.regs, Register::Count)?;
            stats.irq_generated = Some(generated);
            if u64::from(generated) < stats.irq_sampled {
                warn!(
                    generated,
                    sampled = stats.irq_sampled,
                    "generator reports fewer interrupts than were sampled"
                );
            } else {
                info!(generated, sampled = stats.irq_sampled, "count cross-check");
            }
        }
        generator.stop().map_err(EngineError::Device)?;
        Ok((stats, fclk_hz, divider))
    }
}

fn read<R: RegisterAccess>(regs: &mut R, reg: Register) -> EngineResult<u32> {
    regs.read(reg).map_err(EngineError::Device)
}
