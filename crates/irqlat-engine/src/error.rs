//! Error types for configuration and measurement runs.

use irqlat_hw::HwError;
use thiserror::Error;

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Interrupt frequency must be positive.
    #[error("irq frequency must be greater than zero")]
    ZeroFrequency,

    /// Wait timeout must be positive.
    #[error("wait timeout must be greater than zero")]
    ZeroWaitTimeout,
}

/// Failure of a measurement run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected configuration.
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    /// The magic register does not identify the generator.
    #[error(
        "device identity mismatch: magic register reads {found:#010x}, expected {expected:#010x}"
    )]
    IdentityMismatch {
        /// Value read.
        found: u32,
        /// Value a genuine generator reports.
        expected: u32,
    },

    /// No divider of the generator clock yields the requested frequency.
    #[error("cannot generate {requested_hz} Hz from a {fclk_hz} Hz clock")]
    UnsatisfiableFrequency {
        /// Generator clock.
        fclk_hz: u32,
        /// Requested interrupt frequency.
        requested_hz: u32,
    },

    /// Opening or driving the device failed.
    #[error("device access failed")]
    Device(#[source] HwError),

    /// `run` was called on an engine that already reached `DONE`.
    #[error("engine has already finished its run")]
    AlreadyFinished,

    /// The interrupt wait failed hard.
    #[error("run aborted by a failed interrupt wait")]
    Wait(#[source] HwError),
}

/// Broad classification used to pick a process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad parameters.
    Configuration,
    /// Wrong or missing generator identity.
    DeviceIdentity,
    /// Requested frequency not reachable.
    Frequency,
    /// Open, access or wait failure.
    DeviceFault,
}

impl EngineError {
    /// Classify this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Config(_) | EngineError::AlreadyFinished => ErrorCategory::Configuration,
            EngineError::IdentityMismatch { .. } => ErrorCategory::DeviceIdentity,
            EngineError::UnsatisfiableFrequency { .. } => ErrorCategory::Frequency,
            EngineError::Device(_) | EngineError::Wait(_) => ErrorCategory::DeviceFault,
        }
    }
}

/// A specialized `Result` type for measurement runs.
pub type EngineResult<T> = Result<T, EngineError>;
