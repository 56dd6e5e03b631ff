//! Error types for the irqlat CLI

use irqlat_engine::{ConfigError, EngineError, ErrorCategory};
use irqlat_scheduler::{RTSetupError, RtTaskError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid configuration")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Real-time setup failed")]
    Elevation(#[source] RTSetupError),

    #[error("Measurement failed")]
    Measurement(#[source] EngineError),

    #[error("Failed to spawn measurement thread")]
    Spawn(#[source] std::io::Error),

    #[error("Measurement thread panicked: {0}")]
    Panicked(String),

    #[cfg(not(target_os = "linux"))]
    #[error("Hardware backend is not available on this platform; use --simulate")]
    HardwareUnsupported,
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidConfiguration(_) => 2,
            CliError::Measurement(e) => match e.category() {
                ErrorCategory::Configuration => 2,
                ErrorCategory::DeviceIdentity => 3,
                ErrorCategory::Frequency => 4,
                ErrorCategory::DeviceFault => 5,
            },
            CliError::Elevation(_) => 6,
            CliError::Spawn(_) | CliError::Panicked(_) => 1,
            #[cfg(not(target_os = "linux"))]
            CliError::HardwareUnsupported => 1,
        }
    }
}

impl From<RtTaskError<EngineError>> for CliError {
    fn from(err: RtTaskError<EngineError>) -> Self {
        match err {
            RtTaskError::Elevation(e) => CliError::Elevation(e),
            RtTaskError::Panicked(msg) => CliError::Panicked(msg),
            RtTaskError::Task(e) => CliError::Measurement(e),
        }
    }
}
