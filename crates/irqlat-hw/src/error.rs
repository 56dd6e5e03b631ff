//! Error types for register and interrupt access.

use crate::registers::Register;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by generator backends.
#[derive(Debug, Error)]
pub enum HwError {
    /// No PCI function with the requested identity.
    #[error("PCI device {id} not found")]
    DeviceNotFound {
        /// `vendor:device` pair that was searched for.
        id: String,
    },

    /// A device node or sysfs file could not be opened.
    #[error("failed to open {}", path.display())]
    Open {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A BAR could not be mapped.
    #[error("failed to map {}", path.display())]
    Map {
        /// BAR resource file.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The mapped BAR does not cover the register block.
    #[error("BAR {} is {len} bytes, register block needs {required}", path.display())]
    BarTooSmall {
        /// BAR resource file.
        path: PathBuf,
        /// Actual size in bytes.
        len: usize,
        /// Required size in bytes.
        required: usize,
    },

    /// Attempt to write a read-only register.
    #[error("register {0} is read-only")]
    ReadOnlyRegister(Register),

    /// The blocking interrupt wait failed (not a timeout).
    #[error("interrupt wait failed")]
    Wait(#[source] io::Error),

    /// Interrupt subscription could not be changed.
    #[error("failed to set interrupt mask {bits:#x}")]
    Mask {
        /// Bits being changed.
        bits: u32,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Fault injected or reported by a backend without an OS error.
    #[error("device fault: {0}")]
    Fault(String),
}

impl HwError {
    /// Create a fault error.
    #[must_use]
    pub fn fault(msg: impl Into<String>) -> Self {
        Self::Fault(msg.into())
    }
}

/// A specialized `Result` type for hardware access.
pub type HwResult<T> = Result<T, HwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            HwError::ReadOnlyRegister(Register::Magic).to_string(),
            "register magic is read-only"
        );
        assert_eq!(
            HwError::DeviceNotFound {
                id: "10ee:eb01".into()
            }
            .to_string(),
            "PCI device 10ee:eb01 not found"
        );
        assert_eq!(HwError::fault("bus hang").to_string(), "device fault: bus hang");
    }
}
