//! Prelude module for common hardware access types.

pub use crate::access::{DevicePlatform, InterruptWait, RegisterAccess, WaitOutcome};
pub use crate::error::{HwError, HwResult};
pub use crate::registers::{ControlWord, DEVICE_MAGIC, GENERATOR_IRQ_BIT, Register};
