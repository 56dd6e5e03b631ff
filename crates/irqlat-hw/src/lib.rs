//! # irqlat-hw
//!
//! Access to the periodic interrupt generator whose latency irqlat measures.
//!
//! The generator is a small register block behind a PCI BAR:
//!
//! | Offset | Register          | Access | Meaning                                  |
//! |--------|-------------------|--------|------------------------------------------|
//! | `0x00` | control           | rw     | bit 31 start/stop, bits 23:0 divider     |
//! | `0x08` | toggle            | ro     | debug toggle counter                     |
//! | `0x0c` | magic             | ro     | identity constant `0xBADCAFEE`           |
//! | `0x10` | clock frequency   | ro     | counter frequency in Hz                  |
//! | `0x14` | start time        | ro     | counter value latched at IRQ generation  |
//! | `0x18` | now time          | ro     | live counter value                       |
//! | `0x1c` | count             | ro     | IRQs generated so far                    |
//!
//! Offsets are relative to [`REGISTER_BASE`] within the BAR.
//!
//! This crate provides:
//! - [`RegisterAccess`] / [`InterruptWait`] / [`DevicePlatform`] traits that the
//!   measurement engine is written against
//! - [`ControlWord`], the pure encoding of the control register
//! - `PciUioPlatform` (Linux): sysfs BAR mapping plus `/dev/uioN` interrupts
//! - [`SoftwareTimerPlatform`]: in-process emulation of the generator for
//!   hosts without the hardware
//! - [`ScriptedPlatform`]: deterministic replay double for tests

#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod access;
pub mod error;
pub mod registers;
pub mod scripted;
pub mod software_impl;

#[cfg(target_os = "linux")]
pub mod pci;
#[cfg(target_os = "linux")]
pub mod platform;
#[cfg(target_os = "linux")]
pub mod uio;

pub mod prelude;

pub use access::{DevicePlatform, InterruptWait, RegisterAccess, WaitOutcome};
pub use error::{HwError, HwResult};
pub use registers::{
    ControlWord, DEVICE_MAGIC, DIVIDER_MASK, GENERATOR_IRQ_BIT, REGISTER_BASE, Register,
};
pub use scripted::{FailurePoint, JournalEntry, ScriptedEvent, ScriptedPlatform};
pub use software_impl::SoftwareTimerPlatform;

#[cfg(target_os = "linux")]
pub use pci::PciId;
#[cfg(target_os = "linux")]
pub use platform::{PciUioConfig, PciUioPlatform};
