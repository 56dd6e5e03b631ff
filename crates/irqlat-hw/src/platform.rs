//! Hardware backend: PCI register BAR plus UIO interrupt line.

use crate::access::{DevicePlatform, RegisterAccess, check_writable};
use crate::error::HwResult;
use crate::pci::{self, PciBar, PciId, SYSFS_PCI_DEVICES};
use crate::registers::{REGISTER_BASE, Register};
use crate::uio::{DEFAULT_UIO_DEVICE, UioInterrupts};
use std::path::PathBuf;
use tracing::info;

/// BAR holding the generator registers.
pub const DEFAULT_REGISTER_BAR: u8 = 1;

/// Bytes of the BAR the register block occupies.
pub const REGISTER_BLOCK_END: usize = REGISTER_BASE + 0x20;

/// Where to find the generator on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciUioConfig {
    /// PCI identity of the card.
    pub pci_id: PciId,
    /// BAR index of the register block.
    pub bar: u8,
    /// UIO node delivering the card's interrupts.
    pub uio_device: PathBuf,
    /// Root of the sysfs PCI device tree.
    pub sysfs_root: PathBuf,
    /// Enable interrupt forwarding in the bridge (BAR0) before subscribing.
    pub enable_bridge: bool,
}

impl Default for PciUioConfig {
    fn default() -> Self {
        Self {
            pci_id: PciId::GENERATOR,
            bar: DEFAULT_REGISTER_BAR,
            uio_device: PathBuf::from(DEFAULT_UIO_DEVICE),
            sysfs_root: PathBuf::from(SYSFS_PCI_DEVICES),
            enable_bridge: true,
        }
    }
}

/// Generator on a PCI card with its interrupt exposed through UIO.
#[derive(Debug, Clone)]
pub struct PciUioPlatform {
    config: PciUioConfig,
    device_dir: Option<PathBuf>,
}

impl PciUioPlatform {
    /// Create a platform; nothing is touched until a handle is opened.
    #[must_use]
    pub fn new(config: PciUioConfig) -> Self {
        Self {
            config,
            device_dir: None,
        }
    }

    /// Backend configuration.
    #[must_use]
    pub fn config(&self) -> &PciUioConfig {
        &self.config
    }

    fn device_dir(&mut self) -> HwResult<PathBuf> {
        if let Some(dir) = &self.device_dir {
            return Ok(dir.clone());
        }
        let dir = pci::find_device(&self.config.sysfs_root, self.config.pci_id)?;
        info!(pci_id = %self.config.pci_id, path = %dir.display(), "generator found");
        self.device_dir = Some(dir.clone());
        Ok(dir)
    }
}

impl DevicePlatform for PciUioPlatform {
    type Registers = PciRegisters;
    type Interrupts = UioInterrupts;

    fn name(&self) -> &'static str {
        "pci-uio"
    }

    fn enable_interrupt_forwarding(&mut self) -> HwResult<()> {
        if !self.config.enable_bridge {
            return Ok(());
        }
        let dir = self.device_dir()?;
        pci::enable_bridge_interrupts(&dir)
    }

    fn open_interrupts(&mut self) -> HwResult<UioInterrupts> {
        UioInterrupts::open(&self.config.uio_device)
    }

    fn open_registers(&mut self) -> HwResult<PciRegisters> {
        let bar = self.config.bar;
        let dir = self.device_dir()?;
        PciRegisters::new(PciBar::open(&dir, bar)?)
    }
}

/// Generator registers inside a mapped BAR.
#[derive(Debug)]
pub struct PciRegisters {
    bar: PciBar,
}

impl PciRegisters {
    /// Wrap a mapped BAR.
    ///
    /// # Errors
    ///
    /// [`HwError::BarTooSmall`](crate::HwError::BarTooSmall) if the BAR does
    /// not cover the register block.
    pub fn new(bar: PciBar) -> HwResult<Self> {
        bar.require(REGISTER_BLOCK_END)?;
        Ok(Self { bar })
    }
}

impl RegisterAccess for PciRegisters {
    fn read(&mut self, reg: Register) -> HwResult<u32> {
        self.bar.read32(reg.bar_offset())
    }

    fn write(&mut self, reg: Register, value: u32) -> HwResult<()> {
        check_writable(reg)?;
        self.bar.write32(reg.bar_offset(), value)
    }
}
