//! PCI BAR mapping through sysfs.
//!
//! A PCI function is located by its `vendor:device` identity under
//! `/sys/bus/pci/devices`, and one of its `resourceN` files is mapped shared
//! so that 32-bit volatile loads and stores reach the device directly.

#![expect(unsafe_code, reason = "mmap/munmap and volatile MMIO accesses")]

use crate::error::{HwError, HwResult};
use core::fmt;
use core::str::FromStr;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Root of the sysfs PCI device tree.
pub const SYSFS_PCI_DEVICES: &str = "/sys/bus/pci/devices";

/// Offset of the bridge control register in BAR0.
pub const BRIDGE_CONTROL_OFFSET: usize = 0x0;

/// Bridge control bit: global interrupt enable.
pub const BRIDGE_GLOBAL_IRQ_ENABLE: u32 = 1 << 31;

/// Bridge control bit: forward interrupts from the register slave.
pub const BRIDGE_SLAVE_IRQ_ENABLE: u32 = 1 << 9;

/// PCI vendor/device identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PciId {
    /// Vendor id.
    pub vendor: u16,
    /// Device id.
    pub device: u16,
}

impl PciId {
    /// Identity of the generator card.
    pub const GENERATOR: PciId = PciId {
        vendor: 0x10ee,
        device: 0xeb01,
    };
}

impl Default for PciId {
    fn default() -> Self {
        Self::GENERATOR
    }
}

impl fmt::Display for PciId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor, self.device)
    }
}

impl FromStr for PciId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (vendor, device) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("invalid PCI id '{s}', expected vvvv:dddd"))?;
        let parse = |part: &str| {
            u16::from_str_radix(part.trim_start_matches("0x"), 16)
                .map_err(|e| format!("invalid PCI id '{s}': {e}"))
        };
        Ok(Self {
            vendor: parse(vendor)?,
            device: parse(device)?,
        })
    }
}

/// Find the sysfs directory of the first function matching `id` below `root`.
///
/// Entries are visited in name order so the choice is stable across runs.
///
/// # Errors
///
/// [`HwError::Open`] if `root` cannot be listed, [`HwError::DeviceNotFound`]
/// if nothing matches.
pub fn find_device(root: &Path, id: PciId) -> HwResult<PathBuf> {
    let entries = fs::read_dir(root).map_err(|source| HwError::Open {
        path: root.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    dirs.sort();

    dirs.into_iter()
        .find(|dir| {
            read_sysfs_id(&dir.join("vendor")) == Some(id.vendor)
                && read_sysfs_id(&dir.join("device")) == Some(id.device)
        })
        .ok_or_else(|| HwError::DeviceNotFound { id: id.to_string() })
}

fn read_sysfs_id(path: &Path) -> Option<u16> {
    let raw = fs::read_to_string(path).ok()?;
    let raw = raw.trim();
    u16::from_str_radix(raw.strip_prefix("0x").unwrap_or(raw), 16).ok()
}

/// A shared mapping of one PCI BAR.
///
/// The mapping is released on drop.
#[derive(Debug)]
pub struct PciBar {
    base: *mut u8,
    len: usize,
    path: PathBuf,
    _file: File,
}

impl PciBar {
    /// Map `resource{bar}` of the PCI function at `device_dir`.
    ///
    /// # Errors
    ///
    /// See [`PciBar::map`].
    pub fn open(device_dir: &Path, bar: u8) -> HwResult<Self> {
        Self::map(device_dir.join(format!("resource{bar}")))
    }

    /// Map a whole resource file read/write.
    ///
    /// # Errors
    ///
    /// [`HwError::Open`] if the file cannot be opened, [`HwError::BarTooSmall`]
    /// if it is empty, [`HwError::Map`] if `mmap` fails.
    pub fn map(path: PathBuf) -> HwResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&path)
            .map_err(|source| HwError::Open {
                path: path.clone(),
                source,
            })?;

        let len = file
            .metadata()
            .map_err(|source| HwError::Open {
                path: path.clone(),
                source,
            })
            .map(|m| usize::try_from(m.len()).unwrap_or(0))?;
        if len == 0 {
            return Err(HwError::BarTooSmall {
                path,
                len,
                required: 4,
            });
        }

        // SAFETY: fresh mapping chosen by the kernel over a descriptor we own;
        // no existing Rust memory is aliased.
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(HwError::Map {
                path,
                source: io::Error::last_os_error(),
            });
        }

        debug!(path = %path.display(), len, "BAR mapped");
        Ok(Self {
            base: base.cast::<u8>(),
            len,
            path,
            _file: file,
        })
    }

    /// Mapped size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check whether the mapping is empty (never true for a live mapping).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resource file backing the mapping.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fail unless the mapping covers `required` bytes.
    ///
    /// # Errors
    ///
    /// [`HwError::BarTooSmall`].
    pub fn require(&self, required: usize) -> HwResult<()> {
        if self.len < required {
            return Err(HwError::BarTooSmall {
                path: self.path.clone(),
                len: self.len,
                required,
            });
        }
        Ok(())
    }

    fn register_ptr(&self, offset: usize) -> HwResult<*mut u32> {
        let in_bounds = offset
            .checked_add(4)
            .is_some_and(|end| end <= self.len);
        if !in_bounds || offset % 4 != 0 {
            return Err(HwError::fault(format!(
                "offset {offset:#x} is not a 32-bit register inside {} ({} bytes)",
                self.path.display(),
                self.len
            )));
        }
        Ok(self.base.wrapping_add(offset).cast::<u32>())
    }

    /// Volatile 32-bit load at `offset`.
    ///
    /// # Errors
    ///
    /// [`HwError::Fault`] for a misaligned or out-of-range offset.
    pub fn read32(&self, offset: usize) -> HwResult<u32> {
        let ptr = self.register_ptr(offset)?;
        // SAFETY: `ptr` is aligned and inside the live mapping (checked above).
        let value = unsafe { ptr.read_volatile() };
        trace!(offset, value, "BAR read");
        Ok(value)
    }

    /// Volatile 32-bit store at `offset`.
    ///
    /// # Errors
    ///
    /// [`HwError::Fault`] for a misaligned or out-of-range offset.
    pub fn write32(&mut self, offset: usize, value: u32) -> HwResult<()> {
        let ptr = self.register_ptr(offset)?;
        // SAFETY: `ptr` is aligned and inside the live mapping (checked above).
        unsafe { ptr.write_volatile(value) };
        trace!(offset, value, "BAR write");
        Ok(())
    }
}

impl Drop for PciBar {
    fn drop(&mut self) {
        // SAFETY: `base`/`len` describe the mapping created in `map`, which no
        // reference outlives.
        let rc = unsafe { libc::munmap(self.base.cast::<libc::c_void>(), self.len) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            debug!(path = %self.path.display(), error = %err, "munmap failed");
        }
    }
}

/// Turn on interrupt forwarding in the bridge's BAR0 control register.
///
/// The register is read, the global and slave enable bits are OR-ed in, and
/// the result is written back. BAR0 is unmapped again before returning.
///
/// # Errors
///
/// Mapping or access failures of BAR0.
pub fn enable_bridge_interrupts(device_dir: &Path) -> HwResult<()> {
    let mut bar0 = PciBar::open(device_dir, 0)?;
    let control = bar0.read32(BRIDGE_CONTROL_OFFSET)?;
    let enabled = control | BRIDGE_GLOBAL_IRQ_ENABLE | BRIDGE_SLAVE_IRQ_ENABLE;
    bar0.write32(BRIDGE_CONTROL_OFFSET, enabled)?;
    debug!(before = control, after = enabled, "bridge interrupt forwarding enabled");
    Ok(())
}
