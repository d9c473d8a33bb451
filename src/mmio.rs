//! Memory-mapped I/O plumbing
//!
//! [`MmioDevice`] is the register-window interface every control block and
//! peripheral presents; [`AddressSpace`] places those windows into the one
//! flat guest-physical address space.
//!
//! Register access through this layer is total: offsets a device does not
//! implement read as zero and swallow writes, and unmapped addresses do
//! the same at the address-space level. Devices therefore never return
//! errors at runtime; all failure modes are construction-time.

use crate::{PlatformError, Result};
use std::sync::Arc;

/// A memory-mapped register block
///
/// Handlers take `&self`; devices guard their state internally so one
/// instance can back several windows (alias windows register the same
/// handler at a second base and thereby observe the same state).
pub trait MmioDevice: Send + Sync {
    /// Device name, used in window bookkeeping and logs
    fn name(&self) -> &str;

    /// Read `size` bytes at `offset` into the low bits of the result
    fn read(&self, offset: u64, size: u32) -> u64;

    /// Write the low `size` bytes of `value` at `offset`
    fn write(&self, offset: u64, value: u64, size: u32);
}

/// One placement of a device in the global address space
pub struct MemoryWindow {
    /// Window name (aliases get their own name, same handler)
    pub name: String,
    /// Guest-physical base address
    pub base: u64,
    /// Window size in bytes
    pub size: u64,
    /// Backing device; aliases share the origin's handler
    pub handler: Arc<dyn MmioDevice>,
}

impl MemoryWindow {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.base + self.size
    }

    fn overlaps(&self, base: u64, size: u64) -> bool {
        base < self.base + self.size && self.base < base + size
    }
}

/// The flat global address space
///
/// Owns placement and conflict-freedom only; append-only during platform
/// construction and immutable in topology afterwards.
#[derive(Default)]
pub struct AddressSpace {
    windows: Vec<MemoryWindow>,
}

impl AddressSpace {
    /// Create an empty address space
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a device window at a fixed base address
    ///
    /// Rejects any overlap with an existing window; mapping the same
    /// handler again at a different base creates an alias view.
    pub fn map(
        &mut self,
        name: impl Into<String>,
        base: u64,
        size: u64,
        handler: Arc<dyn MmioDevice>,
    ) -> Result<()> {
        let name = name.into();
        if let Some(other) = self.windows.iter().find(|w| w.overlaps(base, size)) {
            return Err(PlatformError::WindowOverlap {
                name,
                base,
                size,
                other: other.name.clone(),
            });
        }

        log::debug!("mapped '{}' at {:#x}+{:#x}", name, base, size);
        self.windows.push(MemoryWindow {
            name,
            base,
            size,
            handler,
        });
        Ok(())
    }

    /// Find the window covering an address
    pub fn window_at(&self, addr: u64) -> Option<&MemoryWindow> {
        self.windows.iter().find(|w| w.contains(addr))
    }

    /// Number of mapped windows (aliases included)
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Guest read at a physical address
    pub fn read(&self, addr: u64, size: u32) -> u64 {
        match self.window_at(addr) {
            Some(w) => w.handler.read(addr - w.base, size),
            None => {
                log::debug!("read from unmapped address {:#x}", addr);
                0
            }
        }
    }

    /// Guest write at a physical address
    pub fn write(&self, addr: u64, value: u64, size: u32) {
        match self.window_at(addr) {
            Some(w) => w.handler.write(addr - w.base, value, size),
            None => log::debug!("write {:#x} to unmapped address {:#x}", value, addr),
        }
    }
}
