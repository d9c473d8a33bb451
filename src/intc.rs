//! Interrupt fabric construction
//!
//! One fixed-size interrupt controller aggregates peripheral and timer
//! sources for the whole platform. The controller's internals are an
//! external collaborator; this module owns the connection table (which
//! source feeds which line) and the two register windows the controller
//! exposes, each mirrored by a hardware-defined number of alias windows
//! at successive offsets above the origin.
//!
//! Alias windows are pure views: they register the origin's shared
//! storage at a second base address and never copy state.

use crate::config::fabric::{
    CPU_BASE, DIST_BASE, NUM_ALIASES, NUM_REGIONS, NUM_SHARED_LINES, PRIVATE_LINES_PER_CORE,
    REGION_SIZE,
};
use crate::cpu::CoreId;
use crate::mmio::{AddressSpace, MmioDevice};
use crate::Result;
use spin::Mutex;
use std::sync::Arc;

/// A source wired into one fabric input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    /// Network controller interrupt output, by device index
    Network(usize),
    /// Serial controller interrupt output, by device index
    Serial(usize),
    /// A core's physical-timer output
    PhysTimer(CoreId),
    /// A core's virtual-timer output
    VirtTimer(CoreId),
    /// Add-on component attached through an extension hook
    Extension(&'static str),
}

/// One entry of the compiled-in register-window table
struct FabricRegion {
    region_index: usize,
    base: u64,
    name: &'static str,
}

const FABRIC_REGIONS: [FabricRegion; 2] = [
    FabricRegion {
        region_index: 0,
        base: DIST_BASE,
        name: "fabric-dist",
    },
    FabricRegion {
        region_index: 1,
        base: CPU_BASE,
        name: "fabric-cpu",
    },
];

/// Raw register storage behind one fabric window
///
/// The controller internals that give these registers meaning are outside
/// this crate; the window only has to present one coherent backing store
/// to the origin and every alias.
struct FabricWindow {
    name: &'static str,
    regs: Mutex<Vec<u32>>,
}

impl FabricWindow {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            regs: Mutex::new(vec![0; (REGION_SIZE / 4) as usize]),
        }
    }
}

impl MmioDevice for FabricWindow {
    fn name(&self) -> &str {
        self.name
    }

    fn read(&self, offset: u64, _size: u32) -> u64 {
        let idx = (offset / 4) as usize;
        self.regs.lock().get(idx).copied().unwrap_or(0) as u64
    }

    fn write(&self, offset: u64, value: u64, _size: u32) {
        let idx = (offset / 4) as usize;
        if let Some(reg) = self.regs.lock().get_mut(idx) {
            *reg = value as u32;
        }
    }
}

/// The platform's interrupt distribution fabric
///
/// Holds the permanent source → line connection table and the per-core
/// delivery outputs. Built once during bring-up; bindings never change
/// afterwards.
pub struct InterruptFabric {
    core_count: usize,
    /// Input connection table: shared lines first, then per-core privates
    inputs: Vec<Option<LineSource>>,
    /// Fabric output `i` delivers to this core (output index = core index)
    outputs: Vec<Option<CoreId>>,
    /// Register windows, indexed like the region table
    windows: [Arc<FabricWindow>; NUM_REGIONS],
}

impl InterruptFabric {
    /// Allocate a fabric for a fixed line and core count
    pub fn new(core_count: usize) -> Self {
        let lines = NUM_SHARED_LINES + core_count * PRIVATE_LINES_PER_CORE;
        log::debug!(
            "interrupt fabric: {} shared + {} private lines, {} cores",
            NUM_SHARED_LINES,
            lines - NUM_SHARED_LINES,
            core_count
        );
        Self {
            core_count,
            inputs: vec![None; lines],
            outputs: vec![None; core_count],
            windows: [
                Arc::new(FabricWindow::new(FABRIC_REGIONS[0].name)),
                Arc::new(FabricWindow::new(FABRIC_REGIONS[1].name)),
            ],
        }
    }

    /// Total input line count (shared + private)
    pub fn line_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of shared lines
    pub fn shared_line_count(&self) -> usize {
        NUM_SHARED_LINES
    }

    /// Cores served by this fabric
    pub fn core_count(&self) -> usize {
        self.core_count
    }

    /// Permanently bind a source to an input line
    ///
    /// Double-binding a line is a construction-time logic error in the
    /// platform tables, not a recoverable condition.
    pub fn connect(&mut self, line: usize, source: LineSource) {
        assert!(line < self.inputs.len(), "interrupt line {} out of range", line);
        if let Some(existing) = self.inputs[line] {
            panic!(
                "interrupt line {} already bound to {:?} (new: {:?})",
                line, existing, source
            );
        }
        log::debug!("line {} <- {:?}", line, source);
        self.inputs[line] = Some(source);
    }

    /// Bind fabric output `index` to a core's IRQ input
    pub fn connect_output(&mut self, index: usize, core: CoreId) {
        assert!(index < self.outputs.len(), "fabric output {} out of range", index);
        assert!(
            self.outputs[index].is_none(),
            "fabric output {} already bound",
            index
        );
        self.outputs[index] = Some(core);
    }

    /// Source bound to a line, if any
    pub fn binding(&self, line: usize) -> Option<LineSource> {
        self.inputs.get(line).copied().flatten()
    }

    /// All established bindings, in line order
    pub fn bindings(&self) -> impl Iterator<Item = (usize, LineSource)> + '_ {
        self.inputs
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|s| (i, s)))
    }

    /// Core served by a fabric output
    pub fn output(&self, index: usize) -> Option<CoreId> {
        self.outputs.get(index).copied().flatten()
    }

    /// Place the controller's register windows and their aliases
    ///
    /// Each origin window is followed by `NUM_ALIASES` alias views at
    /// successive `REGION_SIZE` offsets, all backed by the origin's
    /// storage.
    pub fn map_windows(&self, space: &mut AddressSpace) -> Result<()> {
        // Compiled-in table must agree with the controller's region count
        assert_eq!(
            FABRIC_REGIONS.len(),
            NUM_REGIONS,
            "fabric region table disagrees with expected region count"
        );

        for region in &FABRIC_REGIONS {
            let window = self.windows[region.region_index].clone();
            space.map(region.name, region.base, REGION_SIZE, window.clone())?;

            let mut addr = region.base;
            for alias in 0..NUM_ALIASES {
                addr += REGION_SIZE;
                space.map(
                    format!("{}-alias[{}]", region.name, alias),
                    addr,
                    REGION_SIZE,
                    window.clone(),
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_counts() {
        let fabric = InterruptFabric::new(4);
        assert_eq!(fabric.shared_line_count(), 160);
        assert_eq!(fabric.line_count(), 160 + 4 * 32);
    }

    #[test]
    fn test_connect_records_binding() {
        let mut fabric = InterruptFabric::new(4);
        fabric.connect(57, LineSource::Network(0));
        assert_eq!(fabric.binding(57), Some(LineSource::Network(0)));
        assert_eq!(fabric.binding(58), None);
    }

    #[test]
    #[should_panic(expected = "already bound")]
    fn test_double_bind_is_logic_error() {
        let mut fabric = InterruptFabric::new(4);
        fabric.connect(21, LineSource::Serial(0));
        fabric.connect(21, LineSource::Serial(1));
    }

    #[test]
    fn test_window_mapping_with_aliases() {
        let mut space = crate::mmio::AddressSpace::new();
        let fabric = InterruptFabric::new(4);
        fabric.map_windows(&mut space).unwrap();

        // 2 origins + 3 aliases each
        assert_eq!(space.window_count(), 8);

        // A write through the distributor's second alias reads back
        // through the origin and through the other aliases.
        space.write(DIST_BASE + 2 * REGION_SIZE + 0x10, 0x1234_5678, 4);
        assert_eq!(space.read(DIST_BASE + 0x10, 4), 0x1234_5678);
        assert_eq!(space.read(DIST_BASE + REGION_SIZE + 0x10, 4), 0x1234_5678);
        assert_eq!(space.read(DIST_BASE + 3 * REGION_SIZE + 0x10, 4), 0x1234_5678);

        // Distributor and per-core windows have distinct state
        assert_eq!(space.read(CPU_BASE + 0x10, 4), 0);
    }

    #[test]
    fn test_outputs() {
        let mut fabric = InterruptFabric::new(4);
        fabric.connect_output(0, CoreId(0));
        fabric.connect_output(1, CoreId(1));
        assert_eq!(fabric.output(0), Some(CoreId(0)));
        assert_eq!(fabric.output(2), None);
    }
}
