//! Interrupt line binding
//!
//! Deterministic, table-driven wiring of interrupt sources into the
//! fabric: peripherals take fixed shared lines from the platform tables,
//! and each core's timer outputs take private per-core lines stacked
//! above the shared range. Per core, the fabric's delivery output is
//! bound first (core index = fabric output index), then the timer
//! outputs.
//!
//! Line uniqueness is enforced by [`InterruptFabric::connect`]; a
//! conflicting table entry fails construction, it is not a runtime
//! condition.

use crate::config::fabric::{
    NUM_SHARED_LINES, PHYS_TIMER_SLOT, PRIVATE_LINES_PER_CORE, VIRT_TIMER_SLOT,
};
use crate::config::peripherals::{NIC_LINES, SERIAL_LINES};
use crate::cpu::CoreId;
use crate::intc::{InterruptFabric, LineSource};

/// Private input line for one slot of one core
pub fn private_line(core_index: usize, slot: usize) -> usize {
    NUM_SHARED_LINES + core_index * PRIVATE_LINES_PER_CORE + slot
}

/// Wire one core to the fabric
///
/// Delivery output first, then the core's physical and virtual timer
/// outputs onto its private lines.
pub fn bind_core(fabric: &mut InterruptFabric, index: usize, core: CoreId) {
    fabric.connect_output(index, core);
    fabric.connect(private_line(index, PHYS_TIMER_SLOT), LineSource::PhysTimer(core));
    fabric.connect(private_line(index, VIRT_TIMER_SLOT), LineSource::VirtTimer(core));
}

/// Wire a network controller's interrupt output to its table line
pub fn bind_network(fabric: &mut InterruptFabric, index: usize) {
    fabric.connect(NIC_LINES[index], LineSource::Network(index));
}

/// Wire a serial controller's interrupt output to its table line
pub fn bind_serial(fabric: &mut InterruptFabric, index: usize) {
    fabric.connect(SERIAL_LINES[index], LineSource::Serial(index));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_private_line_computation() {
        assert_eq!(private_line(0, PHYS_TIMER_SLOT), 190);
        assert_eq!(private_line(0, VIRT_TIMER_SLOT), 187);
        assert_eq!(private_line(1, PHYS_TIMER_SLOT), 222);
        assert_eq!(private_line(3, VIRT_TIMER_SLOT), 160 + 3 * 32 + 27);
    }

    #[test]
    fn test_full_binding_table_is_unique() {
        let mut fabric = InterruptFabric::new(4);
        for i in 0..4 {
            bind_core(&mut fabric, i, CoreId(i));
        }
        for i in 0..NIC_LINES.len() {
            bind_network(&mut fabric, i);
        }
        for i in 0..SERIAL_LINES.len() {
            bind_serial(&mut fabric, i);
        }

        let lines: Vec<usize> = fabric.bindings().map(|(line, _)| line).collect();
        let unique: BTreeSet<usize> = lines.iter().copied().collect();
        assert_eq!(lines.len(), unique.len());
        // 2 timers per core + 4 NICs + 2 serials
        assert_eq!(lines.len(), 4 * 2 + 4 + 2);
    }

    #[test]
    fn test_peripheral_lines_match_tables() {
        let mut fabric = InterruptFabric::new(4);
        bind_network(&mut fabric, 2);
        bind_serial(&mut fabric, 1);
        assert_eq!(fabric.binding(61), Some(LineSource::Network(2)));
        assert_eq!(fabric.binding(22), Some(LineSource::Serial(1)));
    }

    #[test]
    fn test_core_binding_order() {
        let mut fabric = InterruptFabric::new(4);
        bind_core(&mut fabric, 2, CoreId(2));
        assert_eq!(fabric.output(2), Some(CoreId(2)));
        assert_eq!(
            fabric.binding(private_line(2, PHYS_TIMER_SLOT)),
            Some(LineSource::PhysTimer(CoreId(2)))
        );
        assert_eq!(
            fabric.binding(private_line(2, VIRT_TIMER_SLOT)),
            Some(LineSource::VirtTimer(CoreId(2)))
        );
    }
}
