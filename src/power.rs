//! Power/reset control registers
//!
//! Two guest-visible control blocks:
//!
//! - the clock/reset-control block, whose register at `0x104` reports and
//!   drives the primary cluster's per-core power state. Reads pack one
//!   bit-pair per core (power-off bit plus a companion bit 10 positions
//!   up; both always mirror the same state). Writes with a core's
//!   hold-in-reset bit *clear* release that core: its execution state is
//!   reset, it transitions to `Running` and its halted flag is cleared.
//!   Writes are idempotent per core and the whole register is one atomic
//!   unit.
//! - the reset/power block, whose register at `0x218` accepts a system
//!   reset request on bit 4.
//!
//! All other offsets in both blocks read 0 and ignore writes; this is
//! platform-defined behavior, not a gap. Every handler runs synchronously
//! under the controller's lock, so a read never observes a core between
//! `PoweredOff` and `Running`.

use crate::config::reset::{COMPANION_SHIFT, CORE_RESET_OFFSET, RESET_CTRL_OFFSET};
use crate::cpu::{CoreExecutor, CoreId, CoreRegistry, PowerState};
use crate::mmio::MmioDevice;
use bitflags::bitflags;
use spin::Mutex;
use std::sync::Arc;

bitflags! {
    /// Reset/power block: reset-request register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResetCtrl: u32 {
        /// Request a full-platform reset (write-only trigger)
        const SYSTEM_RESET = 1 << 4;
    }
}

/// Collaborator seam for whole-platform control
pub trait SystemController: Send + Sync {
    /// A guest requested a full-platform reset
    fn request_reset(&self);
}

/// Default system controller used when the simulator has not attached one
pub struct LoggingSystemController;

impl SystemController for LoggingSystemController {
    fn request_reset(&self) {
        log::info!("system reset requested");
    }
}

/// Clock/reset-control block: per-core power state machine
///
/// Shares the core registry with the platform under one lock; that lock
/// is the exclusive-access domain serializing every register read and
/// write against concurrent accesses from other execution contexts.
pub struct CorePowerController {
    cores: Arc<Mutex<CoreRegistry>>,
    executor: Arc<dyn CoreExecutor>,
    /// Cores covered by the register, bit position = table position
    covered: Vec<CoreId>,
}

impl CorePowerController {
    /// Create the controller over the cores covered by the register
    ///
    /// `covered` maps register bit positions to cores; for this platform
    /// generation that is the primary cluster in declaration order.
    pub fn new(
        cores: Arc<Mutex<CoreRegistry>>,
        executor: Arc<dyn CoreExecutor>,
        covered: Vec<CoreId>,
    ) -> Self {
        Self {
            cores,
            executor,
            covered,
        }
    }

    fn read_power_word(&self) -> u64 {
        let cores = self.cores.lock();
        let mut value = 0u64;
        for (bit, &id) in self.covered.iter().enumerate() {
            if cores.core(id).power.is_powered_off() {
                value |= 1 << bit;
                value |= 1 << (bit as u32 + COMPANION_SHIFT);
            }
        }
        value
    }

    fn write_power_word(&self, value: u64) {
        let mut cores = self.cores.lock();
        for (bit, &id) in self.covered.iter().enumerate() {
            // Bit set means "hold in reset": nothing to do
            if value & (1 << bit) != 0 {
                continue;
            }
            let core = cores.core_mut(id);
            if core.power.is_powered_off() {
                log::info!("releasing core '{}' from reset", core.name);
                self.executor.reset_core(id);
                core.power = PowerState::Running;
                core.halted = false;
                self.executor.set_halted(id, false);
            }
        }
    }
}

impl MmioDevice for CorePowerController {
    fn name(&self) -> &str {
        "core-reset-ctrl"
    }

    fn read(&self, offset: u64, _size: u32) -> u64 {
        match offset {
            CORE_RESET_OFFSET => self.read_power_word(),
            _ => 0,
        }
    }

    fn write(&self, offset: u64, value: u64, _size: u32) {
        match offset {
            CORE_RESET_OFFSET => self.write_power_word(value),
            _ => {}
        }
    }
}

/// Reset/power block: system reset request register
pub struct SystemResetController {
    controller: Arc<dyn SystemController>,
}

impl SystemResetController {
    /// Create the block over the platform reset seam
    pub fn new(controller: Arc<dyn SystemController>) -> Self {
        Self { controller }
    }
}

impl MmioDevice for SystemResetController {
    fn name(&self) -> &str {
        "sys-reset-ctrl"
    }

    fn read(&self, _offset: u64, _size: u32) -> u64 {
        0
    }

    fn write(&self, offset: u64, value: u64, _size: u32) {
        match offset {
            RESET_CTRL_OFFSET => {
                let ctrl = ResetCtrl::from_bits_truncate(value as u32);
                if ctrl.contains(ResetCtrl::SYSTEM_RESET) {
                    self.controller.request_reset();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::ClusterKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingExecutor {
        resets: Mutex<Vec<CoreId>>,
        halt_clears: Mutex<Vec<CoreId>>,
    }

    impl CoreExecutor for RecordingExecutor {
        fn reset_core(&self, core: CoreId) {
            self.resets.lock().push(core);
        }

        fn set_halted(&self, core: CoreId, halted: bool) {
            if !halted {
                self.halt_clears.lock().push(core);
            }
        }
    }

    #[derive(Default)]
    struct CountingSystem {
        resets: AtomicUsize,
    }

    impl SystemController for CountingSystem {
        fn request_reset(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn controller() -> (
        CorePowerController,
        Arc<Mutex<CoreRegistry>>,
        Arc<RecordingExecutor>,
    ) {
        let mut reg = CoreRegistry::new();
        reg.create(ClusterKind::Primary, 4).unwrap();
        reg.create(ClusterKind::Secondary, 4).unwrap();
        reg.resolve_boot_core("primary-cpu[0]").unwrap();
        let covered: Vec<_> = reg.cluster(ClusterKind::Primary).collect();

        let cores = Arc::new(Mutex::new(reg));
        let executor = Arc::new(RecordingExecutor::default());
        let ctrl = CorePowerController::new(cores.clone(), executor.clone(), covered);
        (ctrl, cores, executor)
    }

    #[test]
    fn test_initial_read_reflects_boot_assignment() {
        let (ctrl, _, _) = controller();
        // Cores 1..3 powered off: bits 1-3 and their companions at +10
        let expect = (0b1110) | (0b1110 << 10);
        assert_eq!(ctrl.read(CORE_RESET_OFFSET, 4), expect);
    }

    #[test]
    fn test_companion_bits_mirror() {
        let (ctrl, _, _) = controller();
        let word = ctrl.read(CORE_RESET_OFFSET, 4);
        let low = word & 0xf;
        let high = (word >> COMPANION_SHIFT) & 0xf;
        assert_eq!(low, high);
    }

    #[test]
    fn test_release_core_from_reset() {
        let (ctrl, cores, executor) = controller();

        // Clear core 2's hold bit, keep the others held
        ctrl.write(CORE_RESET_OFFSET, !(1u64 << 2) & 0xf, 4);

        {
            let cores = cores.lock();
            let core = cores.core(CoreId(2));
            assert!(core.power.is_running());
            assert!(!core.halted);
            // Untouched cores stay down
            assert!(cores.core(CoreId(1)).power.is_powered_off());
        }
        assert_eq!(*executor.resets.lock(), [CoreId(2)]);
        assert_eq!(*executor.halt_clears.lock(), [CoreId(2)]);

        let word = ctrl.read(CORE_RESET_OFFSET, 4);
        assert_eq!(word, (0b1010) | (0b1010 << 10));
    }

    #[test]
    fn test_release_is_idempotent() {
        let (ctrl, _, executor) = controller();

        let value = !(1u64 << 1) & 0xf;
        ctrl.write(CORE_RESET_OFFSET, value, 4);
        ctrl.write(CORE_RESET_OFFSET, value, 4);
        ctrl.write(CORE_RESET_OFFSET, value, 4);

        // Only the first write that actually powered the core on acted
        assert_eq!(*executor.resets.lock(), [CoreId(1)]);
    }

    #[test]
    fn test_release_all_cores_at_once() {
        let (ctrl, cores, executor) = controller();
        ctrl.write(CORE_RESET_OFFSET, 0, 4);

        // Registry lock must be released before the register read below
        // goes through the controller again.
        {
            let cores = cores.lock();
            for i in 0..4 {
                assert!(cores.core(CoreId(i)).power.is_running());
            }
        }
        // Boot core was already running: 3 resets, not 4
        assert_eq!(executor.resets.lock().len(), 3);
        assert_eq!(ctrl.read(CORE_RESET_OFFSET, 4), 0);
    }

    #[test]
    fn test_boot_core_bit_never_set() {
        let (ctrl, _, _) = controller();
        let word = ctrl.read(CORE_RESET_OFFSET, 4);
        assert_eq!(word & 1, 0);
        assert_eq!(word & (1 << COMPANION_SHIFT), 0);
    }

    #[test]
    fn test_other_offsets_are_total_noops() {
        let (ctrl, cores, executor) = controller();
        assert_eq!(ctrl.read(0x0, 4), 0);
        assert_eq!(ctrl.read(0x100, 4), 0);
        ctrl.write(0x100, 0, 4);
        ctrl.write(0x10c, 0xffff_ffff, 4);

        assert!(executor.resets.lock().is_empty());
        assert!(cores.lock().core(CoreId(1)).power.is_powered_off());
    }

    #[test]
    fn test_system_reset_request() {
        let system = Arc::new(CountingSystem::default());
        let ctrl = SystemResetController::new(system.clone());

        // Bit 4 triggers exactly one request, other bits ignored
        ctrl.write(RESET_CTRL_OFFSET, 0x10, 4);
        assert_eq!(system.resets.load(Ordering::SeqCst), 1);
        ctrl.write(RESET_CTRL_OFFSET, 0xffff_ffef, 4);
        assert_eq!(system.resets.load(Ordering::SeqCst), 1);
        ctrl.write(RESET_CTRL_OFFSET, 0xdead_0010, 4);
        assert_eq!(system.resets.load(Ordering::SeqCst), 2);

        // Other offsets do nothing
        ctrl.write(0x200, 0x10, 4);
        assert_eq!(system.resets.load(Ordering::SeqCst), 2);
        assert_eq!(ctrl.read(RESET_CTRL_OFFSET, 4), 0);
    }
}
