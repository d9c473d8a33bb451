//! Platform layout configuration
//!
//! Fixed addresses, sizes and interrupt-line tables for this platform
//! generation. The layout is a wire-compatibility contract with guest
//! software and must stay bit-exact.

/// Processor-core cluster limits
pub mod cores {
    /// Primary application cores
    pub const NUM_PRIMARY: usize = 4;
    /// Secondary real-time cores
    pub const NUM_SECONDARY: usize = 4;
    /// Boot core when none is requested
    pub const DEFAULT_BOOT_CORE: &str = "primary-cpu[0]";
}

/// Interrupt fabric geometry
pub mod fabric {
    /// Shared (peripheral) interrupt lines
    pub const NUM_SHARED_LINES: usize = 160;
    /// Private lines per core, stacked above the shared lines
    pub const PRIVATE_LINES_PER_CORE: usize = 32;
    /// Private-line slot of the physical timer output
    pub const PHYS_TIMER_SLOT: usize = 30;
    /// Private-line slot of the virtual timer output
    pub const VIRT_TIMER_SLOT: usize = 27;

    /// Fabric base address (also the reset control-base cores see)
    pub const BASE: u64 = 0xf900_0000;
    /// Distributor register window
    pub const DIST_BASE: u64 = 0xf901_0000;
    /// Per-core interface register window
    pub const CPU_BASE: u64 = 0xf902_0000;
    /// Size of each register window and of each alias
    pub const REGION_SIZE: u64 = 0x4000;
    /// Register windows exposed by the controller
    pub const NUM_REGIONS: usize = 2;
    /// Alias windows stacked above each origin window
    pub const NUM_ALIASES: usize = 3;
}

/// Reset and power control blocks
pub mod reset {
    /// Clock/reset-control block base (per-core power register)
    pub const CORE_CTRL_BASE: u64 = 0xfd1a_0000;
    /// Clock/reset-control block size
    pub const CORE_CTRL_SIZE: u64 = 0x110;
    /// Offset of the core reset register inside the block
    pub const CORE_RESET_OFFSET: u64 = 0x104;
    /// Distance between a core's power-off bit and its companion bit
    pub const COMPANION_SHIFT: u32 = 10;

    /// Reset/power block base (system reset request)
    pub const SYS_CTRL_BASE: u64 = 0xff5e_0000;
    /// Reset/power block size
    pub const SYS_CTRL_SIZE: u64 = 0x300;
    /// Offset of the reset-request register inside the block
    pub const RESET_CTRL_OFFSET: u64 = 0x218;
}

/// Peripheral placement and interrupt-line tables
pub mod peripherals {
    /// Network controller register windows
    pub const NIC_BASES: [u64; 4] = [0xff0b_0000, 0xff0c_0000, 0xff0d_0000, 0xff0e_0000];
    /// Network controller shared-line assignments
    pub const NIC_LINES: [usize; 4] = [57, 59, 61, 63];
    /// Peripheral register window size
    pub const NIC_SIZE: u64 = 0x1_0000;

    /// Serial controller register windows
    pub const SERIAL_BASES: [u64; 2] = [0xff00_0000, 0xff01_0000];
    /// Serial controller shared-line assignments
    pub const SERIAL_LINES: [usize; 2] = [21, 22];
    /// Serial register window size
    pub const SERIAL_SIZE: u64 = 0x1_0000;
}

/// Extension hook parameters
pub mod extensions {
    /// Hook points offered to add-on components
    pub const NUM_HOOKS: usize = 2;
    /// Shared lines handed to extension initialization hooks
    pub const HOOK_LINE_COUNT: usize = 128;
}
