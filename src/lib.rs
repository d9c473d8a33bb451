//! MPSoC platform model
//!
//! This crate composes the control plane of a multi-core system-on-chip
//! inside a full-machine simulator: processor-core clusters, an interrupt
//! fabric with aliased register windows, peripheral register windows, and
//! the reset/power-control registers a guest uses to bring secondary cores
//! out of their powered-down state.
//!
//! Instruction execution, device DMA and peripheral internals live outside
//! this crate; they are reached through the [`cpu::CoreExecutor`],
//! [`power::SystemController`] and [`mmio::MmioDevice`] seams.

pub mod config;
pub mod cpu;
pub mod intc;
pub mod irq;
pub mod mmio;
pub mod power;
pub mod soc;

pub use cpu::{ClusterKind, CoreId, CoreRegistry, PowerState};
pub use mmio::{AddressSpace, MmioDevice};
pub use soc::{SocBuilder, SocPlatform};

use thiserror::Error;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Platform construction errors
///
/// Bring-up is all-or-nothing: any of these aborts construction at the
/// caller that initiated it. Once a platform is realized, register access
/// is total and no runtime error path exists.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Requested boot core matches no core in either cluster
    #[error("boot core '{0}' not found")]
    BootCoreNotFound(String),
    /// Core count exceeds the hardware limit for a cluster
    #[error("invalid core count {count} for {cluster} cluster (max {max})")]
    InvalidCoreCount {
        cluster: ClusterKind,
        count: usize,
        max: usize,
    },
    /// A memory window would overlap an already-mapped window
    #[error("window '{name}' at {base:#x}+{size:#x} overlaps '{other}'")]
    WindowOverlap {
        name: String,
        base: u64,
        size: u64,
        other: String,
    },
    /// More devices or hooks supplied than the platform has slots for
    #[error("too many {kind}s: {given} (platform has {max} slots)")]
    TooMany {
        kind: &'static str,
        given: usize,
        max: usize,
    },
}

/// Result type alias
pub type Result<T> = core::result::Result<T, PlatformError>;
