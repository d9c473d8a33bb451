//! Processor-core registry and boot-core resolution
//!
//! The registry owns every core instance for the platform's lifetime.
//! Cores carry a stable name of the form `<cluster>-cpu[<index>]`; the
//! name → handle table is built once at registration time so boot-core
//! resolution is a single lookup returning a typed [`CoreId`].
//!
//! Power-state transitions after bring-up happen only through the
//! power/reset controller (see [`crate::power`]).

use crate::config::cores::{NUM_PRIMARY, NUM_SECONDARY};
use crate::{PlatformError, Result};
use core::fmt;
use std::collections::BTreeMap;

/// Hardware limit across both clusters
pub const MAX_CORES: usize = NUM_PRIMARY + NUM_SECONDARY;

/// Processor-core cluster kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterKind {
    /// Application cores (full instruction set, boot default)
    Primary,
    /// Real-time cores
    Secondary,
}

impl ClusterKind {
    /// Stable name prefix for cores of this cluster
    pub fn prefix(self) -> &'static str {
        match self {
            ClusterKind::Primary => "primary",
            ClusterKind::Secondary => "secondary",
        }
    }

    /// Hardware core limit for this cluster
    pub fn max_cores(self) -> usize {
        match self {
            ClusterKind::Primary => NUM_PRIMARY,
            ClusterKind::Secondary => NUM_SECONDARY,
        }
    }
}

impl fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Per-core power state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Core is executing (or eligible to execute) guest code
    Running,
    /// Core is held powered-down until released through the reset register
    PoweredOff,
}

impl PowerState {
    /// Check if the core is running
    pub fn is_running(self) -> bool {
        matches!(self, PowerState::Running)
    }

    /// Check if the core is powered off
    pub fn is_powered_off(self) -> bool {
        matches!(self, PowerState::PoweredOff)
    }
}

/// Typed handle into the core registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CoreId(pub(crate) usize);

impl CoreId {
    /// Raw registry index
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single processor core
#[derive(Debug, Clone)]
pub struct ProcessorCore {
    /// Cluster this core belongs to
    pub cluster: ClusterKind,
    /// Index within the cluster
    pub index: usize,
    /// Stable name, `<cluster>-cpu[<index>]`
    pub name: String,
    /// Current power state
    pub power: PowerState,
    /// Execution suspended flag, cleared when the core is released
    pub halted: bool,
    /// Set on the single core left running at platform start
    pub boot_core: bool,
}

impl ProcessorCore {
    fn new(cluster: ClusterKind, index: usize) -> Self {
        Self {
            cluster,
            index,
            name: format!("{}-cpu[{}]", cluster.prefix(), index),
            power: PowerState::Running,
            halted: false,
            boot_core: false,
        }
    }
}

/// Registry of every processor core on the platform
///
/// Built once during platform construction; the set of cores never
/// changes afterwards, only their power state does.
pub struct CoreRegistry {
    cores: heapless::Vec<ProcessorCore, MAX_CORES>,
    /// Name lookup, built as cores are registered
    by_name: BTreeMap<String, CoreId>,
}

impl Default for CoreRegistry {
    fn default() -> Self {
        Self {
            cores: heapless::Vec::new(),
            by_name: BTreeMap::new(),
        }
    }
}

impl CoreRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `count` cores of the given cluster, in declaration order
    ///
    /// Counts are cumulative: a later call for the same cluster continues
    /// the numbering, and the cluster's total population is held to the
    /// hardware limit.
    pub fn create(&mut self, cluster: ClusterKind, count: usize) -> Result<()> {
        let existing = self.cluster(cluster).count();
        if existing + count > cluster.max_cores() {
            return Err(PlatformError::InvalidCoreCount {
                cluster,
                count: existing + count,
                max: cluster.max_cores(),
            });
        }

        for index in existing..existing + count {
            let core = ProcessorCore::new(cluster, index);
            let id = CoreId(self.cores.len());
            self.by_name.insert(core.name.clone(), id);
            log::debug!("registered core '{}' ({:?})", core.name, id);
            // Capacity is MAX_CORES and per-cluster counts are checked above
            self.cores
                .push(core)
                .unwrap_or_else(|_| unreachable!("core table over capacity"));
        }

        Ok(())
    }

    /// Look up a core handle by name
    pub fn find(&self, name: &str) -> Option<CoreId> {
        self.by_name.get(name).copied()
    }

    /// Core state by handle
    pub fn core(&self, id: CoreId) -> &ProcessorCore {
        &self.cores[id.0]
    }

    /// Mutable core state by handle
    pub fn core_mut(&mut self, id: CoreId) -> &mut ProcessorCore {
        &mut self.cores[id.0]
    }

    /// Handles of every core of one cluster, in declaration order
    pub fn cluster(&self, cluster: ClusterKind) -> impl Iterator<Item = CoreId> + '_ {
        self.cores
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.cluster == cluster)
            .map(|(i, _)| CoreId(i))
    }

    /// Total number of cores
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// Iterate all cores in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (CoreId, &ProcessorCore)> {
        self.cores.iter().enumerate().map(|(i, c)| (CoreId(i), c))
    }

    /// Resolve the boot core and initialize every other core's power state
    ///
    /// The requested name is matched against both clusters through the
    /// prebuilt lookup table; exactly one core ends up `Running` and
    /// boot-eligible, every other core of this bring-up starts
    /// `PoweredOff` and halted. Fails the whole bring-up when the name
    /// matches nothing.
    pub fn resolve_boot_core(&mut self, requested: &str) -> Result<CoreId> {
        let boot = self
            .find(requested)
            .ok_or_else(|| PlatformError::BootCoreNotFound(requested.into()))?;

        for (id, core) in self.cores.iter_mut().enumerate() {
            if CoreId(id) == boot {
                core.power = PowerState::Running;
                core.halted = false;
                core.boot_core = true;
            } else {
                core.power = PowerState::PoweredOff;
                core.halted = true;
                core.boot_core = false;
            }
        }

        log::info!("boot core resolved: '{}' ({:?})", requested, boot);
        Ok(boot)
    }
}

/// Collaborator seam for core execution state
///
/// The power/reset controller drives these when a guest releases a core
/// from reset; instruction and reset-vector semantics live behind this
/// trait, outside the crate. Implementations must not re-enter the
/// platform's register windows from these callbacks.
pub trait CoreExecutor: Send + Sync {
    /// Reset the core's execution state before it starts running
    fn reset_core(&self, core: CoreId);
    /// Set or clear the core's halted/suspended flag
    fn set_halted(&self, core: CoreId, halted: bool);
}

/// Default executor used when the simulator has not attached one
pub struct DetachedExecutor;

impl CoreExecutor for DetachedExecutor {
    fn reset_core(&self, core: CoreId) {
        log::debug!("detached executor: reset {:?}", core);
    }

    fn set_halted(&self, core: CoreId, halted: bool) {
        log::debug!("detached executor: {:?} halted={}", core, halted);
    }
}
