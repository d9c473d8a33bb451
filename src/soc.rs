//! SoC platform composition
//!
//! [`SocBuilder::realize`] runs the whole bring-up once, single-threaded,
//! in strict dependency order: core clusters, control blocks, interrupt
//! fabric and its alias windows, boot-core resolution, per-core and
//! peripheral line binding, then the extension hooks. Any failure aborts
//! construction; nothing partially constructs.
//!
//! The realized [`SocPlatform`] owns the composed address space; at
//! runtime only the power/reset registers mutate state, everything else
//! is immutable topology.

use crate::config::{cores, extensions, peripherals, reset};
use crate::cpu::{
    ClusterKind, CoreExecutor, CoreId, CoreRegistry, DetachedExecutor,
};
use crate::intc::InterruptFabric;
use crate::irq;
use crate::mmio::{AddressSpace, MmioDevice};
use crate::power::{
    CorePowerController, LoggingSystemController, SystemController, SystemResetController,
};
use crate::{PlatformError, Result};
use core::fmt;
use spin::Mutex;
use std::sync::Arc;

/// Extension-initialization hook
///
/// Runs after all devices are wired, with the built fabric and the fixed
/// number of shared lines the hook may attach to.
pub type ExtensionHook = Box<dyn FnOnce(&mut InterruptFabric, usize)>;

/// Platform builder
///
/// Peripheral internals are external collaborators: the builder takes
/// their register windows and wires base addresses and interrupt lines
/// from the platform tables.
pub struct SocBuilder {
    boot_core: Option<String>,
    nics: Vec<Arc<dyn MmioDevice>>,
    serials: Vec<Arc<dyn MmioDevice>>,
    executor: Arc<dyn CoreExecutor>,
    system: Arc<dyn SystemController>,
    hooks: Vec<ExtensionHook>,
}

impl Default for SocBuilder {
    fn default() -> Self {
        Self {
            boot_core: None,
            nics: Vec::new(),
            serials: Vec::new(),
            executor: Arc::new(DetachedExecutor),
            system: Arc::new(LoggingSystemController),
            hooks: Vec::new(),
        }
    }
}

impl SocBuilder {
    /// Start a builder with platform defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the boot core by name (default `primary-cpu[0]`)
    pub fn boot_core(mut self, name: impl Into<String>) -> Self {
        self.boot_core = Some(name.into());
        self
    }

    /// Add a network controller's register window
    pub fn network(mut self, dev: Arc<dyn MmioDevice>) -> Self {
        self.nics.push(dev);
        self
    }

    /// Add a serial controller's register window
    pub fn serial(mut self, dev: Arc<dyn MmioDevice>) -> Self {
        self.serials.push(dev);
        self
    }

    /// Attach the core execution collaborator
    pub fn executor(mut self, executor: Arc<dyn CoreExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Attach the platform reset collaborator
    pub fn system_controller(mut self, system: Arc<dyn SystemController>) -> Self {
        self.system = system;
        self
    }

    /// Register an extension-initialization hook (the platform has two
    /// hook points)
    pub fn extension_hook(mut self, hook: ExtensionHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Realize the platform
    pub fn realize(self) -> Result<SocPlatform> {
        let boot_name = self
            .boot_core
            .as_deref()
            .unwrap_or(cores::DEFAULT_BOOT_CORE);
        log::info!("realizing platform, boot core '{}'", boot_name);

        if self.nics.len() > peripherals::NIC_BASES.len() {
            return Err(PlatformError::TooMany {
                kind: "network controller",
                given: self.nics.len(),
                max: peripherals::NIC_BASES.len(),
            });
        }
        if self.serials.len() > peripherals::SERIAL_BASES.len() {
            return Err(PlatformError::TooMany {
                kind: "serial controller",
                given: self.serials.len(),
                max: peripherals::SERIAL_BASES.len(),
            });
        }
        if self.hooks.len() > extensions::NUM_HOOKS {
            return Err(PlatformError::TooMany {
                kind: "extension hook",
                given: self.hooks.len(),
                max: extensions::NUM_HOOKS,
            });
        }

        let mut registry = CoreRegistry::new();
        registry.create(ClusterKind::Primary, cores::NUM_PRIMARY)?;
        registry.create(ClusterKind::Secondary, cores::NUM_SECONDARY)?;
        let primary: Vec<CoreId> = registry.cluster(ClusterKind::Primary).collect();
        let registry = Arc::new(Mutex::new(registry));

        let mut space = AddressSpace::new();

        // Control blocks
        space.map(
            "sys-reset-ctrl",
            reset::SYS_CTRL_BASE,
            reset::SYS_CTRL_SIZE,
            Arc::new(SystemResetController::new(self.system.clone())),
        )?;
        space.map(
            "core-reset-ctrl",
            reset::CORE_CTRL_BASE,
            reset::CORE_CTRL_SIZE,
            Arc::new(CorePowerController::new(
                registry.clone(),
                self.executor.clone(),
                primary.clone(),
            )),
        )?;

        // Interrupt fabric and its aliased register windows
        let mut intc = InterruptFabric::new(cores::NUM_PRIMARY);
        intc.map_windows(&mut space)?;

        // Boot resolution scans both clusters; a miss fails the bring-up
        let boot_core = registry.lock().resolve_boot_core(boot_name)?;

        // Per-core wiring: delivery output first, then timer outputs
        for (index, &core) in primary.iter().enumerate() {
            irq::bind_core(&mut intc, index, core);
        }

        // Peripherals at their fixed bases and table lines
        for (index, dev) in self.nics.into_iter().enumerate() {
            space.map(
                format!("nic[{}]", index),
                peripherals::NIC_BASES[index],
                peripherals::NIC_SIZE,
                dev,
            )?;
            irq::bind_network(&mut intc, index);
        }
        for (index, dev) in self.serials.into_iter().enumerate() {
            space.map(
                format!("serial[{}]", index),
                peripherals::SERIAL_BASES[index],
                peripherals::SERIAL_SIZE,
                dev,
            )?;
            irq::bind_serial(&mut intc, index);
        }

        // Add-on components attach to the already-built fabric
        for hook in self.hooks {
            hook(&mut intc, extensions::HOOK_LINE_COUNT);
        }

        log::info!(
            "platform realized: {} cores, {} windows, {} line bindings",
            registry.lock().len(),
            space.window_count(),
            intc.bindings().count()
        );

        Ok(SocPlatform {
            cores: registry,
            boot_core,
            fabric: intc,
            space,
        })
    }
}

/// A realized platform
pub struct SocPlatform {
    cores: Arc<Mutex<CoreRegistry>>,
    boot_core: CoreId,
    fabric: InterruptFabric,
    space: AddressSpace,
}

impl SocPlatform {
    /// The composed global address space (guest access entry point)
    pub fn address_space(&self) -> &AddressSpace {
        &self.space
    }

    /// Shared core registry handle
    pub fn cores(&self) -> &Arc<Mutex<CoreRegistry>> {
        &self.cores
    }

    /// The resolved boot core (lookup-only handle)
    pub fn boot_core(&self) -> CoreId {
        self.boot_core
    }

    /// The interrupt fabric and its binding table
    pub fn fabric(&self) -> &InterruptFabric {
        &self.fabric
    }
}

impl fmt::Debug for SocPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocPlatform")
            .field("boot_core", &self.boot_core)
            .field("windows", &self.space.window_count())
            .field("line_bindings", &self.fabric.bindings().count())
            .finish_non_exhaustive()
    }
}
