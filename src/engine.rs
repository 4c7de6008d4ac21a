//! Engine assembly and lifecycle.
//!
//! `Engine` ties the pieces together: the resolved runtime, the hook
//! registry and the deferred action queue, configured once at
//! initialization. There is no global state; hosts create an engine and
//! pass it around.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::handles::ImageHandle;
use crate::hooks::{HookBackend, HookManager, HookRequest};
use crate::queue::ActionQueue;
use crate::runtime::MonoRuntime;
use crate::symbols::SymbolSource;

pub struct Engine {
    runtime: MonoRuntime,
    hooks: HookManager,
    queue: ActionQueue,
    config: EngineConfig,
}

impl Engine {
    /// Bring the engine up against an already-loaded runtime.
    ///
    /// Resolves the export table, attaches the calling thread, caches the
    /// assembly images and warms the configured classes. Prewarm misses
    /// are logged but do not fail initialization.
    pub fn initialize(
        source: &dyn SymbolSource,
        backend: Box<dyn HookBackend>,
        config: EngineConfig,
    ) -> Result<Self> {
        let runtime = MonoRuntime::initialize(source, &config)?;
        let hooks = HookManager::new(backend, &config);

        if runtime.get_image(&config.root_assembly).is_none() {
            log::warn!("root assembly {} is not loaded yet", config.root_assembly);
        }

        for class in &config.prewarm_classes {
            if runtime
                .get_class(&class.assembly, &class.namespace, &class.class)
                .is_none()
            {
                log::warn!(
                    "prewarm miss: {}.{} in {}",
                    class.namespace,
                    class.class,
                    class.assembly
                );
            }
        }

        log::info!("engine initialized against {}", config.runtime_module);
        Ok(Engine {
            runtime,
            hooks,
            queue: ActionQueue::new(),
            config,
        })
    }

    pub fn runtime(&self) -> &MonoRuntime {
        &self.runtime
    }

    pub fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookManager {
        &mut self.hooks
    }

    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The image of the configured root assembly.
    pub fn root_image(&self) -> Option<ImageHandle> {
        self.runtime.get_image(&self.config.root_assembly)
    }

    /// Install every hook in `requests`, stopping at the first failure.
    /// Hooks installed before the failure stay installed.
    pub fn register_hooks(&mut self, requests: &[HookRequest<'_>]) -> Result<()> {
        self.hooks.register_all(&self.runtime, requests)
    }

    /// Enable every registered hook. Returns how many enabled.
    pub fn enable_hooks(&mut self) -> usize {
        self.hooks.enable_all()
    }

    /// Disable every registered hook. Returns how many disabled.
    pub fn disable_hooks(&mut self) -> usize {
        self.hooks.disable_all()
    }

    /// Queue an action for the next pump. Callable from any thread,
    /// including detour bodies.
    pub fn enqueue<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.enqueue(action);
    }

    /// Drain the action queue on the calling thread. The thread is
    /// attached first so actions may call into the managed side.
    pub fn pump(&self) -> usize {
        if !self.runtime.attach_current_thread() {
            return 0;
        }
        self.queue.pump()
    }

    /// Tear the engine down: disable and remove every hook, then detach
    /// the calling thread.
    pub fn shutdown(mut self) {
        let disabled = self.hooks.disable_all();
        let removed = self.hooks.remove_all();
        log::info!("shutdown: {} hook(s) disabled, {} removed", disabled, removed);
        self.runtime.detach_current_thread();
    }
}

#[cfg(target_os = "windows")]
#[cfg(target_arch = "x86_64")]
impl Engine {
    /// Initialize against the runtime module loaded in this process,
    /// using the MinHook backend.
    pub fn attach(config: EngineConfig) -> Result<Self> {
        use crate::error::EngineError;
        use crate::hooks::MinHookBackend;
        use crate::symbols::ModuleSymbols;

        let source = ModuleSymbols::open(&config.runtime_module).ok_or_else(|| {
            EngineError::Resolution(format!("module {} is not loaded", config.runtime_module))
        })?;
        let backend = MinHookBackend::initialize()
            .map_err(|reason| EngineError::Resolution(reason))?;
        Engine::initialize(&source, Box::new(backend), config)
    }
}
