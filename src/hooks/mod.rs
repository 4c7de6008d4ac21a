//! Function hook management.
//!
//! Hooks are declared as `HookRequest` entries and processed by one driver
//! loop: resolve the managed method to its native entry point, install a
//! disabled hook through the backend (with a bounded retry budget, since
//! the patcher can transiently refuse while the target is mid-jit), then
//! record it. Enable and teardown walk the records as batches.

mod backend;

pub use backend::HookBackend;
#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
pub use backend::MinHookBackend;

use std::ffi::c_void;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::thread;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::handles::FnAddr;
use crate::runtime::{MethodSig, MonoRuntime};

/// One hook declaration.
///
/// `param_count` feeds the runtime's name-plus-arity lookup when no
/// `signature` is given; with a `signature` the overload is matched exactly
/// and the arity comes from the signature's parameter list. On success the
/// trampoline is stored through `original`, which is how a detour reaches
/// the code it displaced.
pub struct HookRequest<'a> {
    pub assembly: &'a str,
    pub namespace: &'a str,
    pub class: &'a str,
    pub method: &'a str,
    pub param_count: i32,
    pub signature: Option<MethodSig<'a>>,
    pub detour: FnAddr,
    pub original: Option<&'a AtomicPtr<c_void>>,
}

impl HookRequest<'_> {
    /// Registry key and log identity for this hook.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.namespace, self.class, self.method)
    }
}

/// A successfully created hook.
#[derive(Debug, Clone)]
pub struct HookRecord {
    name: String,
    target: FnAddr,
    detour: FnAddr,
    original: FnAddr,
    enabled: bool,
}

impl HookRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> FnAddr {
        self.target
    }

    pub fn detour(&self) -> FnAddr {
        self.detour
    }

    /// Trampoline to the displaced original code.
    pub fn original(&self) -> FnAddr {
        self.original
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Owns the hook registry and the backend that patches code.
///
/// Records keep their insertion order: enable walks them forward, disable
/// and remove walk them in reverse.
pub struct HookManager {
    backend: Box<dyn HookBackend>,
    records: Vec<HookRecord>,
    attempts: u32,
    retry_delay: Duration,
}

impl HookManager {
    pub fn new(backend: Box<dyn HookBackend>, config: &EngineConfig) -> Self {
        HookManager {
            backend,
            records: Vec::new(),
            attempts: config.hook_attempts,
            retry_delay: config.hook_retry_delay(),
        }
    }

    /// Resolve and create one hook, disabled.
    ///
    /// Resolution failure fails immediately. Backend refusals are retried up
    /// to the configured attempt budget with the configured pause between
    /// tries; exhausting the budget fails without leaving a record behind.
    pub fn create_hook(&mut self, vm: &MonoRuntime, request: &HookRequest<'_>) -> Result<FnAddr> {
        let name = request.qualified_name();

        if self.records.iter().any(|record| record.name == name) {
            return Err(EngineError::HookInstall {
                name,
                attempts: 0,
                reason: "hook is already registered".to_string(),
            });
        }

        let target = match vm.native_address(
            request.assembly,
            request.namespace,
            request.class,
            request.method,
            request.param_count,
            request.signature,
        ) {
            Some(target) => target,
            None => {
                log::error!("hook target {} did not resolve", name);
                return Err(EngineError::HookInstall {
                    name,
                    attempts: 0,
                    reason: "target method did not resolve".to_string(),
                });
            }
        };

        let mut last_reason = String::new();
        for attempt in 1..=self.attempts {
            match self.backend.create(target, request.detour) {
                Ok(original) => {
                    log::info!("hook {} created on attempt {}", name, attempt);
                    self.records.push(HookRecord {
                        name,
                        target,
                        detour: request.detour,
                        original,
                        enabled: false,
                    });
                    return Ok(original);
                }
                Err(reason) => {
                    log::debug!("hook {} create attempt {} failed: {}", name, attempt, reason);
                    last_reason = reason;
                    if attempt < self.attempts {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        log::error!(
            "hook {} failed after {} attempt(s): {}",
            name,
            self.attempts,
            last_reason
        );
        Err(EngineError::HookInstall {
            name,
            attempts: self.attempts,
            reason: last_reason,
        })
    }

    /// Process a whole request table.
    ///
    /// Stops at the first request that fails and returns its error; hooks
    /// created by earlier requests stay registered and installed. Each
    /// success stores the trampoline through the request's `original` slot.
    pub fn register_all(&mut self, vm: &MonoRuntime, requests: &[HookRequest<'_>]) -> Result<()> {
        for request in requests {
            let original = self.create_hook(vm, request)?;
            if let Some(slot) = request.original {
                slot.store(original.as_ptr(), Ordering::Release);
            }
        }
        Ok(())
    }

    /// Enable every recorded hook in insertion order. Failures are logged
    /// per entry and do not stop the batch. Returns how many succeeded.
    pub fn enable_all(&mut self) -> usize {
        let mut enabled = 0;
        for record in self.records.iter_mut() {
            match self.backend.enable(record.target) {
                Ok(()) => {
                    record.enabled = true;
                    enabled += 1;
                    log::info!("hook {} enabled", record.name);
                }
                Err(reason) => {
                    log::error!("failed to enable hook {}: {}", record.name, reason);
                }
            }
        }
        enabled
    }

    /// Disable every recorded hook in reverse insertion order. Failures are
    /// logged per entry and do not stop the batch.
    pub fn disable_all(&mut self) -> usize {
        let mut disabled = 0;
        for record in self.records.iter_mut().rev() {
            match self.backend.disable(record.target) {
                Ok(()) => {
                    record.enabled = false;
                    disabled += 1;
                    log::info!("hook {} disabled", record.name);
                }
                Err(reason) => {
                    log::error!("failed to disable hook {}: {}", record.name, reason);
                }
            }
        }
        disabled
    }

    /// Tear down every hook in reverse insertion order and clear the
    /// registry. Failures are logged per entry and do not stop the batch.
    pub fn remove_all(&mut self) -> usize {
        let mut removed = 0;
        for record in self.records.iter().rev() {
            match self.backend.remove(record.target) {
                Ok(()) => {
                    removed += 1;
                    log::info!("hook {} removed", record.name);
                }
                Err(reason) => {
                    log::error!("failed to remove hook {}: {}", record.name, reason);
                }
            }
        }
        self.records.clear();
        removed
    }

    /// Look up a record by qualified name.
    pub fn record(&self, name: &str) -> Option<&HookRecord> {
        self.records.iter().find(|record| record.name == name)
    }

    /// Trampoline for a registered hook.
    pub fn original(&self, name: &str) -> Option<FnAddr> {
        self.record(name).map(HookRecord::original)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
