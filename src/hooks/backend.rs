//! Hook installation backends.
//!
//! The manager drives installs through this trait so the real patching
//! library only has to exist on the targets that support it, and tests can
//! script installer behavior without touching executable memory.

use crate::handles::FnAddr;

/// Low-level function patcher.
///
/// `create` prepares a disabled hook and returns the trampoline that calls
/// the original code. Errors carry the backend's own status text; the
/// manager decides what to do with them.
pub trait HookBackend: Send + Sync {
    fn create(&self, target: FnAddr, detour: FnAddr) -> Result<FnAddr, String>;
    fn enable(&self, target: FnAddr) -> Result<(), String>;
    fn disable(&self, target: FnAddr) -> Result<(), String>;
    fn remove(&self, target: FnAddr) -> Result<(), String>;
}

/// Backend over the MinHook-style patcher.
#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
pub struct MinHookBackend;

#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
impl MinHookBackend {
    /// Initialize the patching library. One backend per process.
    pub fn initialize() -> Result<Self, String> {
        min_hook_rs::initialize().map_err(|error| error.to_string())?;
        Ok(MinHookBackend)
    }
}

#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
impl Drop for MinHookBackend {
    fn drop(&mut self) {
        let _ = min_hook_rs::uninitialize();
    }
}

#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
impl HookBackend for MinHookBackend {
    fn create(&self, target: FnAddr, detour: FnAddr) -> Result<FnAddr, String> {
        let trampoline = min_hook_rs::create_hook(target.as_ptr(), detour.as_ptr())
            .map_err(|error| error.to_string())?;
        FnAddr::from_raw(trampoline).ok_or_else(|| "backend returned a null trampoline".to_string())
    }

    fn enable(&self, target: FnAddr) -> Result<(), String> {
        min_hook_rs::enable_hook(target.as_ptr()).map_err(|error| error.to_string())
    }

    fn disable(&self, target: FnAddr) -> Result<(), String> {
        min_hook_rs::disable_hook(target.as_ptr()).map_err(|error| error.to_string())
    }

    fn remove(&self, target: FnAddr) -> Result<(), String> {
        min_hook_rs::remove_hook(target.as_ptr()).map_err(|error| error.to_string())
    }
}
