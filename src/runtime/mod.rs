//! Core runtime access.
//!
//! `MonoRuntime` owns the resolved export table, the root domain and the
//! image and class caches, and is the single gateway for every call into
//! the managed side. Lookup methods live in `directory`, overload matching
//! in `resolver` and the invocation surface in `invoke`.

mod directory;
mod invoke;
mod resolver;

pub use directory::FieldInfo;
pub use invoke::RawArg;
pub use resolver::MethodSig;

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::exports::ExportSet;
use crate::handles::{AssemblyHandle, ClassHandle, DomainHandle, ImageHandle, ThreadHandle};
use crate::symbols::SymbolSource;

thread_local! {
    // Attach state is per thread, not per runtime instance; a process hosts
    // one managed runtime.
    static ATTACHED: Cell<Option<ThreadHandle>> = Cell::new(None);
}

/// Gateway to a managed runtime already loaded in this process.
pub struct MonoRuntime {
    exports: ExportSet,
    domain: DomainHandle,
    images: RwLock<HashMap<String, ImageHandle>>,
    classes: RwLock<HashMap<String, ClassHandle>>,
    skip_markers: Vec<String>,
}

impl MonoRuntime {
    /// Resolve the export table, grab the root domain, attach the calling
    /// thread and cache every loaded assembly image.
    ///
    /// Fails without leaving any partial state behind: on error there is no
    /// runtime value to query.
    pub fn initialize(source: &dyn SymbolSource, config: &EngineConfig) -> Result<Self> {
        let exports = ExportSet::resolve(source)?;

        let domain = match DomainHandle::from_raw(unsafe { (exports.get_root_domain)() }) {
            Some(domain) => domain,
            None => {
                log::error!("runtime root domain is not available");
                return Err(EngineError::Resolution("runtime root domain".to_string()));
            }
        };

        let runtime = MonoRuntime {
            exports,
            domain,
            images: RwLock::new(HashMap::new()),
            classes: RwLock::new(HashMap::new()),
            skip_markers: config.skip_image_markers.clone(),
        };

        if !runtime.attach_current_thread() {
            return Err(EngineError::ThreadAffinity);
        }

        runtime.cache_images();
        Ok(runtime)
    }

    /// The runtime's root application domain.
    pub fn domain(&self) -> DomainHandle {
        self.domain
    }

    /// Attach the calling thread to the runtime.
    ///
    /// Safe to call redundantly: each thread attaches once and later calls
    /// short-circuit. Returns false when the runtime rejects the attach, in
    /// which case this thread must stay out of the managed side.
    pub fn attach_current_thread(&self) -> bool {
        if ATTACHED.with(|slot| slot.get().is_some()) {
            return true;
        }
        let thread = unsafe { (self.exports.thread_attach)(self.domain.as_ptr()) };
        match ThreadHandle::from_raw(thread) {
            Some(thread) => {
                ATTACHED.with(|slot| slot.set(Some(thread)));
                true
            }
            None => {
                log::error!("thread attach was rejected by the runtime");
                false
            }
        }
    }

    /// Detach the calling thread if it ever attached and the runtime
    /// exports a detach entry point.
    pub fn detach_current_thread(&self) {
        let thread = ATTACHED.with(|slot| slot.take());
        if let (Some(thread), Some(detach)) = (thread, self.exports.thread_detach) {
            unsafe { detach(thread.as_ptr()) };
        }
    }

    /// Enumerate the domain's assemblies and cache their images by name.
    fn cache_images(&self) {
        let mut ctx = AssemblyIterCtx {
            runtime: self,
            cached: 0,
        };
        unsafe {
            (self.exports.domain_assembly_foreach)(
                self.domain.as_ptr(),
                assembly_iter,
                &mut ctx as *mut AssemblyIterCtx as *mut c_void,
            );
        }
        log::info!("cached {} assembly image(s)", ctx.cached);
    }

    fn cache_assembly_image(&self, assembly: AssemblyHandle, cached: &mut usize) {
        let image = match ImageHandle::from_raw(unsafe {
            (self.exports.assembly_get_image)(assembly.as_ptr())
        }) {
            Some(image) => image,
            None => return,
        };

        let name =
            match cstr_to_string(unsafe { (self.exports.image_get_name)(image.as_ptr()) }) {
                Some(name) => name,
                None => return,
            };

        if self
            .skip_markers
            .iter()
            .any(|marker| name.contains(marker.as_str()))
        {
            log::debug!("skipping image {}", name);
            return;
        }

        write_lock(&self.images).insert(name, image);
        *cached += 1;
    }
}

struct AssemblyIterCtx<'a> {
    runtime: &'a MonoRuntime,
    cached: usize,
}

unsafe extern "C" fn assembly_iter(assembly: *mut c_void, user_data: *mut c_void) {
    let ctx = &mut *(user_data as *mut AssemblyIterCtx);
    if let Some(assembly) = AssemblyHandle::from_raw(assembly) {
        ctx.runtime.cache_assembly_image(assembly, &mut ctx.cached);
    }
}

/// Copy a C string owned by the runtime into a host `String`.
pub(crate) fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(ptr) };
    Some(text.to_string_lossy().into_owned())
}

// Cache maps stay usable even after a panicking writer.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
