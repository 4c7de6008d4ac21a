//! Symbol sources for locating runtime exports.
//!
//! Export resolution goes through the `SymbolSource` seam so the rest of the
//! engine never cares whether symbols come from a loaded module's export
//! directory or from a table the embedder filled in by hand.

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::NonNull;

/// Where the engine looks up the runtime's exported C symbols.
pub trait SymbolSource {
    /// Resolve one exported symbol to its address in this process.
    fn resolve(&self, name: &str) -> Option<NonNull<c_void>>;
}

#[derive(Debug, Clone, Copy)]
struct SymbolAddress(NonNull<c_void>);

// Safety: stored addresses point at code or statics that outlive the engine;
// which thread reads them does not matter.
unsafe impl Send for SymbolAddress {}
unsafe impl Sync for SymbolAddress {}

/// Map-backed symbol source.
///
/// Used by embedders that already resolved the runtime's symbols by other
/// means, and by tests standing in a synthetic runtime.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, SymbolAddress>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            entries: HashMap::new(),
        }
    }

    /// Register a symbol. Null addresses are ignored, so a table can be
    /// built straight from nullable lookup results.
    pub fn insert(&mut self, name: impl Into<String>, address: *const c_void) {
        if let Some(address) = NonNull::new(address as *mut c_void) {
            self.entries.insert(name.into(), SymbolAddress(address));
        }
    }

    /// Drop a symbol, for building tables with deliberate gaps.
    pub fn remove(&mut self, name: &str) {
        self.entries.remove(name);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SymbolSource for SymbolTable {
    fn resolve(&self, name: &str) -> Option<NonNull<c_void>> {
        self.entries.get(name).map(|address| address.0)
    }
}

/// Symbol source backed by a module already loaded into this process.
///
/// Walks the module's PE export directory the same way `GetProcAddress`
/// does, but through a read-only view that never takes the loader lock.
#[cfg(target_os = "windows")]
pub struct ModuleSymbols {
    base: NonNull<u8>,
}

// Safety: the base address refers to a module that stays loaded for the
// engine's whole lifetime; the view built from it is read-only.
#[cfg(target_os = "windows")]
unsafe impl Send for ModuleSymbols {}
#[cfg(target_os = "windows")]
unsafe impl Sync for ModuleSymbols {}

#[cfg(target_os = "windows")]
impl ModuleSymbols {
    /// Find a loaded module by name.
    pub fn open(module_name: &str) -> Option<Self> {
        use winapi::um::libloaderapi::GetModuleHandleA;

        let c_name = std::ffi::CString::new(module_name).ok()?;
        let module = unsafe { GetModuleHandleA(c_name.as_ptr()) };
        NonNull::new(module as *mut u8).map(|base| ModuleSymbols { base })
    }

    /// Base address of the module.
    pub fn base(&self) -> *const u8 {
        self.base.as_ptr()
    }
}

#[cfg(target_os = "windows")]
impl SymbolSource for ModuleSymbols {
    fn resolve(&self, name: &str) -> Option<NonNull<c_void>> {
        use pelite::pe64::exports::Export;
        use pelite::pe64::{Pe, PeView};

        let view = unsafe { PeView::module(self.base.as_ptr()) };
        let by = view.exports().ok()?.by().ok()?;
        match by.name(name) {
            Ok(Export::Symbol(&rva)) => {
                let address = unsafe { self.base.as_ptr().add(rva as usize) };
                NonNull::new(address as *mut u8 as *mut c_void)
            }
            // Forwarded exports never happen for the runtimes we target.
            _ => None,
        }
    }
}
