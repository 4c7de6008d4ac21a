//! In-process introspection and interception for embedded Mono-style
//! runtimes.
//!
//! The crate is loaded into a process that already hosts the managed
//! runtime. [`Engine`] resolves the runtime's C export table, caches
//! images and classes, invokes managed methods across thread-attach
//! boundaries, proxies managed lists, installs native hooks over JIT
//! compiled methods and defers cross-thread work onto an explicit pump.

pub mod config;
pub mod engine;
pub mod error;
pub mod exports;
pub mod handles;
pub mod hooks;
pub mod list;
pub mod queue;
pub mod runtime;
pub mod symbols;


pub use config::{EngineConfig, PrewarmClass};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use handles::{
    ArrayHandle, AssemblyHandle, ClassHandle, DomainHandle, FieldHandle, FnAddr, ImageHandle,
    MethodHandle, ObjectHandle, PropertyHandle, SignatureHandle, StringHandle, ThreadHandle,
    TypeHandle, VTableHandle,
};
pub use hooks::{HookBackend, HookManager, HookRecord, HookRequest};
pub use list::ManagedList;
pub use queue::ActionQueue;
pub use runtime::{FieldInfo, MethodSig, MonoRuntime, RawArg};
pub use symbols::{SymbolSource, SymbolTable};

#[cfg(target_os = "windows")]
pub use symbols::ModuleSymbols;

#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
pub use hooks::MinHookBackend;
