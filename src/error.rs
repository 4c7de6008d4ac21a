//! Engine error taxonomy.
//!
//! Recoverable lookup misses stay `Option` at the call site; these variants
//! cover the failures that escalate (initialization, hook registration) and
//! configuration parsing.

use thiserror::Error;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A required runtime export was not present in the module's export
    /// table. Always fatal to initialization.
    #[error("required runtime export `{0}` is missing")]
    MissingExport(&'static str),

    /// Something other than an export failed to resolve (module, root
    /// domain, assembly).
    #[error("failed to resolve {0}")]
    Resolution(String),

    /// Hook installation failed, either because the target never resolved
    /// (`attempts` is 0) or because the backend kept rejecting the install
    /// until the retry budget ran out.
    #[error("hook {name} failed after {attempts} attempt(s): {reason}")]
    HookInstall {
        name: String,
        attempts: u32,
        reason: String,
    },

    /// The current thread could not attach to the runtime.
    #[error("current thread could not attach to the runtime")]
    ThreadAffinity,

    /// Configuration could not be parsed or serialized.
    #[error("invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}
