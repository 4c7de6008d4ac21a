//! Engine configuration.
//!
//! Collects the knobs that vary per title or per deployment: which module
//! holds the runtime, how patient hook installation should be, and which
//! classes to resolve up front. The struct round-trips as JSON so the host's
//! persistence layer can store it next to its own settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// Module that exports the runtime's C API on Windows builds of the engine's
/// usual targets.
pub const DEFAULT_RUNTIME_MODULE: &str = "mono-2.0-bdwgc.dll";

/// Default number of times a hook install is attempted before giving up.
pub const DEFAULT_HOOK_ATTEMPTS: u32 = 100;

/// Default pause between hook install attempts, in milliseconds.
pub const DEFAULT_HOOK_RETRY_DELAY_MS: u64 = 50;

/// Assembly whose image is treated as the primary lookup target when the
/// caller does not name one.
pub const DEFAULT_ROOT_ASSEMBLY: &str = "Assembly-CSharp";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name of the loaded module that exports the runtime API.
    pub runtime_module: String,
    /// Assembly used for convenience lookups that do not name one.
    pub root_assembly: String,
    /// Images whose name contains any of these markers are left out of the
    /// image cache during initialization.
    pub skip_image_markers: Vec<String>,
    /// Hook install retry budget.
    pub hook_attempts: u32,
    /// Pause between hook install attempts.
    pub hook_retry_delay_ms: u64,
    /// Classes resolved once at the end of initialization so hot paths and
    /// hook callbacks hit a warm cache.
    pub prewarm_classes: Vec<PrewarmClass>,
}

/// One class to resolve during initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrewarmClass {
    pub assembly: String,
    pub namespace: String,
    pub class: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            root_assembly: DEFAULT_ROOT_ASSEMBLY.to_string(),
            skip_image_markers: Vec::new(),
            hook_attempts: DEFAULT_HOOK_ATTEMPTS,
            hook_retry_delay_ms: DEFAULT_HOOK_RETRY_DELAY_MS,
            prewarm_classes: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Retry pause as a `Duration`.
    pub fn hook_retry_delay(&self) -> Duration {
        Duration::from_millis(self.hook_retry_delay_ms)
    }

    /// Parse a configuration from its JSON form.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize the configuration for the host's persistence layer.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
