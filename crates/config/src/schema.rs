//! Config schema types (runtime, capabilities, plugins).

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Default prefix for command-style triggers.
pub const DEFAULT_COMMAND_PREFIX: &str = "!";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaiarConfig {
    pub runtime: RuntimeConfig,
    pub capabilities: CapabilitiesConfig,
    /// Per-plugin settings keyed by plugin id.
    pub plugins: BTreeMap<String, PluginConfig>,
}

impl MaiarConfig {
    /// Settings for `plugin_id`, or defaults when the plugin has no section.
    pub fn plugin(&self, plugin_id: &str) -> PluginConfig {
        self.plugins.get(plugin_id).cloned().unwrap_or_default()
    }
}

/// Runtime behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Abort startup when a plugin fails to initialize. When false the plugin
    /// is logged and skipped. Defaults to true.
    pub abort_on_plugin_failure: bool,
    /// Delay before a plugin's informational startup notice is logged.
    /// Defaults to 3000.
    pub startup_notice_delay_ms: u64,
    /// Attempts made to get schema-conforming JSON out of a model.
    /// Defaults to 3.
    pub structured_output_attempts: u32,
    /// Extra directory of shared prompt templates, registered under the
    /// `runtime/` namespace.
    pub prompts_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            abort_on_plugin_failure: true,
            startup_notice_delay_ms: 3_000,
            structured_output_attempts: 3,
            prompts_dir: None,
        }
    }
}

impl RuntimeConfig {
    pub fn startup_notice_delay(&self) -> Duration {
        Duration::from_millis(self.startup_notice_delay_ms)
    }
}

/// Capability resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitiesConfig {
    /// capability id -> default model id, applied when the runtime starts.
    pub defaults: BTreeMap<String, String>,
}

/// Settings for a single plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Whether the runtime should start this plugin. Defaults to true.
    pub enabled: bool,
    /// Prefix for command-style triggers. Defaults to "!".
    pub command_prefix: Option<String>,
    /// Overrides the plugin's bundled prompt directory.
    pub prompts_dir: Option<PathBuf>,
    /// Free-form settings handed to the plugin's trigger factories.
    pub settings: serde_json::Value,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command_prefix: None,
            prompts_dir: None,
            settings: serde_json::Value::Null,
        }
    }
}

impl PluginConfig {
    pub fn command_prefix(&self) -> &str {
        self.command_prefix
            .as_deref()
            .unwrap_or(DEFAULT_COMMAND_PREFIX)
    }
}
