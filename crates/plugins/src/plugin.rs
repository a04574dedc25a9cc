use std::{fmt, path::Path, sync::Arc, time::Duration};

use {async_trait::async_trait, serde::Serialize};

use crate::{
    error::Result,
    executor::Executor,
    runtime_handle::RuntimeHandle,
    trigger::{Trigger, TriggerSettings},
};

/// Lifecycle of a plugin instance.
///
/// `Constructed → Initializing → Running → ShuttingDown → Terminated`, with
/// `Failed` reached when `init` cannot bring the plugin up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Constructed,
    Initializing,
    Running,
    ShuttingDown,
    Terminated,
    Failed,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Constructed => "constructed",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Where a plugin's human-readable description comes from.
#[derive(Debug, Clone)]
pub enum PluginDescription {
    Static(String),
    /// Name of a template rendered as `<pluginId>/<name>`.
    Template(String),
}

impl Default for PluginDescription {
    fn default() -> Self {
        Self::Template("plugin_description".into())
    }
}

/// Everything the runtime hands a plugin when starting it.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub runtime: RuntimeHandle,
    pub trigger_settings: TriggerSettings,
    /// Delay before the plugin's startup notice is emitted.
    pub notice_delay: Duration,
}

impl InitContext {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self {
            runtime,
            trigger_settings: TriggerSettings::default(),
            notice_delay: Duration::from_secs(3),
        }
    }
}

/// Core plugin trait. The runtime constructs, initializes, drives and shuts
/// down plugins through it.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin identifier, e.g. "plugin-discord". Also the template namespace.
    fn id(&self) -> &str;

    /// Human-readable description, computed on demand.
    async fn description(&self) -> Result<String>;

    /// Capabilities that must be registered before this plugin can start.
    fn required_capabilities(&self) -> &[String];

    /// Directory holding the plugin's prompt templates.
    fn prompts_dir(&self) -> Option<&Path>;

    fn state(&self) -> PluginState;

    /// Triggers in registration order. Empty until `init` has run.
    fn triggers(&self) -> &[Arc<dyn Trigger>];

    /// Executors in registration order. Empty until `init` has run.
    fn executors(&self) -> &[Arc<dyn Executor>];

    async fn init(&mut self, context: InitContext) -> Result<()>;

    async fn shutdown(&mut self) -> Result<()>;

    /// First trigger, in registration order, that claims `text`.
    fn match_trigger(&self, text: &str) -> Option<Arc<dyn Trigger>> {
        self.triggers()
            .iter()
            .find(|trigger| trigger.matches(text))
            .cloned()
    }

    fn executor(&self, name: &str) -> Option<Arc<dyn Executor>> {
        self.executors()
            .iter()
            .find(|executor| executor.name() == name)
            .cloned()
    }
}
