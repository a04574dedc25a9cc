use std::sync::Arc;

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    tracing::debug,
};

use crate::{
    events::{ExecutionOutcome, TriggerEvent},
    runtime_handle::RuntimeHandle,
};

/// An event source owned by a plugin. Firing a trigger sends work to the
/// runtime's dispatch path.
#[async_trait]
pub trait Trigger: Send + Sync {
    fn id(&self) -> &str;

    /// Whether this trigger claims a piece of inbound text. Used for
    /// command-style routing; triggers that do not listen to text keep the
    /// default.
    fn matches(&self, _text: &str) -> bool {
        false
    }

    /// Begin producing events. Called by the runtime once every plugin has
    /// been initialized.
    async fn start(&self) -> anyhow::Result<()>;

    /// Stop producing events.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Extra configuration handed to trigger factories.
#[derive(Debug, Clone)]
pub struct TriggerSettings {
    pub command_prefix: String,
    /// Free-form plugin settings from the config file.
    pub settings: Value,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            command_prefix: "!".into(),
            settings: Value::Null,
        }
    }
}

/// Builds one trigger from the plugin's service, the runtime accessor and
/// the trigger settings.
pub type TriggerFactory<S> =
    Box<dyn Fn(Arc<S>, RuntimeHandle, &TriggerSettings) -> Arc<dyn Trigger> + Send + Sync>;

/// Trigger for `<prefix><command> [args]` text, forwarding the arguments to
/// one executor.
pub struct CommandTrigger {
    id: String,
    plugin_id: String,
    prefix: String,
    command: String,
    executor: String,
    runtime: RuntimeHandle,
}

impl CommandTrigger {
    pub fn new(
        plugin_id: impl Into<String>,
        command: impl Into<String>,
        executor: impl Into<String>,
        runtime: RuntimeHandle,
        settings: &TriggerSettings,
    ) -> Self {
        let command = command.into();
        Self {
            id: format!("command:{command}"),
            plugin_id: plugin_id.into(),
            prefix: settings.command_prefix.clone(),
            command,
            executor: executor.into(),
            runtime,
        }
    }

    /// Arguments following the command, when `text` invokes it.
    pub fn arguments<'a>(&self, text: &'a str) -> Option<&'a str> {
        let rest = text
            .trim_start()
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(self.command.as_str())?;
        match rest.chars().next() {
            None => Some(""),
            Some(c) if c.is_whitespace() => Some(rest.trim()),
            Some(_) => None,
        }
    }

    /// Dispatch `text` to the executor if it invokes this command. Returns
    /// `None` when the text is not for this trigger.
    pub async fn fire(&self, text: &str) -> anyhow::Result<Option<Vec<ExecutionOutcome>>> {
        let Some(arguments) = self.arguments(text) else {
            return Ok(None);
        };
        let runtime = self.runtime.get()?;
        debug!(trigger = %self.id, executor = %self.executor, "command trigger fired");
        let event = TriggerEvent::new(
            &self.plugin_id,
            &self.id,
            &self.executor,
            json!({ "text": arguments }),
        );
        runtime.dispatch(event).await.map(Some)
    }
}

#[async_trait]
impl Trigger for CommandTrigger {
    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, text: &str) -> bool {
        self.arguments(text).is_some()
    }

    async fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
