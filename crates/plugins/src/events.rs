use serde::{Deserialize, Serialize};

/// A unit of work raised by a trigger and routed by the runtime to the
/// executors named in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Plugin that owns the firing trigger.
    pub plugin_id: String,
    /// Id of the trigger that fired.
    pub source: String,
    /// Executor name to invoke.
    pub executor: String,
    pub input: serde_json::Value,
}

impl TriggerEvent {
    pub fn new(
        plugin_id: impl Into<String>,
        source: impl Into<String>,
        executor: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            source: source.into(),
            executor: executor.into(),
            input,
        }
    }
}

/// Result of one executor invocation during dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub plugin_id: String,
    pub executor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
