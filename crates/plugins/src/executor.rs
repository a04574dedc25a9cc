use std::sync::Arc;

use {async_trait::async_trait, serde_json::Value};

use crate::runtime_handle::RuntimeHandle;

/// A plugin-owned action the runtime can invoke by name.
#[async_trait]
pub trait Executor: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Capability this executor relies on, if any.
    fn capability(&self) -> Option<&str> {
        None
    }

    async fn execute(&self, input: Value) -> anyhow::Result<Value>;
}

/// Builds one executor from the plugin's service and the runtime accessor.
pub type ExecutorFactory<S> = Box<dyn Fn(Arc<S>, RuntimeHandle) -> Arc<dyn Executor> + Send + Sync>;
