//! Deferred access from plugins back to the runtime that owns them.

use std::sync::{Arc, Weak};

use {async_trait::async_trait, maiar_capabilities::ModelManager, maiar_schema::SchemaDescription};

use crate::{
    error::{Error, Result},
    events::{ExecutionOutcome, TriggerEvent},
};

/// What a plugin can reach of the live runtime.
#[async_trait]
pub trait PluginRuntime: Send + Sync {
    /// Shared model manager (capability registry and providers).
    fn models(&self) -> &ModelManager;

    /// Render the template registered as `<pluginId>/<templateName>`.
    fn render_template(&self, key: &str, context: &serde_json::Value) -> anyhow::Result<String>;

    /// Route an event to every running executor it names.
    async fn dispatch(&self, event: TriggerEvent) -> anyhow::Result<Vec<ExecutionOutcome>>;

    /// Ask the model serving `capability` for JSON shaped like `schema`.
    async fn structured(
        &self,
        capability: &str,
        instruction: &str,
        schema: &SchemaDescription,
    ) -> anyhow::Result<serde_json::Value>;
}

/// Runtime reference handed to plugins and their factories before the
/// runtime exists as a shared value.
///
/// Empty until the runtime binds itself. Holds a weak reference so a plugin
/// keeping the handle does not keep the runtime alive.
#[derive(Clone, Default)]
pub struct RuntimeHandle {
    cell: Arc<tokio::sync::OnceCell<Weak<dyn PluginRuntime>>>,
}

impl RuntimeHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the runtime. Only the first call has an effect; returns whether
    /// this call bound it.
    pub fn bind(&self, runtime: Weak<dyn PluginRuntime>) -> bool {
        self.cell.set(runtime).is_ok()
    }

    pub fn is_bound(&self) -> bool {
        self.cell.initialized()
    }

    /// The live runtime, or `RuntimeUnavailable` while unbound or once the
    /// runtime has been dropped.
    pub fn get(&self) -> Result<Arc<dyn PluginRuntime>> {
        self.cell
            .get()
            .and_then(|runtime| runtime.upgrade())
            .ok_or(Error::RuntimeUnavailable)
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct StubRuntime {
        models: ModelManager,
    }

    #[async_trait]
    impl PluginRuntime for StubRuntime {
        fn models(&self) -> &ModelManager {
            &self.models
        }

        fn render_template(&self, key: &str, _context: &serde_json::Value) -> anyhow::Result<String> {
            Ok(key.to_string())
        }

        async fn dispatch(&self, _event: TriggerEvent) -> anyhow::Result<Vec<ExecutionOutcome>> {
            Ok(Vec::new())
        }

        async fn structured(
            &self,
            _capability: &str,
            _instruction: &str,
            _schema: &SchemaDescription,
        ) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn unbound_handle_is_unavailable() {
        let handle = RuntimeHandle::new();
        assert!(!handle.is_bound());
        assert!(matches!(handle.get(), Err(Error::RuntimeUnavailable)));
    }

    #[test]
    fn clones_observe_binding() {
        let handle = RuntimeHandle::new();
        let clone = handle.clone();

        let runtime: Arc<dyn PluginRuntime> = Arc::new(StubRuntime::default());
        assert!(handle.bind(Arc::downgrade(&runtime)));
        assert!(!handle.bind(Arc::downgrade(&runtime)));

        let live = clone.get().unwrap();
        assert_eq!(live.render_template("p/t", &serde_json::Value::Null).unwrap(), "p/t");
    }

    #[test]
    fn dropped_runtime_is_unavailable() {
        let handle = RuntimeHandle::new();
        let runtime: Arc<dyn PluginRuntime> = Arc::new(StubRuntime::default());
        handle.bind(Arc::downgrade(&runtime));
        drop(runtime);
        assert!(handle.is_bound());
        assert!(matches!(handle.get(), Err(Error::RuntimeUnavailable)));
    }
}
