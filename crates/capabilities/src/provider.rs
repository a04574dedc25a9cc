use {async_trait::async_trait, serde::Serialize, serde_json::Value};

/// A model exposed by a provider together with the capabilities it supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub capabilities: Vec<String>,
}

impl ModelInfo {
    pub fn new<C: Into<String>>(
        id: impl Into<String>,
        capabilities: impl IntoIterator<Item = C>,
    ) -> Self {
        Self {
            id: id.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }
}

/// A backend able to run inference for one or more models.
///
/// Wire protocols live entirely inside implementations; the runtime only
/// passes JSON in and takes JSON out.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider identifier (e.g. "openai", "ollama").
    fn id(&self) -> &str;

    /// Models served by this provider.
    fn models(&self) -> Vec<ModelInfo>;

    /// Run `capability` on `model` with a capability-specific input payload.
    async fn execute(&self, model: &str, capability: &str, input: Value) -> anyhow::Result<Value>;

    /// Check provider reachability. Healthy by default.
    async fn check_health(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
