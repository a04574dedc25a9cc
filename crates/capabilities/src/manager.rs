use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use {
    serde::Serialize,
    serde_json::Value,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    provider::{ModelInfo, ModelProvider},
    registry::CapabilityRegistry,
};

/// Outcome of a provider health check.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Default)]
struct Inner {
    providers: Vec<Arc<dyn ModelProvider>>,
    /// model id -> index into `providers`
    owners: HashMap<String, usize>,
    registry: CapabilityRegistry,
}

/// Owns the model providers and the capability registry built from them.
///
/// All state sits behind one coarse lock. Every operation is short and none
/// holds the lock across an `.await`.
#[derive(Default)]
pub struct ModelManager {
    inner: RwLock<Inner>,
}

impl ModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a provider and register every capability its models declare.
    pub fn register_provider(&self, provider: Arc<dyn ModelProvider>) -> Result<()> {
        let models = provider.models();
        let mut inner = self.write();

        if inner.providers.iter().any(|p| p.id() == provider.id()) {
            return Err(Error::DuplicateProvider {
                provider: provider.id().to_string(),
            });
        }
        for model in &models {
            if let Some(&owner) = inner.owners.get(&model.id) {
                return Err(Error::DuplicateModel {
                    model: model.id.clone(),
                    provider: inner.providers[owner].id().to_string(),
                });
            }
        }

        let index = inner.providers.len();
        for ModelInfo { id, capabilities } in &models {
            inner.owners.insert(id.clone(), index);
            for capability in capabilities {
                inner.registry.register_capability(id, capability);
            }
        }
        info!(
            provider = provider.id(),
            models = models.len(),
            "registered model provider"
        );
        inner.providers.push(provider);
        Ok(())
    }

    /// Remove a provider and forget its models.
    pub fn remove_provider(&self, provider_id: &str) -> Result<()> {
        let mut inner = self.write();
        let index = inner
            .providers
            .iter()
            .position(|p| p.id() == provider_id)
            .ok_or_else(|| Error::UnknownProvider {
                provider: provider_id.to_string(),
            })?;

        let removed = inner.providers.remove(index);
        let Inner {
            owners, registry, ..
        } = &mut *inner;
        owners.retain(|model, owner| {
            if *owner == index {
                registry.unregister_model(model);
                return false;
            }
            if *owner > index {
                *owner -= 1;
            }
            true
        });
        info!(provider = removed.id(), "removed model provider");
        Ok(())
    }

    pub fn provider_ids(&self) -> Vec<String> {
        self.read()
            .providers
            .iter()
            .map(|p| p.id().to_string())
            .collect()
    }

    /// Make `model` the default for `capability`.
    pub fn set_default_model(&self, capability: &str, model: &str) -> Result<()> {
        self.write()
            .registry
            .set_default_model_for_capability(capability, model)
    }

    pub fn default_model(&self, capability: &str) -> Option<String> {
        self.read()
            .registry
            .default_model_for_capability(capability)
            .map(str::to_string)
    }

    pub fn models_with_capability(&self, capability: &str) -> Vec<String> {
        self.read().registry.models_with_capability(capability)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.read().registry.has_capability(capability)
    }

    pub fn all_capabilities(&self) -> Vec<String> {
        self.read().registry.all_capabilities()
    }

    /// Point-in-time copy of the capability registry.
    pub fn registry_snapshot(&self) -> CapabilityRegistry {
        self.read().registry.clone()
    }

    /// Pick the model that should serve `capability`.
    ///
    /// An explicit model wins if it supports the capability; otherwise the
    /// configured default, otherwise the first registered supporter.
    pub fn resolve_model(&self, capability: &str, explicit: Option<&str>) -> Result<String> {
        let inner = self.read();
        let registry = &inner.registry;

        if let Some(model) = explicit {
            if !inner.owners.contains_key(model) {
                return Err(Error::UnknownModel {
                    model: model.to_string(),
                });
            }
            if !registry.supports(capability, model) {
                return Err(Error::UnsupportedModel {
                    capability: capability.to_string(),
                    model: model.to_string(),
                });
            }
            return Ok(model.to_string());
        }

        if let Some(model) = registry.default_model_for_capability(capability) {
            return Ok(model.to_string());
        }

        registry
            .models_with_capability(capability)
            .into_iter()
            .next()
            .ok_or_else(|| Error::unknown_capability(capability))
    }

    /// Resolve a model for `capability` and run it.
    pub async fn execute_capability(
        &self,
        capability: &str,
        input: Value,
        explicit_model: Option<&str>,
    ) -> Result<Value> {
        let model = self.resolve_model(capability, explicit_model)?;
        let provider = {
            let inner = self.read();
            let index = inner
                .owners
                .get(&model)
                .copied()
                .ok_or_else(|| Error::UnknownModel {
                    model: model.clone(),
                })?;
            Arc::clone(&inner.providers[index])
        };

        debug!(capability, model = %model, provider = provider.id(), "executing capability");
        provider
            .execute(&model, capability, input)
            .await
            .map_err(|source| Error::provider(model, source))
    }

    /// Check every provider. Failures are reported, not returned as errors.
    pub async fn check_health(&self) -> Vec<ProviderHealth> {
        let providers: Vec<Arc<dyn ModelProvider>> = self.read().providers.clone();
        let mut report = Vec::with_capacity(providers.len());
        for provider in providers {
            let outcome = provider.check_health().await;
            if let Err(e) = &outcome {
                warn!(provider = provider.id(), error = %e, "provider health check failed");
            }
            report.push(ProviderHealth {
                provider: provider.id().to_string(),
                healthy: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
            });
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {async_trait::async_trait, serde_json::json};

    use super::*;

    struct EchoProvider {
        id: &'static str,
        models: Vec<ModelInfo>,
        healthy: bool,
    }

    impl EchoProvider {
        fn new(id: &'static str, models: Vec<ModelInfo>) -> Arc<Self> {
            Arc::new(Self {
                id,
                models,
                healthy: true,
            })
        }
    }

    #[async_trait]
    impl ModelProvider for EchoProvider {
        fn id(&self) -> &str {
            self.id
        }

        fn models(&self) -> Vec<ModelInfo> {
            self.models.clone()
        }

        async fn execute(&self, model: &str, capability: &str, input: Value) -> anyhow::Result<Value> {
            if input == json!("fail") {
                anyhow::bail!("provider exploded");
            }
            Ok(json!({ "model": model, "capability": capability, "input": input }))
        }

        async fn check_health(&self) -> anyhow::Result<()> {
            if self.healthy {
                Ok(())
            } else {
                anyhow::bail!("unreachable")
            }
        }
    }

    fn manager() -> ModelManager {
        let manager = ModelManager::new();
        manager
            .register_provider(EchoProvider::new("openai", vec![
                ModelInfo::new("gpt", ["text-generation", "image-description"]),
            ]))
            .unwrap();
        manager
            .register_provider(EchoProvider::new("anthropic", vec![ModelInfo::new(
                "claude",
                ["text-generation"],
            )]))
            .unwrap();
        manager
    }

    #[test]
    fn providers_populate_registry() {
        let manager = manager();
        assert_eq!(manager.models_with_capability("text-generation"), vec![
            "gpt", "claude"
        ]);
        assert!(manager.has_capability("image-description"));
        assert_eq!(manager.all_capabilities(), vec![
            "image-description",
            "text-generation"
        ]);
    }

    #[test]
    fn duplicate_provider_is_rejected() {
        let manager = manager();
        let err = manager
            .register_provider(EchoProvider::new("openai", vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateProvider { .. }));
    }

    #[test]
    fn duplicate_model_is_rejected() {
        let manager = manager();
        let err = manager
            .register_provider(EchoProvider::new("mirror", vec![ModelInfo::new(
                "gpt",
                ["text-generation"],
            )]))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateModel { ref provider, .. } if provider == "openai"));
    }

    #[test]
    fn resolution_prefers_explicit_then_default_then_first() {
        let manager = manager();
        assert_eq!(manager.resolve_model("text-generation", None).unwrap(), "gpt");

        manager.set_default_model("text-generation", "claude").unwrap();
        assert_eq!(manager.resolve_model("text-generation", None).unwrap(), "claude");

        assert_eq!(
            manager
                .resolve_model("text-generation", Some("gpt"))
                .unwrap(),
            "gpt"
        );
    }

    #[test]
    fn explicit_model_must_support_capability() {
        let manager = manager();
        let err = manager
            .resolve_model("image-description", Some("claude"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel { .. }));

        let err = manager
            .resolve_model("text-generation", Some("ghost"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownModel { .. }));
    }

    #[test]
    fn unknown_capability_cannot_resolve() {
        let err = manager().resolve_model("speech", None).unwrap_err();
        assert!(matches!(err, Error::UnknownCapability { .. }));
    }

    #[test]
    fn removing_provider_forgets_its_models() {
        let manager = manager();
        manager.set_default_model("text-generation", "gpt").unwrap();
        manager.remove_provider("openai").unwrap();

        assert_eq!(manager.models_with_capability("text-generation"), vec!["claude"]);
        assert!(!manager.has_capability("image-description"));
        assert_eq!(manager.default_model("text-generation"), None);
        assert_eq!(manager.resolve_model("text-generation", None).unwrap(), "claude");
        assert_eq!(manager.provider_ids(), vec!["anthropic"]);
    }

    #[tokio::test]
    async fn executes_through_owning_provider() {
        let manager = manager();
        let output = manager
            .execute_capability("image-description", json!({"url": "x"}), None)
            .await
            .unwrap();
        assert_eq!(output["model"], "gpt");
        assert_eq!(output["capability"], "image-description");
    }

    #[tokio::test]
    async fn provider_failures_name_the_model() {
        let manager = manager();
        let err = manager
            .execute_capability("text-generation", json!("fail"), Some("claude"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { ref model, .. } if model == "claude"));
        assert!(err.to_string().contains("provider exploded"));
    }

    #[tokio::test]
    async fn health_report_covers_every_provider() {
        let manager = manager();
        manager
            .register_provider(Arc::new(EchoProvider {
                id: "local",
                models: vec![],
                healthy: false,
            }))
            .unwrap();
        let report = manager.check_health().await;
        assert_eq!(report.len(), 3);
        let local = report.iter().find(|h| h.provider == "local").unwrap();
        assert!(!local.healthy);
        assert_eq!(local.error.as_deref(), Some("unreachable"));
    }
}
