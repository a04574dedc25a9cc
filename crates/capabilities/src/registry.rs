use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};

/// Maps capabilities to the models that support them and tracks one default
/// model per capability.
///
/// Every registration adds the model to the capability's supporter list, so
/// any registered supporter is eligible as a default. Supporters keep their
/// first-registration order, which makes "first supporter" fallbacks stable.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Vec<String>>,
    default_models: HashMap<String, String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `model` supports `capability`. Repeating a registration is
    /// a no-op.
    pub fn register_capability(&mut self, model: &str, capability: &str) {
        let supporters = self.capabilities.entry(capability.to_string()).or_default();
        if supporters.iter().any(|m| m == model) {
            return;
        }
        supporters.push(model.to_string());
        debug!(model, capability, "registered capability");
    }

    /// Make `model` the default for `capability`, replacing any previous
    /// default. `model` must already be a registered supporter.
    pub fn set_default_model_for_capability(&mut self, capability: &str, model: &str) -> Result<()> {
        if !self.supports(capability, model) {
            return Err(Error::invalid_default(capability, model));
        }
        self.default_models
            .insert(capability.to_string(), model.to_string());
        debug!(model, capability, "set default model");
        Ok(())
    }

    pub fn default_model_for_capability(&self, capability: &str) -> Option<&str> {
        self.default_models.get(capability).map(String::as_str)
    }

    /// Models supporting `capability`, in registration order. Empty when the
    /// capability is unknown.
    pub fn models_with_capability(&self, capability: &str) -> Vec<String> {
        self.capabilities.get(capability).cloned().unwrap_or_default()
    }

    /// All registered capability identifiers, sorted.
    pub fn all_capabilities(&self) -> Vec<String> {
        let mut all: Vec<String> = self.capabilities.keys().cloned().collect();
        all.sort();
        all
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .get(capability)
            .is_some_and(|models| !models.is_empty())
    }

    pub fn supports(&self, capability: &str, model: &str) -> bool {
        self.capabilities
            .get(capability)
            .is_some_and(|models| models.iter().any(|m| m == model))
    }

    /// Remove `model` everywhere: supporter lists, emptied capabilities and
    /// defaults pointing at it.
    pub fn unregister_model(&mut self, model: &str) {
        self.capabilities.retain(|_, models| {
            models.retain(|m| m != model);
            !models.is_empty()
        });
        self.default_models.retain(|_, default| default != model);
    }
}
