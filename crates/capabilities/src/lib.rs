//! Capability registry and model resolution.
//!
//! A capability is an opaque skill identifier such as `text-generation`.
//! Providers expose models; each model declares the capabilities it
//! supports. The [`CapabilityRegistry`] records which models support which
//! capability and which one is the default. The [`ModelManager`] owns the
//! registry alongside the providers and resolves "the model for capability X"
//! at execution time.

pub mod error;
pub mod ids;
pub mod manager;
pub mod provider;
pub mod registry;

pub use {
    error::{Error, Result},
    manager::{ModelManager, ProviderHealth},
    provider::{ModelInfo, ModelProvider},
    registry::CapabilityRegistry,
};
