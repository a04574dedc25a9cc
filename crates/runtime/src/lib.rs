//! The maiar runtime.
//!
//! [`Runtime`] owns the [`ModelManager`](maiar_capabilities::ModelManager),
//! the registered plugins and their prompt templates. It starts plugins in
//! registration order, routes trigger events to executors and offers
//! structured output on top of any text capability.

pub mod error;
pub mod runtime;
pub mod templates;

pub use {
    error::{Error, Result},
    maiar_plugins::{ExecutionOutcome, TriggerEvent},
    runtime::{RUNTIME_TEMPLATE_NAMESPACE, Runtime},
    templates::TemplateRegistry,
};
