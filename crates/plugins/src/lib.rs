//! Plugin lifecycle for the maiar runtime.
//!
//! A plugin owns triggers (event sources) and executors (named actions). It
//! is constructed with configuration only; [`Plugin::init`] connects its
//! service and builds triggers and executors from factories that receive the
//! service and a [`RuntimeHandle`], a deferred accessor the runtime binds
//! once it exists.

pub mod error;
pub mod events;
pub mod executor;
pub mod host;
pub mod plugin;
pub mod runtime_handle;
pub mod service;
pub mod trigger;

pub use {
    error::{Error, Result},
    events::{ExecutionOutcome, TriggerEvent},
    executor::{Executor, ExecutorFactory},
    host::ServicePlugin,
    plugin::{InitContext, Plugin, PluginDescription, PluginState},
    runtime_handle::{PluginRuntime, RuntimeHandle},
    service::PluginService,
    trigger::{CommandTrigger, Trigger, TriggerFactory, TriggerSettings},
};
