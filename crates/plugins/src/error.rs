use std::error::Error as StdError;

use thiserror::Error;

use crate::plugin::PluginState;

#[derive(Debug, Error)]
pub enum Error {
    /// The plugin's external service could not be reached during `init`.
    #[error("plugin {plugin} failed to start its service: {source}")]
    ServiceStartup {
        plugin: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("plugin {plugin} failed to release its service: {source}")]
    ServiceShutdown {
        plugin: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("plugin {plugin} is already shut down")]
    DoubleShutdown { plugin: String },

    #[error("plugin {plugin} is not running (state: {state})")]
    NotRunning { plugin: String, state: PluginState },

    #[error("plugin {plugin} was already initialized (state: {state})")]
    AlreadyInitialized { plugin: String, state: PluginState },

    /// The runtime accessor was used before the runtime bound it, or after
    /// the runtime was dropped.
    #[error("runtime is not available")]
    RuntimeUnavailable,

    #[error("{0}")]
    Message(String),

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn external(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::External {
            context: context.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn service_startup(plugin: impl Into<String>, source: anyhow::Error) -> Self {
        Self::ServiceStartup {
            plugin: plugin.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn service_shutdown(plugin: impl Into<String>, source: anyhow::Error) -> Self {
        Self::ServiceShutdown {
            plugin: plugin.into(),
            source: source.into(),
        }
    }
}

impl maiar_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

maiar_common::impl_context!();
