use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("plugin {plugin} is already registered")]
    DuplicatePlugin { plugin: String },

    #[error("unknown plugin {plugin}")]
    UnknownPlugin { plugin: String },

    #[error("plugin {plugin} requires capability {capability}, which no model provides")]
    MissingCapability { plugin: String, capability: String },

    #[error("runtime already started")]
    AlreadyStarted,

    #[error("no running executor named {executor}")]
    NoExecutor { executor: String },

    #[error("unknown template {key}")]
    UnknownTemplate { key: String },

    #[error("template {key}: {source}")]
    Template {
        key: String,
        #[source]
        source: tera::Error,
    },

    #[error("failed to read templates from {path}: {source}")]
    TemplateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no valid {capability} output after {attempts} attempt(s): {last_error}")]
    StructuredOutput {
        capability: String,
        attempts: u32,
        last_error: String,
    },

    #[error(transparent)]
    Plugin(#[from] maiar_plugins::Error),

    #[error(transparent)]
    Capabilities(#[from] maiar_capabilities::Error),

    #[error(transparent)]
    Schema(#[from] maiar_schema::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn template(key: impl Into<String>, source: tera::Error) -> Self {
        Self::Template {
            key: key.into(),
            source,
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
