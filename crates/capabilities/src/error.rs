use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Default requested for a model that is not a registered supporter.
    #[error("model {model} does not support capability {capability}")]
    InvalidDefaultModel { capability: String, model: String },

    #[error("no model supports capability {capability}")]
    UnknownCapability { capability: String },

    #[error("unknown model {model}")]
    UnknownModel { model: String },

    #[error("model {model} was requested for capability {capability} it does not support")]
    UnsupportedModel { capability: String, model: String },

    #[error("provider {provider} is already registered")]
    DuplicateProvider { provider: String },

    #[error("model {model} is already served by provider {provider}")]
    DuplicateModel { model: String, provider: String },

    #[error("unknown provider {provider}")]
    UnknownProvider { provider: String },

    #[error("model {model} failed: {source}")]
    Provider {
        model: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_default(capability: impl Into<String>, model: impl Into<String>) -> Self {
        Self::InvalidDefaultModel {
            capability: capability.into(),
            model: model.into(),
        }
    }

    #[must_use]
    pub fn unknown_capability(capability: impl Into<String>) -> Self {
        Self::UnknownCapability {
            capability: capability.into(),
        }
    }

    #[must_use]
    pub fn provider(model: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Provider {
            model: model.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
