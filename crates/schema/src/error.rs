use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The input uses a shape outside the supported grammar.
    #[error("unsupported schema kind `{kind}` at {path}")]
    UnsupportedSchemaKind { kind: String, path: String },

    #[error("unresolved schema reference `{reference}`")]
    UnresolvedRef { reference: String },

    #[error("value at {path} does not match schema: expected {expected}")]
    SchemaMismatch { path: String, expected: String },

    #[error("no JSON payload found in model output")]
    NoJson,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn unsupported(kind: impl Into<String>, path: impl Into<String>) -> Self {
        Self::UnsupportedSchemaKind {
            kind: kind.into(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn mismatch(path: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.into(),
            expected: expected.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
