use serde::{Deserialize, Serialize};

/// A node in a structured-output schema tree.
///
/// Every node may carry a human-readable description. Trees are acyclic and
/// recursion always bottoms out at one of the primitive kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescription {
    #[serde(flatten)]
    pub kind: SchemaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The shape of a [`SchemaDescription`] node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaKind {
    String,
    Number,
    Boolean,
    Date,
    Object { fields: Vec<Field> },
    Array { items: Box<SchemaDescription> },
    Optional { inner: Box<SchemaDescription> },
    Enum { values: Vec<String> },
    Union { options: Vec<SchemaDescription> },
}

/// A named member of an object schema. Field order is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub schema: SchemaDescription,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: SchemaDescription) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

impl SchemaDescription {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    pub fn number() -> Self {
        Self::new(SchemaKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    pub fn date() -> Self {
        Self::new(SchemaKind::Date)
    }

    pub fn object<N: Into<String>>(fields: impl IntoIterator<Item = (N, SchemaDescription)>) -> Self {
        Self::new(SchemaKind::Object {
            fields: fields
                .into_iter()
                .map(|(name, schema)| Field::new(name, schema))
                .collect(),
        })
    }

    pub fn array(items: SchemaDescription) -> Self {
        Self::new(SchemaKind::Array {
            items: Box::new(items),
        })
    }

    pub fn enumeration<V: Into<String>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::new(SchemaKind::Enum {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn union(options: impl IntoIterator<Item = SchemaDescription>) -> Self {
        Self::new(SchemaKind::Union {
            options: options.into_iter().collect(),
        })
    }

    /// Wrap this node so that it may be absent. Wrapping twice is a no-op.
    #[must_use]
    pub fn optional(self) -> Self {
        if self.is_optional() {
            return self;
        }
        Self::new(SchemaKind::Optional {
            inner: Box::new(self),
        })
    }

    /// Attach a human-readable description to this node.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.kind, SchemaKind::Optional { .. })
    }

    /// The node beneath any optional wrapper.
    pub fn unwrap_optional(&self) -> &SchemaDescription {
        match &self.kind {
            SchemaKind::Optional { inner } => inner.unwrap_optional(),
            _ => self,
        }
    }

    /// Description of this node, falling back to the wrapped node for
    /// optionals. Empty strings count as absent.
    pub fn effective_description(&self) -> Option<&str> {
        let own = self.description.as_deref().filter(|d| !d.trim().is_empty());
        match &self.kind {
            SchemaKind::Optional { inner } => own.or_else(|| inner.effective_description()),
            _ => own,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn optional_is_idempotent() {
        let once = SchemaDescription::number().optional();
        let twice = once.clone().optional();
        assert_eq!(once, twice);
        assert_eq!(twice.unwrap_optional(), &SchemaDescription::number());
    }

    #[test]
    fn optional_description_falls_back_to_inner() {
        let field = SchemaDescription::string().describe("nickname").optional();
        assert_eq!(field.effective_description(), Some("nickname"));

        let blank = SchemaDescription::string().describe("  ");
        assert_eq!(blank.effective_description(), None);
    }

    #[test]
    fn deserializes_tagged_tree() {
        let raw = serde_json::json!({
            "kind": "object",
            "description": "a user",
            "fields": [
                { "name": "name", "schema": { "kind": "string", "description": "user name" } },
                { "name": "tags", "schema": { "kind": "array", "items": { "kind": "string" } } },
                { "name": "age", "schema": { "kind": "optional", "inner": { "kind": "number" } } }
            ]
        });
        let parsed: SchemaDescription = serde_json::from_value(raw).unwrap();

        let expected = SchemaDescription::object([
            ("name", SchemaDescription::string().describe("user name")),
            ("tags", SchemaDescription::array(SchemaDescription::string())),
            ("age", SchemaDescription::number().optional()),
        ])
        .describe("a user");
        assert_eq!(parsed, expected);
    }
}
