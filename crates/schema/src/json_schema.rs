//! Conversion from JSON Schema documents into [`SchemaDescription`] trees.
//!
//! Only the subset that maps onto the description grammar is accepted.
//! Anything else is rejected with [`Error::UnsupportedSchemaKind`] rather than
//! being rendered as an opaque name.

use {
    schemars::JsonSchema,
    serde_json::{Map, Value},
};

use crate::{
    description::{Field, SchemaDescription, SchemaKind},
    error::{Error, Result},
};

impl SchemaDescription {
    /// Convert a JSON Schema document. Local `$ref`s into `$defs` or
    /// `definitions` are resolved against `schema` itself.
    pub fn from_json_schema(schema: &Value) -> Result<Self> {
        Converter {
            root: schema,
            resolving: Vec::new(),
        }
        .convert(schema, "$")
    }

    /// Describe a Rust type through its `schemars` JSON Schema.
    pub fn for_type<T: JsonSchema>() -> Result<Self> {
        let schema = schemars::schema_for!(T);
        Self::from_json_schema(schema.as_value())
    }
}

struct Converter<'a> {
    root: &'a Value,
    resolving: Vec<String>,
}

impl<'a> Converter<'a> {
    fn convert(&mut self, node: &'a Value, path: &str) -> Result<SchemaDescription> {
        let map = match node {
            Value::Object(map) => map,
            Value::Bool(true) => return Err(Error::unsupported("any", path)),
            Value::Bool(false) => return Err(Error::unsupported("never", path)),
            other => return Err(Error::unsupported(json_kind(other), path)),
        };

        let mut described = self.convert_shape(map, path)?;
        if let Some(description) = map.get("description").and_then(Value::as_str) {
            described = attach_description(described, description);
        }
        Ok(described)
    }

    fn convert_shape(&mut self, map: &'a Map<String, Value>, path: &str) -> Result<SchemaDescription> {
        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            return self.convert_ref(reference, path);
        }

        if let Some(constant) = map.get("const") {
            return Ok(SchemaDescription::enumeration([literal(constant)]));
        }

        if let Some(values) = map.get("enum").and_then(Value::as_array) {
            return Ok(convert_enum(values));
        }

        for key in ["anyOf", "oneOf"] {
            if let Some(options) = map.get(key).and_then(Value::as_array) {
                return self.convert_options(options, path);
            }
        }

        if let Some(all) = map.get("allOf").and_then(Value::as_array) {
            return match all.as_slice() {
                [single] => self.convert(single, path),
                _ => Err(Error::unsupported("allOf", path)),
            };
        }

        match map.get("type") {
            Some(Value::String(ty)) => self.convert_typed(ty, map, path),
            Some(Value::Array(types)) => {
                let mut nullable = false;
                let mut options = Vec::new();
                for ty in types {
                    match ty.as_str() {
                        Some("null") => nullable = true,
                        Some(ty) => options.push(self.convert_typed(ty, map, path)?),
                        None => return Err(Error::unsupported(json_kind(ty), path)),
                    }
                }
                collapse(options, nullable, path)
            },
            Some(other) => Err(Error::unsupported(json_kind(other), path)),
            None if map.contains_key("properties") => self.convert_object(map, path),
            None => Err(Error::unsupported("any", path)),
        }
    }

    fn convert_typed(
        &mut self,
        ty: &str,
        map: &'a Map<String, Value>,
        path: &str,
    ) -> Result<SchemaDescription> {
        match ty {
            "string" => match map.get("format").and_then(Value::as_str) {
                Some("date" | "date-time") => Ok(SchemaDescription::date()),
                _ => Ok(SchemaDescription::string()),
            },
            "number" | "integer" => Ok(SchemaDescription::number()),
            "boolean" => Ok(SchemaDescription::boolean()),
            "array" => match map.get("items") {
                Some(items @ Value::Object(_)) => {
                    let items = self.convert(items, &format!("{path}[]"))?;
                    Ok(SchemaDescription::array(items))
                },
                Some(Value::Array(_)) => Err(Error::unsupported("tuple", path)),
                None if map.contains_key("prefixItems") => Err(Error::unsupported("tuple", path)),
                _ => Err(Error::unsupported("array without items", path)),
            },
            "object" => self.convert_object(map, path),
            "null" => Err(Error::unsupported("null", path)),
            other => Err(Error::unsupported(other, path)),
        }
    }

    fn convert_object(&mut self, map: &'a Map<String, Value>, path: &str) -> Result<SchemaDescription> {
        let properties = match map.get("properties") {
            Some(Value::Object(properties)) => properties,
            Some(other) => return Err(Error::unsupported(json_kind(other), path)),
            None if map
                .get("additionalProperties")
                .is_some_and(|extra| extra != &Value::Bool(false)) =>
            {
                return Err(Error::unsupported("map", path));
            },
            None => return Ok(SchemaDescription::new(SchemaKind::Object { fields: Vec::new() })),
        };

        let required: Vec<&str> = map
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut fields = Vec::with_capacity(properties.len());
        for (name, property) in properties {
            let mut schema = self.convert(property, &format!("{path}.{name}"))?;
            if !required.contains(&name.as_str()) {
                schema = schema.optional();
            }
            fields.push(Field::new(name.clone(), schema));
        }
        Ok(SchemaDescription::new(SchemaKind::Object { fields }))
    }

    fn convert_options(&mut self, options: &'a [Value], path: &str) -> Result<SchemaDescription> {
        let mut nullable = false;
        let mut converted = Vec::new();
        for option in options {
            if is_null_schema(option) {
                nullable = true;
                continue;
            }
            converted.push(self.convert(option, path)?);
        }
        collapse(converted, nullable, path)
    }

    fn convert_ref(&mut self, reference: &str, path: &str) -> Result<SchemaDescription> {
        let pointer = reference
            .strip_prefix('#')
            .ok_or_else(|| Error::UnresolvedRef {
                reference: reference.to_string(),
            })?;
        if self.resolving.iter().any(|r| r == reference) {
            return Err(Error::unsupported("recursive $ref", path));
        }
        let target = self
            .root
            .pointer(pointer)
            .ok_or_else(|| Error::UnresolvedRef {
                reference: reference.to_string(),
            })?;

        self.resolving.push(reference.to_string());
        let converted = self.convert(target, path);
        self.resolving.pop();
        converted
    }
}

fn collapse(mut options: Vec<SchemaDescription>, nullable: bool, path: &str) -> Result<SchemaDescription> {
    let inner = match options.len() {
        0 => return Err(Error::unsupported("null", path)),
        1 => options.remove(0),
        _ => SchemaDescription::union(options),
    };
    Ok(if nullable { inner.optional() } else { inner })
}

fn convert_enum(values: &[Value]) -> SchemaDescription {
    let nullable = values.iter().any(Value::is_null);
    let schema =
        SchemaDescription::enumeration(values.iter().filter(|v| !v.is_null()).map(literal));
    if nullable { schema.optional() } else { schema }
}

/// Put a description on the innermost node so it survives later wrapping.
fn attach_description(schema: SchemaDescription, description: &str) -> SchemaDescription {
    match schema.kind {
        SchemaKind::Optional { inner } => attach_description(*inner, description).optional(),
        kind => SchemaDescription::new(kind).describe(description),
    }
}

fn is_null_schema(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("null")
}

fn literal(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean literal",
        Value::Number(_) => "number literal",
        Value::String(_) => "string literal",
        Value::Array(_) => "array literal",
        Value::Object(_) => "object",
    }
}
