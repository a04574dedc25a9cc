//! Helpers around asking a model for structured output and reading it back.

use serde_json::Value;

use crate::{
    description::{SchemaDescription, SchemaKind},
    error::{Error, Result},
    format::{format_schema, type_name},
};

/// Build the prompt that asks a model to answer `instruction` with JSON
/// shaped like `schema`.
pub fn structured_output_prompt(instruction: &str, schema: &SchemaDescription) -> String {
    format!(
        "{}\n\nRespond with a single JSON value and nothing else. \
         The JSON must follow this structure:\n{}\n",
        instruction.trim(),
        format_schema(schema).trim()
    )
}

/// Pull the JSON payload out of a model reply.
///
/// Prefers the first fenced code block; otherwise takes the first balanced
/// object or array in the text that parses. Bracketed prose such as
/// `[final]` ahead of the payload is skipped.
pub fn extract_json(text: &str) -> Result<Value> {
    if let Some(block) = fenced_block(text)
        && let Ok(value) = serde_json::from_str(block.trim())
    {
        return Ok(value);
    }

    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let mut last_error = None;
    for (start, _) in trimmed.match_indices(['{', '[']) {
        let Some(candidate) = balanced_span(&trimmed[start..]) else {
            continue;
        };
        match serde_json::from_str(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.map_or(Error::NoJson, Error::from))
}

/// Check `value` against `schema`. The first mismatch is reported with a
/// JSON-path-like location.
pub fn validate(value: &Value, schema: &SchemaDescription) -> Result<()> {
    validate_at(value, schema, "$")
}

fn validate_at(value: &Value, schema: &SchemaDescription, path: &str) -> Result<()> {
    let ok = match &schema.kind {
        SchemaKind::String | SchemaKind::Date => value.is_string(),
        SchemaKind::Number => value.is_number(),
        SchemaKind::Boolean => value.is_boolean(),
        SchemaKind::Optional { inner } => {
            return if value.is_null() {
                Ok(())
            } else {
                validate_at(value, inner, path)
            };
        },
        SchemaKind::Enum { values } => {
            let literal = value
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            values.contains(&literal)
        },
        SchemaKind::Union { options } => options
            .iter()
            .any(|option| validate_at(value, option, path).is_ok()),
        SchemaKind::Array { items } => {
            let Some(elements) = value.as_array() else {
                return Err(Error::mismatch(path, type_name(schema)));
            };
            for (index, element) in elements.iter().enumerate() {
                validate_at(element, items, &format!("{path}[{index}]"))?;
            }
            true
        },
        SchemaKind::Object { fields } => {
            let Some(object) = value.as_object() else {
                return Err(Error::mismatch(path, type_name(schema)));
            };
            for field in fields {
                let field_path = format!("{path}.{}", field.name);
                match object.get(&field.name) {
                    Some(Value::Null) | None if field.schema.is_optional() => {},
                    Some(member) => validate_at(member, &field.schema, &field_path)?,
                    None => return Err(Error::mismatch(field_path, type_name(&field.schema))),
                }
            }
            true
        },
    };

    if ok {
        Ok(())
    } else {
        Err(Error::mismatch(path, type_name(schema)))
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip an optional language tag on the opening fence line.
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

/// The `{...}` or `[...]` span opening at the first bracket of `text`,
/// ignoring brackets inside string literals.
fn balanced_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {},
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            },
            _ => {},
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn task_schema() -> SchemaDescription {
        SchemaDescription::object([
            ("title", SchemaDescription::string()),
            ("priority", SchemaDescription::enumeration(["low", "high"])),
            (
                "labels",
                SchemaDescription::array(SchemaDescription::string()).optional(),
            ),
        ])
    }

    #[test]
    fn prompt_embeds_formatted_schema() {
        let prompt = structured_output_prompt("Summarise the ticket.", &task_schema());
        assert!(prompt.starts_with("Summarise the ticket.\n\n"));
        assert!(prompt.contains("  priority: enum(low | high)"));
        assert!(prompt.contains("  labels?: array of string"));
    }

    #[test]
    fn extracts_from_fenced_block() {
        let reply = "Sure!\n```json\n{\"title\": \"x\", \"priority\": \"low\"}\n```\nDone.";
        let value = extract_json(reply).unwrap();
        assert_eq!(value, json!({"title": "x", "priority": "low"}));
    }

    #[test]
    fn extracts_embedded_object_with_braces_in_strings() {
        let reply = r#"Here you go: {"title": "use {braces}", "priority": "high"} hope that helps"#;
        let value = extract_json(reply).unwrap();
        assert_eq!(value["title"], "use {braces}");
    }

    #[test]
    fn skips_bracketed_prose_before_payload() {
        let value = extract_json(r#"Result [final]: {"title": "x"}"#).unwrap();
        assert_eq!(value, json!({"title": "x"}));

        let value = extract_json("Steps {1} and {2} done: [\"a\", \"b\"]").unwrap();
        assert_eq!(value, json!(["a", "b"]));
    }

    #[test]
    fn reports_parse_error_when_no_span_parses() {
        assert!(matches!(extract_json("see [note] and {todo}"), Err(Error::Json(_))));
    }

    #[test]
    fn reports_missing_json() {
        assert!(matches!(extract_json("no data here"), Err(Error::NoJson)));
    }

    #[test]
    fn accepts_conforming_value() {
        let value = json!({"title": "fix login", "priority": "high", "labels": null});
        validate(&value, &task_schema()).unwrap();
    }

    #[test]
    fn rejects_missing_required_field() {
        let value = json!({"priority": "low"});
        match validate(&value, &task_schema()).unwrap_err() {
            Error::SchemaMismatch { path, expected } => {
                assert_eq!(path, "$.title");
                assert_eq!(expected, "string");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_value_outside_enum() {
        let value = json!({"title": "x", "priority": "urgent"});
        let err = validate(&value, &task_schema()).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { ref path, .. } if path == "$.priority"));
    }

    #[test]
    fn reports_array_element_path() {
        let value = json!({"title": "x", "priority": "low", "labels": ["a", 3]});
        let err = validate(&value, &task_schema()).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { ref path, .. } if path == "$.labels[1]"));
    }
}
