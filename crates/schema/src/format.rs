//! Render a [`SchemaDescription`] as prompt text.
//!
//! Output is deterministic: structurally equal trees always render to the
//! same string.

use crate::description::{Field, SchemaDescription, SchemaKind};

/// Render a full, human-readable description of `schema`.
///
/// Objects list one field per line, arrays name their element type and
/// everything else renders as a single `Type:` line. The node's own
/// description, if any, comes first.
pub fn format_schema(schema: &SchemaDescription) -> String {
    let description = schema.effective_description().unwrap_or_default();

    match &schema.kind {
        SchemaKind::Object { fields } => {
            let lines = fields
                .iter()
                .map(format_field_line)
                .collect::<Vec<_>>()
                .join("\n");
            format!("{description}\n\nObject with fields:\n{lines}")
        },
        SchemaKind::Array { items } => {
            format!("{description}\n\nArray of: {}", type_name(items))
        },
        _ => format!("{description}\n\nType: {}", type_name(schema)),
    }
}

/// Render the compact type expression for `schema`, e.g.
/// `array of { id: string, score?: number }`.
pub fn type_name(schema: &SchemaDescription) -> String {
    match &schema.kind {
        SchemaKind::String => "string".to_string(),
        SchemaKind::Number => "number".to_string(),
        SchemaKind::Boolean => "boolean".to_string(),
        SchemaKind::Date => "date".to_string(),
        SchemaKind::Array { items } => format!("array of {}", type_name(items)),
        SchemaKind::Object { fields } if fields.is_empty() => "{}".to_string(),
        SchemaKind::Object { fields } => {
            let inline = fields
                .iter()
                .map(|field| format!("{}: {}", field_label(field), type_name(&field.schema)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{ {inline} }}")
        },
        SchemaKind::Optional { inner } => type_name(inner),
        SchemaKind::Enum { values } => format!("enum({})", values.join(" | ")),
        SchemaKind::Union { options } => options
            .iter()
            .map(type_name)
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

fn field_label(field: &Field) -> String {
    if field.schema.is_optional() {
        format!("{}?", field.name)
    } else {
        field.name.clone()
    }
}

fn format_field_line(field: &Field) -> String {
    let mut line = format!("  {}: {}", field_label(field), type_name(&field.schema));
    if let Some(description) = field.schema.effective_description() {
        line.push_str(" - ");
        line.push_str(description);
    }
    line
}
