use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    clap::Subcommand,
    maiar_schema::{SchemaDescription, format_schema, structured_output_prompt},
};

#[derive(Subcommand)]
pub enum SchemaAction {
    /// Render a JSON Schema file as prompt text.
    Format {
        /// JSON Schema file.
        path: PathBuf,
        /// Wrap the rendering in a structured-output prompt for this
        /// instruction.
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Check a JSON document (or a model reply containing one) against a
    /// JSON Schema file.
    Validate {
        /// JSON Schema file.
        schema: PathBuf,
        /// File holding the value to check.
        value: PathBuf,
    },
}

pub fn handle_schema(action: SchemaAction) -> Result<()> {
    match action {
        SchemaAction::Format { path, prompt } => {
            let schema = load_schema(&path)?;
            match prompt {
                Some(instruction) => print!("{}", structured_output_prompt(&instruction, &schema)),
                None => println!("{}", format_schema(&schema).trim()),
            }
            Ok(())
        },
        SchemaAction::Validate { schema, value } => {
            let schema = load_schema(&schema)?;
            let text = std::fs::read_to_string(&value)
                .with_context(|| format!("failed to read {}", value.display()))?;
            let parsed = maiar_schema::extract_json(&text)?;
            maiar_schema::validate(&parsed, &schema)?;
            eprintln!("{} matches the schema.", value.display());
            Ok(())
        },
    }
}

fn load_schema(path: &Path) -> Result<SchemaDescription> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let schema = SchemaDescription::from_json_schema(&json)
        .with_context(|| format!("{} uses an unsupported schema shape", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded schema");
    Ok(schema)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn loads_json_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.json");
        std::fs::write(
            &path,
            r#"{
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "user name" },
                    "age": { "type": "number" }
                },
                "required": ["name"]
            }"#,
        )
        .unwrap();

        let rendered = format_schema(&load_schema(&path).unwrap());
        assert!(rendered.contains("  name: string - user name"));
        assert!(rendered.contains("  age?: number"));
    }

    #[test]
    fn reports_unreadable_schema() {
        let err = load_schema(Path::new("/no/such/schema.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read /no/such/schema.json"));
    }
}
