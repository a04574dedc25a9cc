//! Prompt templates keyed `<namespace>/<name>`.

use std::path::Path;

use {
    serde_json::Value,
    tera::{Context, Tera},
    tracing::debug,
};

use crate::error::{Error, Result};

/// File extensions picked up by [`TemplateRegistry::load_dir`].
const TEMPLATE_EXTENSIONS: &[&str] = &["liquid", "tera", "md", "txt"];

/// Named prompt templates. Plugins register theirs under their own id, so a
/// plugin's description lives at `<pluginId>/plugin_description`.
#[derive(Default)]
pub struct TemplateRegistry {
    tera: Tera,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_raw(&mut self, namespace: &str, name: &str, content: &str) -> Result<()> {
        let key = format!("{namespace}/{name}");
        self.tera
            .add_raw_template(&key, content)
            .map_err(|e| Error::template(&key, e))?;
        debug!(template = %key, "registered template");
        Ok(())
    }

    /// Register every template file directly inside `dir` under `namespace`,
    /// named after the file stem. Returns how many were loaded.
    pub fn load_dir(&mut self, namespace: &str, dir: &Path) -> Result<usize> {
        let read_dir = |source| Error::TemplateDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_dir)? {
            let path = entry.map_err(read_dir)?.path();
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| TEMPLATE_EXTENSIONS.contains(&e));
            if path.is_file() && supported {
                files.push(path);
            }
        }
        files.sort();

        for path in &files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(path).map_err(read_dir)?;
            self.add_raw(namespace, stem, &content)?;
        }
        Ok(files.len())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tera.get_template_names().any(|name| name == key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tera.get_template_names().map(str::to_string).collect();
        keys.sort();
        keys
    }

    /// Render `key` with `context`, which must be a JSON object or null.
    pub fn render(&self, key: &str, context: &Value) -> Result<String> {
        if !self.contains(key) {
            return Err(Error::UnknownTemplate {
                key: key.to_string(),
            });
        }
        let context = match context {
            Value::Null => Context::new(),
            value @ Value::Object(_) => {
                Context::from_value(value.clone()).map_err(|e| Error::template(key, e))?
            },
            _ => {
                return Err(Error::message(format!(
                    "template {key}: context must be a JSON object"
                )));
            },
        };
        self.tera
            .render(key, &context)
            .map_err(|e| Error::template(key, e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn renders_with_context() {
        let mut templates = TemplateRegistry::new();
        templates
            .add_raw("plugin-discord", "greeting", "Hello {{ name }}!")
            .unwrap();
        let out = templates
            .render("plugin-discord/greeting", &json!({ "name": "ada" }))
            .unwrap();
        assert_eq!(out, "Hello ada!");
    }

    #[test]
    fn unknown_key_is_reported() {
        let templates = TemplateRegistry::new();
        let err = templates.render("missing/key", &Value::Null).unwrap_err();
        assert!(matches!(err, Error::UnknownTemplate { ref key } if key == "missing/key"));
    }

    #[test]
    fn rejects_non_object_context() {
        let mut templates = TemplateRegistry::new();
        templates.add_raw("ns", "t", "static").unwrap();
        assert!(templates.render("ns/t", &json!([1, 2])).is_err());
        assert_eq!(templates.render("ns/t", &Value::Null).unwrap(), "static");
    }

    #[test]
    fn syntax_errors_name_the_template() {
        let mut templates = TemplateRegistry::new();
        let err = templates.add_raw("ns", "broken", "{{ oops").unwrap_err();
        assert!(err.to_string().starts_with("template ns/broken"));
    }

    #[test]
    fn loads_supported_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plugin_description.liquid"), "  A test plugin \n").unwrap();
        std::fs::write(dir.path().join("reply.md"), "Reply to {{ user }}").unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let mut templates = TemplateRegistry::new();
        let loaded = templates.load_dir("plugin-test", dir.path()).unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(templates.keys(), vec![
            "plugin-test/plugin_description",
            "plugin-test/reply"
        ]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let mut templates = TemplateRegistry::new();
        let err = templates
            .load_dir("ns", Path::new("/no/such/prompts"))
            .unwrap_err();
        assert!(matches!(err, Error::TemplateDir { .. }));
    }
}
