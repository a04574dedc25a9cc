//! Configuration validation.
//!
//! Checks TOML syntax, flags unknown or misspelled keys, surfaces type errors
//! and warns about settings that parse but cannot work.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use crate::schema::MaiarConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "type-error", "semantic" or "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "runtime.prompt_dir"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Expected shape of the configuration.
enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    /// Dynamic keys whose values share a shape.
    Map(Box<KnownKeys>),
    /// Free-form subtree, not inspected.
    Any,
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Any, Leaf, Map, Struct};

    Struct(HashMap::from([
        (
            "runtime",
            Struct(HashMap::from([
                ("abort_on_plugin_failure", Leaf),
                ("startup_notice_delay_ms", Leaf),
                ("structured_output_attempts", Leaf),
                ("prompts_dir", Leaf),
            ])),
        ),
        (
            "capabilities",
            Struct(HashMap::from([("defaults", Map(Box::new(Leaf)))])),
        ),
        (
            "plugins",
            Map(Box::new(Struct(HashMap::from([
                ("enabled", Leaf),
                ("command_prefix", Leaf),
                ("prompts_dir", Leaf),
                ("settings", Any),
            ])))),
        ),
    ]))
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (candidate, levenshtein(needle, candidate)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(candidate, d)| (d, candidate))
        .map(|(candidate, _)| candidate)
}

/// Validate the config at `path`, or the discovered config file when `None`.
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path
        .map(Path::to_path_buf)
        .or_else(crate::loader::find_config_file);

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let extension = actual_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("toml");

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(content) if extension == "toml" => validate_toml_str(&content),
        Ok(content) => validate_other(&content, extension),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// YAML and JSON configs only get the parse and semantic checks.
fn validate_other(content: &str, extension: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();
    match crate::loader::parse_config(content, extension) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "syntax",
            path: String::new(),
            message: e.to_string(),
        }),
    }
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Validate a TOML string without touching the file system.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&toml_value, &build_schema_map(), "", &mut diagnostics);

    match toml::from_str::<MaiarConfig>(toml_str) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    match (value, schema) {
        (toml::Value::Table(table), KnownKeys::Struct(fields)) => {
            let mut known_keys: Vec<&str> = fields.keys().copied().collect();
            known_keys.sort_unstable();
            for (key, child_value) in table {
                let path = join(key);
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child_value, child_schema, &path, diagnostics);
                    continue;
                }
                let message = match suggest(key, &known_keys, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "unknown-field",
                    path,
                    message,
                });
            }
        },
        (toml::Value::Table(table), KnownKeys::Map(value_schema)) => {
            for (key, child_value) in table {
                check_unknown_fields(child_value, value_schema, &join(key), diagnostics);
            }
        },
        // Leaf, free-form or type mismatch (reported by deserialization)
        _ => {},
    }
}

fn check_semantic_warnings(config: &MaiarConfig, diagnostics: &mut Vec<Diagnostic>) {
    if config.runtime.structured_output_attempts == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "runtime.structured_output_attempts".into(),
            message: "0 attempts means structured output requests always fail".into(),
        });
    }

    for (capability, model) in &config.capabilities.defaults {
        if model.trim().is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "semantic",
                path: format!("capabilities.defaults.{capability}"),
                message: "default model must not be empty".into(),
            });
        }
    }

    for (id, plugin) in &config.plugins {
        if plugin.command_prefix.as_deref().is_some_and(str::is_empty) {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "semantic",
                path: format!("plugins.{id}.command_prefix"),
                message: "empty command prefix makes every message a command".into(),
            });
        }
        if let Some(dir) = &plugin.prompts_dir
            && !dir.is_dir()
        {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "file-ref",
                path: format!("plugins.{id}.prompts_dir"),
                message: format!("directory {} does not exist", dir.display()),
            });
        }
    }

    if let Some(dir) = &config.runtime.prompts_dir
        && !dir.is_dir()
    {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "file-ref",
            path: "runtime.prompts_dir".into(),
            message: format!("directory {} does not exist", dir.display()),
        });
    }
}
