use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::MaiarConfig,
    template::default_config_template,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["maiar.toml", "maiar.yaml", "maiar.yml", "maiar.json"];

static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Use `dir` instead of the platform config directory.
pub fn set_config_dir(dir: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = Some(dir);
}

/// Drop a directory set with [`set_config_dir`].
pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = None;
}

/// Returns the user-global config directory (`~/.config/maiar/` unless
/// overridden).
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "maiar").map(|d| d.config_dir().to_path_buf())
}

/// Load config from `path` (any supported format).
pub fn load_config(path: &Path) -> Result<MaiarConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    parse_config(&raw, extension)
}

/// Parse raw config text in the format named by `extension`.
pub fn parse_config(raw: &str, extension: &str) -> Result<MaiarConfig> {
    match extension {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./maiar.{toml,yaml,yml,json}` (project-local)
/// 2. `<config dir>/maiar.{toml,yaml,yml,json}` (user-global)
///
/// Returns `MaiarConfig::default()` if no file is found or the file fails to
/// load.
pub fn discover_and_load() -> MaiarConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return MaiarConfig::default();
    };

    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            MaiarConfig::default()
        },
    }
}

/// Find the first config file in the standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists());
    if local.is_some() {
        return local;
    }

    let dir = config_dir()?;
    find_in_dir(&dir)
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Write the documented default template to the user-global config
/// directory. Refuses to overwrite an existing config file.
pub fn write_default_config() -> Result<PathBuf> {
    let dir = config_dir().ok_or(Error::NoConfigDirectory)?;
    if let Some(existing) = find_in_dir(&dir) {
        return Err(Error::AlreadyExists { path: existing });
    }
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("maiar.toml");
    std::fs::write(&path, default_config_template())?;
    debug!(path = %path.display(), "wrote default config");
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn loads_each_supported_format() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("maiar.toml");
        std::fs::write(&toml_path, "[runtime]\nstructured_output_attempts = 5\n").unwrap();
        assert_eq!(
            load_config(&toml_path).unwrap().runtime.structured_output_attempts,
            5
        );

        let yaml_path = dir.path().join("maiar.yaml");
        std::fs::write(&yaml_path, "runtime:\n  structured_output_attempts: 6\n").unwrap();
        assert_eq!(
            load_config(&yaml_path).unwrap().runtime.structured_output_attempts,
            6
        );

        let json_path = dir.path().join("maiar.json");
        std::fs::write(&json_path, r#"{"runtime": {"structured_output_attempts": 7}}"#).unwrap();
        assert_eq!(
            load_config(&json_path).unwrap().runtime.structured_output_attempts,
            7
        );
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = parse_config("", "ini").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref extension } if extension == "ini"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/definitely/not/here/maiar.toml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here/maiar.toml"));
    }

    #[test]
    fn finds_config_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_in_dir(dir.path()), None);

        let yaml = dir.path().join("maiar.yml");
        std::fs::write(&yaml, "{}").unwrap();
        assert_eq!(find_in_dir(dir.path()), Some(yaml));
    }

    #[test]
    fn default_template_parses() {
        let config = parse_config(&default_config_template(), "toml").unwrap();
        assert!(config.runtime.abort_on_plugin_failure);
    }
}
