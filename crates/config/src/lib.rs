//! Configuration loading, env substitution and validation.
//!
//! Config files: `maiar.toml`, `maiar.yaml`, `maiar.yml` or `maiar.json`,
//! searched in `./` then `~/.config/maiar/` (or the directory set with
//! [`set_config_dir`]).
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in all
//! string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        clear_config_dir, config_dir, discover_and_load, find_config_file, load_config,
        parse_config, set_config_dir, write_default_config,
    },
    schema::{CapabilitiesConfig, MaiarConfig, PluginConfig, RuntimeConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
