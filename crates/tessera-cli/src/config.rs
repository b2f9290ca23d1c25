//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, local directory, system directory).

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use tessera::{TesseraError, config::MapperConfig};

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for TesseraError {
    fn from(err: ConfigError) -> Self {
        TesseraError::Io(io::Error::new(io::ErrorKind::Other, err.to_string()))
    }
}

/// Settings read from a configuration file.
///
/// ```toml
/// schemas = ["schema/dmn.json", "schema/dmndi.json"]
///
/// [read]
/// strict = true
///
/// [write]
/// synthesize_ids = true
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    /// Descriptor files, relative to the configuration file.
    #[serde(default)]
    schemas: Vec<PathBuf>,

    #[serde(flatten)]
    mapper: MapperConfig,
}

impl CliConfig {
    pub fn schemas(&self) -> &[PathBuf] {
        &self.schemas
    }

    pub fn mapper(&self) -> &MapperConfig {
        &self.mapper
    }

    /// Make relative descriptor paths relative to `base` instead of the
    /// working directory.
    fn resolve_schemas(mut self, base: &Path) -> Self {
        for schema in &mut self.schemas {
            if schema.is_relative() {
                *schema = base.join(&*schema);
            }
        }
        self
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (tessera/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path to config file
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<CliConfig, TesseraError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("tessera/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "tessera", "tessera") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(CliConfig::default())
}

/// Load configuration from a TOML file
///
/// # Errors
///
/// Returns error if:
/// - File doesn't exist
/// - File cannot be read
/// - TOML parsing fails
/// - A listed descriptor path is empty
fn load_config_file(path: impl AsRef<Path>) -> Result<CliConfig, TesseraError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;
    let config: CliConfig =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    if config.schemas.iter().any(|schema| schema.as_os_str().is_empty()) {
        return Err(ConfigError::Validation("schema paths must not be empty".to_string()).into());
    }

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.resolve_schemas(base))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_schemas_resolve_against_config_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "schemas = [\"schema/dmn.json\"]\n\n[read]\nstrict = true\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.schemas(), [dir.path().join("schema/dmn.json")]);
        assert!(config.mapper().read().strict());
        assert!(config.mapper().write().xml_declaration());
    }

    #[test]
    fn test_missing_explicit_config() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(dir.path().join("absent.toml"))).unwrap_err();

        assert!(err.to_string().contains("Missing configuration file"));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "schemas = 3\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();

        assert!(err.to_string().contains("Failed to parse TOML configuration"));
    }
}
