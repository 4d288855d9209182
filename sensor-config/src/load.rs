use std::io;
use std::path::{Path, PathBuf};

use config::builder::{ConfigBuilder, DefaultState};
use config::{Environment as EnvironmentSource, File};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory holding the configuration files, relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// File stem of the configuration shared by every environment.
const BASE_STEM: &str = "base";

/// Extensions tried for every configuration file, in order.
const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),

    #[error("configuration directory `{0}` does not exist")]
    MissingConfigurationDirectory(PathBuf),

    /// None of the supported extensions matched for a configuration file.
    #[error("no `{stem}` configuration file in `{directory}`; attempted: {attempted}")]
    ConfigurationFileMissing {
        stem: String,
        directory: PathBuf,
        attempted: String,
    },

    /// A configuration file exists but is not valid.
    #[error("failed to parse `{path}`: {source}")]
    ConfigurationFileLoad {
        path: PathBuf,
        source: config::ConfigError,
    },

    /// The merged layers do not match the target type.
    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads `T` from the `configuration` directory of the working directory.
///
/// The environment comes from `APP_ENVIRONMENT`. See [`load_config_from`] for the layering.
pub fn load_config<T: DeserializeOwned>() -> Result<T, LoadConfigError> {
    let working_dir = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    let environment = Environment::load()?;

    load_config_from(&working_dir.join(CONFIGURATION_DIR), environment)
}

/// Loads `T` from `directory` for the given environment.
///
/// Layers, from lowest to highest precedence:
/// 1. `base.(yaml|yml|json)`
/// 2. `{environment}.(yaml|yml|json)`
/// 3. `APP_`-prefixed environment variables, with `__` separating nested keys
///    (`APP_ENGINE__BATCH__MAX_SIZE`).
pub fn load_config_from<T: DeserializeOwned>(
    directory: &Path,
    environment: Environment,
) -> Result<T, LoadConfigError> {
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingConfigurationDirectory(
            directory.to_path_buf(),
        ));
    }

    let mut builder = config::Config::builder();
    for stem in [BASE_STEM, environment.as_str()] {
        let path = locate(directory, stem)?;
        builder = add_file(builder, path)?;
    }

    builder
        .add_source(
            EnvironmentSource::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .and_then(|settings| settings.try_deserialize())
        .map_err(LoadConfigError::Deserialization)
}

/// Returns the first existing `{stem}.{extension}` file in `directory`.
fn locate(directory: &Path, stem: &str) -> Result<PathBuf, LoadConfigError> {
    let candidates = EXTENSIONS.map(|extension| directory.join(format!("{stem}.{extension}")));

    if let Some(path) = candidates.iter().find(|path| path.is_file()) {
        return Ok(path.clone());
    }

    let attempted = candidates
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ");

    Err(LoadConfigError::ConfigurationFileMissing {
        stem: stem.to_owned(),
        directory: directory.to_path_buf(),
        attempted,
    })
}

/// Adds `path` as a layer, building once so parse errors point at the offending file.
fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: PathBuf,
) -> Result<ConfigBuilder<DefaultState>, LoadConfigError> {
    let builder = builder.add_source(File::from(path.as_path()));

    match builder.build_cloned() {
        Ok(_) => Ok(builder),
        Err(source) => Err(LoadConfigError::ConfigurationFileLoad { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde::Deserialize;

    use super::*;
    use crate::shared::EngineConfig;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        engine: EngineConfig,
        name: String,
    }

    const BASE_YAML: &str = "\
name: base
engine:
  production_interval_ms: 100
  max_workers: 3
  batch:
    max_size: 100
    max_fill_ms: 500
";

    #[test]
    fn environment_file_overrides_base_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.yaml"), BASE_YAML).unwrap();
        fs::write(
            dir.path().join("prod.json"),
            r#"{"name": "prod", "engine": {"max_workers": 8}}"#,
        )
        .unwrap();

        let config: TestConfig = load_config_from(dir.path(), Environment::Prod).unwrap();

        assert_eq!(config.name, "prod");
        assert_eq!(config.engine.max_workers, 8);
        assert_eq!(config.engine.batch.max_size, 100);
        assert_eq!(config.engine.queue.envelope_capacity, 100);
    }

    #[test]
    fn missing_environment_file_lists_attempted_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.yaml"), "name: base\n").unwrap();

        let err = load_config_from::<TestConfig>(dir.path(), Environment::Dev).unwrap_err();

        match err {
            LoadConfigError::ConfigurationFileMissing {
                stem, attempted, ..
            } => {
                assert_eq!(stem, "dev");
                assert!(attempted.contains("dev.yaml"));
                assert!(attempted.contains("dev.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.yaml"), BASE_YAML).unwrap();
        fs::write(dir.path().join("dev.json"), "{ not json").unwrap();

        let err = load_config_from::<TestConfig>(dir.path(), Environment::Dev).unwrap_err();

        assert!(matches!(
            err,
            LoadConfigError::ConfigurationFileLoad { path, .. } if path.ends_with("dev.json")
        ));
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = load_config_from::<TestConfig>(&missing, Environment::Dev).unwrap_err();

        assert!(matches!(
            err,
            LoadConfigError::MissingConfigurationDirectory(path) if path == missing
        ));
    }
}
