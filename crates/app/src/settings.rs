//! Configuration loading.
//!
//! Sources, later ones winning: `tether.toml` (or the file named by
//! `--config` / `TETHER_CONFIG`), `TETHER_*` environment variables, then
//! command-line flags.

use std::path::PathBuf;

use config::{Config, Environment, File};
use tether_application::ClientConfig;

use crate::cli::Cli;

/// Default config file stem looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "tether";
const ENV_PREFIX: &str = "TETHER";

/// Errors raised while assembling the configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A source could not be read or merged.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// No default storage location exists on this platform.
    #[error("no data directory available; pass --storage-path")]
    NoDataDir,
}

/// Builds the client config from every source.
///
/// # Errors
///
/// Returns an error if a source is malformed or a required key is missing.
pub fn load(cli: &Cli) -> Result<ClientConfig, SettingsError> {
    let file = match &cli.config {
        Some(path) => File::from(path.as_path()).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let settings = Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .set_override_option("base_url", cli.base_url.clone())?
        .set_override_option("client_app_id", cli.client_app_id.clone())?
        .set_override_option(
            "storage_path",
            cli.storage_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )?
        .set_override_option("request_timeout_ms", cli.timeout_ms)?
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Where the user registry lives for this config.
///
/// # Errors
///
/// Returns `NoDataDir` if no path is configured and the platform has no
/// data directory.
pub fn storage_path(config: &ClientConfig) -> Result<PathBuf, SettingsError> {
    if let Some(path) = &config.storage_path {
        return Ok(path.clone());
    }
    let base = dirs::data_dir().ok_or(SettingsError::NoDataDir)?;
    Ok(base
        .join("tether")
        .join(&config.client_app_id)
        .join(tether_infrastructure::REGISTRY_FILE_NAME))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("tether.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_file_values_are_loaded_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "base_url = \"https://backend.test\"\nclient_app_id = \"app-1\"\nlocal_app_name = \"demo\"\n",
        );
        let cli = Cli::parse_from(["tether", "--config", path.to_str().unwrap(), "users"]);

        let config = load(&cli).unwrap();

        assert_eq!(config.base_url, "https://backend.test");
        assert_eq!(config.client_app_id, "app-1");
        assert_eq!(config.local_app_name.as_deref(), Some("demo"));
        assert_eq!(config.request_timeout_ms, 60_000);
    }

    #[test]
    fn test_flags_override_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "base_url = \"https://backend.test\"\nclient_app_id = \"app-1\"\n",
        );
        let cli = Cli::parse_from([
            "tether",
            "--config",
            path.to_str().unwrap(),
            "--app-id",
            "app-2",
            "--timeout-ms",
            "250",
            "--storage-path",
            "/tmp/users.json",
            "users",
        ]);

        let config = load(&cli).unwrap();

        assert_eq!(config.client_app_id, "app-2");
        assert_eq!(config.request_timeout_ms, 250);
        assert_eq!(storage_path(&config).unwrap(), PathBuf::from("/tmp/users.json"));
    }

    #[test]
    fn test_missing_required_key_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "client_app_id = \"app-1\"\n");
        let cli = Cli::parse_from(["tether", "--config", path.to_str().unwrap(), "users"]);

        assert!(load(&cli).is_err());
    }
}
