//! Session configuration loader.
//!
//! Reads a TOML file into [`SessionConfig`]. Two flavours:
//! - [`load_session_config`] is tolerant: a missing, unreadable or malformed
//!   file logs and falls back to defaults. Used for the implicit default path.
//! - [`read_session_config`] is strict and returns a [`ConfigError`]. Used
//!   when the user names a file explicitly.

use std::path::{Path, PathBuf};

use thiserror::Error;

use colloquy_types::config::SessionConfig;

/// File name looked up in the platform config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Default config location: `{config_dir}/colloquy/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("colloquy").join(CONFIG_FILE_NAME))
}

/// Read and parse `path`, failing on any error.
pub async fn read_session_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_session_config(path, &content)
}

/// Load `path`, falling back to [`SessionConfig::default()`].
///
/// - Missing file: defaults, logged at debug.
/// - Unreadable or malformed file: defaults, logged as a warning.
pub async fn load_session_config(path: &Path) -> SessionConfig {
    match read_session_config(path).await {
        Ok(config) => config,
        Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            SessionConfig::default()
        }
        Err(err) => {
            tracing::warn!("{err}, using defaults");
            SessionConfig::default()
        }
    }
}

fn parse_session_config(path: &Path, content: &str) -> Result<SessionConfig, ConfigError> {
    toml::from_str::<SessionConfig>(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
