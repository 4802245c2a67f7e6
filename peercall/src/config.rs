//! Configuration for the `PeerCall` client library.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. Environment variables (`PEERCALL_RELAY_URL`, `PEERCALL_LOG`)
//! 2. TOML config file (`~/.config/peercall/config.toml`)
//! 3. Compiled defaults
//!
//! A missing config file is not an error (defaults are used); an explicit
//! path that doesn't exist is.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur when loading client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure for the client.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ClientConfigFile {
    signaling: SignalingFileConfig,
}

/// `[signaling]` section of the client config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SignalingFileConfig {
    relay_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay server WebSocket URL.
    pub relay_url: String,
    /// Timeout for connecting to the relay server, honored by
    /// [`crate::channel::SignalChannel::connect_with_config`].
    pub connect_timeout: Duration,
    /// Log level filter string for the embedding application's tracing
    /// subscriber; this library only emits events, it never installs one.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:3000/ws".to_string(),
            connect_timeout: Duration::from_secs(10),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging environment variables and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit config file cannot be read
    /// or parsed.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let file = load_config_file(explicit_path)?;
        let env_url = std::env::var("PEERCALL_RELAY_URL").ok();
        let env_log = std::env::var("PEERCALL_LOG").ok();
        Ok(Self::resolve(env_url, env_log, &file))
    }

    /// Resolve a `ClientConfig` from env overrides and a parsed config file.
    ///
    /// Priority: env > file > default.
    #[must_use]
    fn resolve(
        env_url: Option<String>,
        env_log: Option<String>,
        file: &ClientConfigFile,
    ) -> Self {
        let defaults = Self::default();

        Self {
            relay_url: env_url
                .or_else(|| file.signaling.relay_url.clone())
                .unwrap_or(defaults.relay_url),
            connect_timeout: file
                .signaling
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            log_level: env_log
                .or_else(|| file.signaling.log_level.clone())
                .unwrap_or(defaults.log_level),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file for the client.
fn load_config_file(
    explicit_path: Option<&std::path::Path>,
) -> Result<ClientConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ClientConfigFile::default());
        };
        config_dir.join("peercall").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
