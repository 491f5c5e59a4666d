//! Configuration loading for the Dropper server.
//!
//! Settings layer in increasing precedence: built-in defaults, an optional
//! TOML config file (default `~/.config/dropper/config.toml`), `DROPPER_*`
//! environment variables, then CLI flags applied by the binary. The
//! credential itself never lives in the file; it always comes from the
//! `DROP_AUTH` environment variable.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("bind host must not be empty")]
    EmptyHost,

    #[error("bind port must be nonzero")]
    InvalidPort,
}

/// Main configuration structure for the Dropper server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Bind address configuration.
    pub server: ServerConfig,

    /// Served tree configuration.
    pub files: FilesConfig,

    /// Authentication settings.
    pub auth: AuthConfig,
}

/// Bind address configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind the listening socket to.
    pub host: String,

    /// TCP port to listen on.
    pub port: u16,
}

/// Served tree configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilesConfig {
    /// Root directory to serve; created at startup if absent.
    pub root: PathBuf,
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Whether requests require a Basic-auth credential.
    pub required: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { required: true }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dropper")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - DROPPER_HOST: override the bind host
    /// - DROPPER_PORT: override the bind port
    /// - DROPPER_ROOT: override the served root directory
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("DROPPER_HOST") {
            if !host.is_empty() {
                tracing::info!("Overriding bind host from environment: {}", host);
                self.server.host = host;
            }
        }

        if let Ok(port) = std::env::var("DROPPER_PORT") {
            if !port.is_empty() {
                match port.parse::<u16>() {
                    Ok(port) => {
                        tracing::info!("Overriding bind port from environment: {}", port);
                        self.server.port = port;
                    }
                    Err(_) => {
                        tracing::warn!("Ignoring unparseable DROPPER_PORT value: {}", port);
                    }
                }
            }
        }

        if let Ok(root) = std::env::var("DROPPER_ROOT") {
            if !root.is_empty() {
                tracing::info!("Overriding root directory from environment: {}", root);
                self.files.root = PathBuf::from(root);
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with a
    /// helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    ///
    /// The default path is `~/.config/dropper/config.toml`.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// The `host:port` string to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
