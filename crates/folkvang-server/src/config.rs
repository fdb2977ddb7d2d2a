//! Server configuration
//!
//! Values come from an optional RON file and are then overridden by the
//! environment (`PORT`, `ADMIN_TOKEN`, `SECRET_KEY`). The built-in defaults
//! are for local development only.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_ADMIN_TOKEN: &str = "admin123";
pub const DEFAULT_SECRET_KEY: &str = "folkvang-secret-key-2024";

/// Root configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Credential required by `POST /api/reset`
    #[serde(default = "default_admin_token")]
    pub admin_token: String,
    /// Session-signing secret
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_admin_token() -> String {
    DEFAULT_ADMIN_TOKEN.to_string()
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_token: default_admin_token(),
            secret_key: default_secret_key(),
        }
    }
}

impl Config {
    /// Load configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            ron::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// File (if given) overlaid with the process environment
    pub fn from_sources(path: Option<&str>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        base.with_env(|key| std::env::var(key).ok())
    }

    /// Apply `PORT`, `ADMIN_TOKEN` and `SECRET_KEY` overrides from `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Validation(format!("invalid PORT: {:?}", port)))?;
        }
        if let Some(token) = lookup("ADMIN_TOKEN") {
            self.admin_token = token;
        }
        if let Some(secret) = lookup("SECRET_KEY") {
            self.secret_key = secret;
        }
        Ok(self)
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::Validation(format!("invalid listen address {}", addr)))
    }

    pub fn uses_default_admin_token(&self) -> bool {
        self.admin_token == DEFAULT_ADMIN_TOKEN
    }

    pub fn uses_default_secret_key(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}
