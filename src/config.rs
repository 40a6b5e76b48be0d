//! Server configuration
//!
//! Values come from an optional TOML file; `main` layers command line
//! flags on top. Every field has a default so an empty file is valid.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Interface to bind
    pub host: String,
    /// TCP port; `0` picks a free port
    pub port: u16,
    /// Seconds without client input before the user is evicted
    pub idle_timeout_secs: u64,
    /// Per-user outbound queue size
    pub mailbox_capacity: usize,
    /// Global broadcast queue size
    pub queue_capacity: usize,
    /// Longest accepted input line in bytes, excluding the newline
    pub max_line_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            idle_timeout_secs: 60,
            mailbox_capacity: 32,
            queue_capacity: 256,
            max_line_length: 1024,
        }
    }
}

impl Config {
    /// Load and validate a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text
    pub fn from_toml(text: &str) -> Result<Self, AppError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.idle_timeout_secs == 0 {
            return Err(AppError::InvalidConfig(
                "idle_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.mailbox_capacity == 0 || self.queue_capacity == 0 {
            return Err(AppError::InvalidConfig(
                "queue capacities must be greater than 0".to_string(),
            ));
        }
        if self.max_line_length == 0 {
            return Err(AppError::InvalidConfig(
                "max_line_length must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
