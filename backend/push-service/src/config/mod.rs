//! Configuration management
//!
//! Values come from the process environment with the `PUSH_` prefix
//! (`PUSH_PORT`, `PUSH_HEARTBEAT_INTERVAL_SECS`, ...). A `.env` file is
//! loaded first when present.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Interval between server pings on each open channel
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// A channel with no client activity for this long is closed
    #[serde(default = "default_client_timeout_secs")]
    pub client_timeout_secs: u64,
    /// Maximum inbound WebSocket frame size in bytes
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8085
}

fn default_heartbeat_interval_secs() -> u64 {
    5
}

fn default_client_timeout_secs() -> u64 {
    30
}

fn default_max_frame_size() -> usize {
    64 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            client_timeout_secs: default_client_timeout_secs(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Config = envy::prefixed("PUSH_").from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_secs == 0 {
            return Err(AppError::Config(
                "PUSH_HEARTBEAT_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }
        if self.client_timeout_secs <= self.heartbeat_interval_secs {
            return Err(AppError::Config(format!(
                "PUSH_CLIENT_TIMEOUT_SECS ({}) must exceed PUSH_HEARTBEAT_INTERVAL_SECS ({})",
                self.client_timeout_secs, self.heartbeat_interval_secs
            )));
        }
        if self.max_frame_size == 0 {
            return Err(AppError::Config(
                "PUSH_MAX_FRAME_SIZE must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}
