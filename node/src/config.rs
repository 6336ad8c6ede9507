// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};
use mams_kernel::config::SESSION_TTL_SECS;
use thiserror::Error;

/// Secret used when `MAMS_TOKEN_SECRET` is unset. Fine for local runs only.
pub const DEV_TOKEN_SECRET: &str = "dev_secret";

#[derive(Error, Debug)]
#[error("invalid value for {var}: '{value}'")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    /// Holds `events.log` and `users.json`.
    pub data_dir: PathBuf,
    pub token_secret: String,
    pub token_ttl_secs: i64,
    /// Out-of-band grant for the `/admin/*/replace` tools. `None` disables it.
    pub admin_tool_key: Option<String>,
    /// Offset used to turn business dates into calendar days for filters.
    pub utc_offset: FixedOffset,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5050)),
            data_dir: PathBuf::from("data"),
            token_secret: DEV_TOKEN_SECRET.to_string(),
            token_ttl_secs: SESSION_TTL_SECS,
            admin_tool_key: None,
            utc_offset: Utc.fix(),
        }
    }
}

impl NodeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Ok(raw) = std::env::var("MAMS_BIND_ADDR") {
            cfg.bind_addr = raw.parse().map_err(|_| ConfigError {
                var: "MAMS_BIND_ADDR",
                value: raw.clone(),
            })?;
        }
        if let Ok(raw) = std::env::var("MAMS_DATA_DIR") {
            cfg.data_dir = PathBuf::from(raw);
        }
        if let Ok(raw) = std::env::var("MAMS_TOKEN_SECRET") {
            cfg.token_secret = raw;
        }
        if let Ok(raw) = std::env::var("MAMS_TOKEN_TTL_SECS") {
            cfg.token_ttl_secs = raw
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError {
                    var: "MAMS_TOKEN_TTL_SECS",
                    value: raw.clone(),
                })?;
        }
        cfg.admin_tool_key = std::env::var("MAMS_ADMIN_TOOL_KEY")
            .ok()
            .filter(|key| !key.is_empty());
        if let Ok(raw) = std::env::var("MAMS_UTC_OFFSET_MINUTES") {
            cfg.utc_offset = raw
                .parse::<i32>()
                .ok()
                .and_then(|minutes| minutes.checked_mul(60))
                .and_then(FixedOffset::east_opt)
                .ok_or(ConfigError {
                    var: "MAMS_UTC_OFFSET_MINUTES",
                    value: raw.clone(),
                })?;
        }

        Ok(cfg)
    }

    pub fn event_log_path(&self) -> PathBuf {
        self.data_dir.join("events.log")
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.token_secret == DEV_TOKEN_SECRET
    }
}
