//! Environment-based configuration (`SNAP_*` variables), mirroring the
//! teacher's `ZVaultConfig::from_env` idiom: required values fail fast,
//! optional values carry sane per-network defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::crypto::Network;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            _ => Err(ConfigError::InvalidValue(
                "SNAP_NETWORK".to_string(),
                format!("unknown network: {s}"),
            )),
        }
    }
}

/// Runtime configuration for an `Agent` and its transports/stores.
#[derive(Debug, Clone)]
pub struct SnapConfig {
    pub network: Network,
    /// How long a `(from, id)` pair is remembered by the replay store.
    pub replay_ttl: Duration,
    /// Maximum acceptable clock skew between a message's `timestamp` and
    /// the receiving agent's wall clock.
    pub timestamp_skew: Duration,
    pub log_level: String,
    pub log_json: bool,
    pub http_bind_address: String,
}

impl SnapConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let network: Network = env::var("SNAP_NETWORK")
            .unwrap_or_else(|_| "testnet".to_string())
            .parse()?;

        let replay_ttl_secs: u64 = env::var("SNAP_REPLAY_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let timestamp_skew_secs: u64 = env::var("SNAP_TIMESTAMP_SKEW_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let log_level = env::var("SNAP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = matches!(network, Network::Mainnet);

        let http_bind_address =
            env::var("SNAP_HTTP_BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:7780".to_string());

        Ok(Self {
            network,
            replay_ttl: Duration::from_secs(replay_ttl_secs),
            timestamp_skew: Duration::from_secs(timestamp_skew_secs),
            log_level,
            log_json,
            http_bind_address,
        })
    }
}
