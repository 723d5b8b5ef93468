//! Boot-time configuration schema (spec §6.3).

use gateway_instrument::{AccountType, ExchangeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Credentials and environment flag for one venue, keyed by [`ExchangeId`]
/// in [`GatewayConfig::basic_config`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    pub api_key: String,
    pub secret: String,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub testnet: bool,
}

/// One public (market-data) connector to instantiate for a venue.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublicConnConfig {
    pub account_type: AccountType,
    #[serde(default = "default_true")]
    pub enable_rate_limit: bool,
    #[serde(default)]
    pub custom_url: Option<String>,
}

/// One private (order/account) connector to instantiate for a venue.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrivateConnConfig {
    pub account_type: AccountType,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_delay_initial_ms")]
    pub delay_initial_ms: u64,
    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Seed balance for the mock connector; ignored against a real venue.
    #[serde(default)]
    pub initial_balance: Option<Decimal>,
    #[serde(default)]
    pub overwrite_balance: bool,
    #[serde(default)]
    pub overwrite_position: bool,
    #[serde(default)]
    pub fee_rate: Option<Decimal>,
    #[serde(default)]
    pub quote_currency: Option<String>,
    #[serde(default)]
    pub update_interval: Option<u64>,
    #[serde(default)]
    pub leverage: Option<u32>,
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_delay_initial_ms() -> u64 {
    100
}

fn default_delay_max_ms() -> u64 {
    5_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

/// Persistence backend selected for the Cache (spec §4.I).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Postgresql,
}

/// Log level, output directory, rotated file name and rotation policy for
/// `gateway_core::logging`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub directory: String,
    pub file_name: String,
    #[serde(default)]
    pub rotation: LogRotation,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Full configuration consumed at Engine boot (spec §6.3).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    pub strategy_id: String,
    pub user_id: String,
    pub basic_config: HashMap<ExchangeId, BasicConfig>,
    pub public_conn_config: HashMap<ExchangeId, Vec<PublicConnConfig>>,
    pub private_conn_config: HashMap<ExchangeId, Vec<PrivateConnConfig>>,
    pub storage_backend: StorageBackend,
    pub db_path: String,
    pub cache_sync_interval: u64,
    pub cache_expired_time: u64,
    pub cache_order_maxsize: usize,
    pub cache_order_expired_time: u64,
    #[serde(default)]
    pub is_mock: bool,
    pub log_config: LogConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialises_minimal_config_with_defaults() {
        let raw = serde_json::json!({
            "strategy_id": "momentum-v1",
            "user_id": "user-1",
            "basic_config": {
                "Binance": { "api_key": "k", "secret": "s", "testnet": true }
            },
            "public_conn_config": {
                "Binance": [{ "account_type": "BinanceSpot" }]
            },
            "private_conn_config": {
                "Binance": [{ "account_type": "BinanceSpot" }]
            },
            "storage_backend": "sqlite",
            "db_path": "./gateway.db",
            "cache_sync_interval": 1000,
            "cache_expired_time": 60_000,
            "cache_order_maxsize": 10_000,
            "cache_order_expired_time": 86_400_000,
            "is_mock": true,
            "log_config": {
                "directory": "./logs",
                "file_name": "gateway.log"
            }
        });
        let config: GatewayConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.strategy_id, "momentum-v1");
        assert!(config.is_mock);
        assert_eq!(config.log_config.level, "info");
        assert_eq!(config.log_config.rotation, LogRotation::Daily);
        let private = &config.private_conn_config[&ExchangeId::Binance][0];
        assert_eq!(private.max_retries, 3);
        assert_eq!(private.backoff_factor, 2.0);
    }
}
