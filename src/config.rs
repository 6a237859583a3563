use std::env;
use std::time::Duration;

use crate::error::{PalisadeError, Result};
use crate::pool::SelectionStrategy;

/// Library configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Pool behavior configuration
    pub pool: PoolConfig,
    /// Store backend configuration
    pub store: StoreConfig,
    /// Inventory source configuration
    pub inventory: InventoryConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Default selection strategy (random, smart, sequential)
    pub strategy: SelectionStrategy,
    /// Default cooldown between selections of the same proxy, in seconds
    pub cooldown_secs: u64,
    /// Failure count at which a proxy is evicted
    pub fail_threshold: u64,
}

impl PoolConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::Smart,
            cooldown_secs: 60,
            fail_threshold: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis connection URL
    pub url: String,
    /// Deadline applied to each store operation, in seconds
    pub op_timeout_secs: u64,
}

impl StoreConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
            op_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// API key for the listing service
    pub api_key: String,
    /// Number of proxies to request across all pages
    pub amount: usize,
    /// Listing endpoint
    pub base_url: String,
    /// Per-request timeout, in seconds
    pub request_timeout_secs: u64,
}

impl InventoryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            amount: 250,
            base_url: "https://proxy.webshare.io/api/proxy/list/".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let fail_threshold: u64 = get_env_or("POOL_FAIL_THRESHOLD", "3").parse().map_err(|_| {
            PalisadeError::InvalidConfig("POOL_FAIL_THRESHOLD must be a number".into())
        })?;
        if fail_threshold == 0 {
            return Err(PalisadeError::InvalidConfig(
                "POOL_FAIL_THRESHOLD must be at least 1".into(),
            ));
        }

        Ok(Config {
            pool: PoolConfig {
                strategy: SelectionStrategy::from_str(&get_env_or("POOL_STRATEGY", "smart")),
                cooldown_secs: get_env_or("POOL_COOLDOWN_SECS", "60").parse().map_err(|_| {
                    PalisadeError::InvalidConfig("POOL_COOLDOWN_SECS must be a number".into())
                })?,
                fail_threshold,
            },
            store: StoreConfig {
                url: get_env_or("REDIS_URL", "redis://localhost:6379/0"),
                op_timeout_secs: get_env_or("REDIS_OP_TIMEOUT_SECS", "5").parse().map_err(
                    |_| {
                        PalisadeError::InvalidConfig(
                            "REDIS_OP_TIMEOUT_SECS must be a number".into(),
                        )
                    },
                )?,
            },
            inventory: InventoryConfig {
                api_key: get_env_or("INVENTORY_API_KEY", ""),
                amount: get_env_or("INVENTORY_AMOUNT", "250").parse().map_err(|_| {
                    PalisadeError::InvalidConfig("INVENTORY_AMOUNT must be a number".into())
                })?,
                base_url: get_env_or(
                    "INVENTORY_URL",
                    "https://proxy.webshare.io/api/proxy/list/",
                ),
                request_timeout_secs: get_env_or("INVENTORY_REQUEST_TIMEOUT_SECS", "30")
                    .parse()
                    .map_err(|_| {
                        PalisadeError::InvalidConfig(
                            "INVENTORY_REQUEST_TIMEOUT_SECS must be a number".into(),
                        )
                    })?,
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "json"),
            },
        })
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
