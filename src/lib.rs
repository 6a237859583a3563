//! Palisade - Proxy Pool Manager
//!
//! A Redis-backed HTTP proxy pool written in Rust.
//!
//! ## Features
//!
//! - Multiple proxy selection strategies (random, smart, sequential)
//! - Per-proxy health accounting with cooldown-gated reuse
//! - Automatic eviction of proxies that repeatedly fail
//! - Webshare-style inventory loading with full-refresh support
//! - Pluggable storage: Redis for deployment, in-memory for tests
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use palisade::{Config, ProxyPool, RedisStore, SelectionStrategy};
//!
//! # async fn run() -> palisade::Result<()> {
//! let config = Config::from_env()?;
//! let store = Arc::new(RedisStore::connect(&config.store).await?);
//! let pool = ProxyPool::new(store, config.pool.clone()).await?;
//!
//! let proxy = pool.get_proxy(SelectionStrategy::Smart, config.pool.cooldown()).await?;
//! // ... use proxy.http / proxy.https for the outbound request ...
//! pool.report_outcome(proxy, true).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod pool;
pub mod store;

pub use config::Config;
pub use error::{PalisadeError, Result};
pub use inventory::{InventoryEntry, InventoryLoader};
pub use models::{PoolStats, ProxyAddress, ProxyCounters, ProxyId, ProxyRef, ProxyStatDetail};
pub use pool::{ProxyPool, SelectionStrategy};
pub use store::{MemoryStore, ProxyStore, RedisStore};
