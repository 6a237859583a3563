//! Redis-backed proxy store
//!
//! Key scheme: one `proxy:{id}` hash per active proxy (fields `success`,
//! `failure`, `timestamp`) plus a `proxy_list` list holding insertion order.
//! Evicted proxies move to `evicted:{id}` / `evicted_list`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::time::timeout;
use tracing::info;

use super::ProxyStore;
use crate::config::StoreConfig;
use crate::error::{PalisadeError, Result};
use crate::models::{ProxyCounters, ProxyId};

const PROXY_LIST_KEY: &str = "proxy_list";
const EVICTED_LIST_KEY: &str = "evicted_list";
const PROXY_KEY_PREFIX: &str = "proxy:";
const EVICTED_KEY_PREFIX: &str = "evicted:";

fn hash_key(proxy: &ProxyId) -> String {
    format!("{}{}", PROXY_KEY_PREFIX, proxy)
}

fn evicted_key(proxy: &ProxyId) -> String {
    format!("{}{}", EVICTED_KEY_PREFIX, proxy)
}

/// Redis store client
///
/// Every operation runs under a deadline; an elapsed deadline surfaces as
/// `StoreTimeout` instead of hanging the caller.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisStore {
    /// Connect to Redis and verify reachability
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        info!(url = %config.url, "Connecting to Redis store");

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| PalisadeError::StoreConnection(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| PalisadeError::StoreConnection(e.to_string()))?;

        let store = RedisStore {
            conn,
            op_timeout: config.op_timeout(),
        };

        store
            .ping()
            .await
            .map_err(|e| PalisadeError::StoreConnection(e.to_string()))?;

        info!("Redis store connection established");
        Ok(store)
    }

    async fn with_deadline<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(PalisadeError::StoreTimeout),
        }
    }
}

#[async_trait]
impl ProxyStore for RedisStore {
    async fn add_if_absent(&self, proxy: &ProxyId) -> Result<bool> {
        let key = hash_key(proxy);
        let id = proxy.as_str().to_string();
        let mut conn = self.conn.clone();

        self.with_deadline(async move {
            let exists: bool = conn.exists(&key).await?;
            if exists {
                return Ok(false);
            }

            redis::pipe()
                .atomic()
                .hset_multiple(
                    &key,
                    &[("success", 0i64), ("failure", 0i64), ("timestamp", 0i64)],
                )
                .ignore()
                .rpush(PROXY_LIST_KEY, &id)
                .ignore()
                .query_async::<_, ()>(&mut conn)
                .await?;

            Ok(true)
        })
        .await
    }

    async fn remove(&self, proxy: &ProxyId) -> Result<()> {
        let key = hash_key(proxy);
        let id = proxy.as_str().to_string();
        let mut conn = self.conn.clone();

        self.with_deadline(async move {
            redis::pipe()
                .atomic()
                .del(&key)
                .ignore()
                .lrem(PROXY_LIST_KEY, 0, &id)
                .ignore()
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn archive(&self, proxy: &ProxyId) -> Result<()> {
        let key = hash_key(proxy);
        let tomb = evicted_key(proxy);
        let id = proxy.as_str().to_string();
        let mut conn = self.conn.clone();

        self.with_deadline(async move {
            let (success, failure, timestamp): (Option<i64>, Option<i64>, Option<i64>) =
                conn.hget(&key, &["success", "failure", "timestamp"]).await?;

            // Already removed by a concurrent caller.
            let (success, failure, timestamp) = match (success, failure, timestamp) {
                (None, None, None) => return Ok(()),
                (s, f, t) => (s.unwrap_or(0), f.unwrap_or(0), t.unwrap_or(0)),
            };

            redis::pipe()
                .atomic()
                .del(&key)
                .ignore()
                .lrem(PROXY_LIST_KEY, 0, &id)
                .ignore()
                .hset_multiple(
                    &tomb,
                    &[
                        ("success", success),
                        ("failure", failure),
                        ("timestamp", timestamp),
                    ],
                )
                .ignore()
                .lrem(EVICTED_LIST_KEY, 0, &id)
                .ignore()
                .rpush(EVICTED_LIST_KEY, &id)
                .ignore()
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<ProxyId>> {
        let mut conn = self.conn.clone();

        let raw: Vec<String> = self
            .with_deadline(async move { conn.lrange(PROXY_LIST_KEY, 0, -1).await })
            .await?;

        // Entries were validated on insert; skip anything unparseable rather
        // than poisoning every read.
        Ok(raw
            .iter()
            .filter_map(|s| ProxyId::parse(s).ok())
            .collect())
    }

    async fn contains(&self, proxy: &ProxyId) -> Result<bool> {
        let key = hash_key(proxy);
        let mut conn = self.conn.clone();

        self.with_deadline(async move { conn.exists(&key).await })
            .await
    }

    async fn incr_success(&self, proxy: &ProxyId) -> Result<u64> {
        let key = hash_key(proxy);
        let mut conn = self.conn.clone();

        self.with_deadline(async move { conn.hincr(&key, "success", 1i64).await })
            .await
    }

    async fn incr_failure(&self, proxy: &ProxyId) -> Result<u64> {
        let key = hash_key(proxy);
        let mut conn = self.conn.clone();

        self.with_deadline(async move { conn.hincr(&key, "failure", 1i64).await })
            .await
    }

    async fn counters(&self, proxy: &ProxyId) -> Result<ProxyCounters> {
        let key = hash_key(proxy);
        let mut conn = self.conn.clone();

        let (success, failure, timestamp): (Option<u64>, Option<u64>, Option<i64>) = self
            .with_deadline(async move {
                conn.hget(&key, &["success", "failure", "timestamp"]).await
            })
            .await?;

        Ok(ProxyCounters {
            success: success.unwrap_or(0),
            failure: failure.unwrap_or(0),
            last_used_at: timestamp.unwrap_or(0),
        })
    }

    async fn set_last_used(&self, proxy: &ProxyId, timestamp: i64) -> Result<()> {
        let key = hash_key(proxy);
        let mut conn = self.conn.clone();

        self.with_deadline(async move {
            // Skip proxies that disappeared between selection and this write;
            // an unconditional HSET would recreate an orphaned hash.
            let exists: bool = conn.exists(&key).await?;
            if exists {
                let _: () = conn.hset(&key, "timestamp", timestamp).await?;
            }
            Ok(())
        })
        .await
    }

    async fn list_evicted(&self) -> Result<Vec<(ProxyId, ProxyCounters)>> {
        let mut conn = self.conn.clone();

        self.with_deadline(async move {
            let raw: Vec<String> = conn.lrange(EVICTED_LIST_KEY, 0, -1).await?;

            let mut evicted = Vec::with_capacity(raw.len());
            for entry in raw {
                let id = match ProxyId::parse(&entry) {
                    Ok(id) => id,
                    Err(_) => continue,
                };

                let (success, failure, timestamp): (Option<u64>, Option<u64>, Option<i64>) =
                    conn.hget(&evicted_key(&id), &["success", "failure", "timestamp"])
                        .await?;

                evicted.push((
                    id,
                    ProxyCounters {
                        success: success.unwrap_or(0),
                        failure: failure.unwrap_or(0),
                        last_used_at: timestamp.unwrap_or(0),
                    },
                ));
            }

            Ok(evicted)
        })
        .await
    }

    async fn clear_all(&self) -> Result<()> {
        let mut conn = self.conn.clone();

        self.with_deadline(async move {
            let mut keys: Vec<String> = Vec::new();
            for pattern in [
                format!("{}*", PROXY_KEY_PREFIX),
                format!("{}*", EVICTED_KEY_PREFIX),
            ] {
                let mut iter = conn.scan_match::<_, String>(&pattern).await?;
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
            }

            keys.push(PROXY_LIST_KEY.to_string());
            keys.push(EVICTED_LIST_KEY.to_string());

            conn.del(&keys).await
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();

        self.with_deadline(async move {
            redis::cmd("PING").query_async::<_, String>(&mut conn).await
        })
        .await?;

        Ok(())
    }
}
