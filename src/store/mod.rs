//! Proxy storage backends
//!
//! The pool treats durable state as an external collaborator behind the
//! [`ProxyStore`] trait: list membership, per-entry counters, and the evicted
//! archive. Any key-value engine with atomic increments and list operations
//! can back it.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ProxyCounters, ProxyId};

/// Storage contract for durable proxy state
///
/// Implementations own the invariant that counters exist if and only if the
/// proxy is a member of the active list: membership and counters are always
/// created and destroyed together.
#[async_trait]
pub trait ProxyStore: Send + Sync {
    /// Insert a proxy with zeroed counters iff not already present.
    ///
    /// Returns whether an insert happened. Idempotent.
    async fn add_if_absent(&self, proxy: &ProxyId) -> Result<bool>;

    /// Delete a proxy's counters and list membership. Idempotent.
    async fn remove(&self, proxy: &ProxyId) -> Result<()>;

    /// Move a proxy out of the active list, preserving its final counters in
    /// the evicted archive. Terminal; idempotent for already-absent proxies.
    async fn archive(&self, proxy: &ProxyId) -> Result<()>;

    /// All active proxies, in insertion order.
    async fn list_all(&self) -> Result<Vec<ProxyId>>;

    /// Whether the proxy is an active list member.
    async fn contains(&self, proxy: &ProxyId) -> Result<bool>;

    /// Atomically increment the success counter, returning the new value.
    async fn incr_success(&self, proxy: &ProxyId) -> Result<u64>;

    /// Atomically increment the failure counter, returning the new value.
    async fn incr_failure(&self, proxy: &ProxyId) -> Result<u64>;

    /// Raw counters for a proxy; zeros when the proxy is unknown.
    async fn counters(&self, proxy: &ProxyId) -> Result<ProxyCounters>;

    /// Record when the proxy was last handed out, in epoch seconds.
    async fn set_last_used(&self, proxy: &ProxyId, timestamp: i64) -> Result<()>;

    /// Evicted proxies with their final counters, in eviction order.
    async fn list_evicted(&self) -> Result<Vec<(ProxyId, ProxyCounters)>>;

    /// Remove every proxy, counter, and archive entry.
    async fn clear_all(&self) -> Result<()>;

    /// Backend reachability check.
    async fn ping(&self) -> Result<()>;
}
