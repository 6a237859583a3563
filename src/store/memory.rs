//! In-process proxy store
//!
//! Backs the pool without an external Redis deployment; the test suite runs
//! against it. Counter updates go through dashmap's shard-locked entries, so
//! concurrent outcome reports never lose increments.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use super::ProxyStore;
use crate::error::Result;
use crate::models::{ProxyCounters, ProxyId};

/// In-memory store
///
/// Membership and counters are mutated together under the order lock, which
/// keeps the counters-iff-member invariant without a second bookkeeping pass.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<ProxyId, ProxyCounters>,
    evicted: DashMap<ProxyId, ProxyCounters>,
    order: RwLock<Vec<ProxyId>>,
    evicted_order: RwLock<Vec<ProxyId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProxyStore for MemoryStore {
    async fn add_if_absent(&self, proxy: &ProxyId) -> Result<bool> {
        let mut order = self.order.write();
        if self.entries.contains_key(proxy) {
            return Ok(false);
        }

        self.entries.insert(proxy.clone(), ProxyCounters::default());
        order.push(proxy.clone());
        Ok(true)
    }

    async fn remove(&self, proxy: &ProxyId) -> Result<()> {
        let mut order = self.order.write();
        self.entries.remove(proxy);
        order.retain(|id| id != proxy);
        Ok(())
    }

    async fn archive(&self, proxy: &ProxyId) -> Result<()> {
        let mut order = self.order.write();
        let counters = match self.entries.remove(proxy) {
            Some((_, counters)) => counters,
            None => return Ok(()),
        };
        order.retain(|id| id != proxy);
        drop(order);

        let mut evicted_order = self.evicted_order.write();
        if self.evicted.insert(proxy.clone(), counters).is_none() {
            evicted_order.push(proxy.clone());
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ProxyId>> {
        Ok(self.order.read().clone())
    }

    async fn contains(&self, proxy: &ProxyId) -> Result<bool> {
        Ok(self.entries.contains_key(proxy))
    }

    async fn incr_success(&self, proxy: &ProxyId) -> Result<u64> {
        Ok(self
            .entries
            .get_mut(proxy)
            .map(|mut counters| {
                counters.success += 1;
                counters.success
            })
            .unwrap_or(0))
    }

    async fn incr_failure(&self, proxy: &ProxyId) -> Result<u64> {
        Ok(self
            .entries
            .get_mut(proxy)
            .map(|mut counters| {
                counters.failure += 1;
                counters.failure
            })
            .unwrap_or(0))
    }

    async fn counters(&self, proxy: &ProxyId) -> Result<ProxyCounters> {
        Ok(self
            .entries
            .get(proxy)
            .map(|counters| *counters)
            .unwrap_or_default())
    }

    async fn set_last_used(&self, proxy: &ProxyId, timestamp: i64) -> Result<()> {
        if let Some(mut counters) = self.entries.get_mut(proxy) {
            counters.last_used_at = timestamp;
        }
        Ok(())
    }

    async fn list_evicted(&self) -> Result<Vec<(ProxyId, ProxyCounters)>> {
        let order = self.evicted_order.read();
        Ok(order
            .iter()
            .filter_map(|id| self.evicted.get(id).map(|c| (id.clone(), *c)))
            .collect())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut order = self.order.write();
        let mut evicted_order = self.evicted_order.write();
        self.entries.clear();
        self.evicted.clear();
        order.clear();
        evicted_order.clear();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
