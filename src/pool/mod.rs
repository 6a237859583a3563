//! Proxy pool orchestration
//!
//! Composes the store, derived health, and selection strategies behind the
//! operations callers use: hand out a proxy, report how it went, inspect
//! pool statistics, and reload inventory. The eviction rule lives here.

pub mod health;
pub mod selection;

pub use selection::{
    create_selector, Candidate, ProxySelector, RandomSelector, SelectionStrategy,
    SequentialSelector, SmartSelector,
};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::{PalisadeError, Result};
use crate::inventory::InventoryEntry;
use crate::models::{PoolStats, ProxyAddress, ProxyRef, ProxyStatDetail};
use crate::store::ProxyStore;

/// Proxy pool orchestrator
///
/// Safe to share across tasks: durable state lives in the store, and the only
/// in-process state is configuration plus the sequential cursor (which takes
/// its own lock). Cooldown is a per-call parameter, never shared mutable
/// state, so concurrent callers may use different cooldowns freely.
pub struct ProxyPool {
    store: Arc<dyn ProxyStore>,
    config: PoolConfig,
    random: Box<dyn ProxySelector>,
    smart: Box<dyn ProxySelector>,
    sequential: Box<dyn ProxySelector>,
}

impl ProxyPool {
    /// Create a pool over a store, verifying the backend is reachable.
    pub async fn new(store: Arc<dyn ProxyStore>, config: PoolConfig) -> Result<Self> {
        store
            .ping()
            .await
            .map_err(|e| PalisadeError::StoreConnection(e.to_string()))?;

        let pool = ProxyPool {
            store,
            config,
            random: create_selector(SelectionStrategy::Random),
            smart: create_selector(SelectionStrategy::Smart),
            sequential: create_selector(SelectionStrategy::Sequential),
        };

        if pool.store.list_all().await?.is_empty() {
            warn!("No proxies in store; call load_inventory or refresh_all to populate the pool");
        }

        Ok(pool)
    }

    fn selector_for(&self, strategy: SelectionStrategy) -> &dyn ProxySelector {
        match strategy {
            SelectionStrategy::Random => self.random.as_ref(),
            SelectionStrategy::Smart => self.smart.as_ref(),
            SelectionStrategy::Sequential => self.sequential.as_ref(),
        }
    }

    /// Select a proxy using the configured default strategy and cooldown.
    pub async fn get_proxy_default(&self) -> Result<ProxyAddress> {
        self.get_proxy(self.config.strategy, self.config.cooldown())
            .await
    }

    /// Select a proxy and return its transport-ready address pair.
    ///
    /// Fails `PoolEmpty` when the active list has no members at all and
    /// `NoProxyAvailable` when every member is cooling down or already at the
    /// failure threshold. The selected proxy's `last_used_at` is written
    /// before the address is returned, which is what arms the cooldown gate
    /// for subsequent callers (best-effort, not transactional).
    pub async fn get_proxy(
        &self,
        strategy: SelectionStrategy,
        cooldown: Duration,
    ) -> Result<ProxyAddress> {
        let ids = self.store.list_all().await?;
        if ids.is_empty() {
            return Err(PalisadeError::PoolEmpty);
        }

        let now = Utc::now().timestamp();

        let counters = try_join_all(ids.iter().map(|id| self.store.counters(id))).await?;
        let candidates: Vec<Candidate> = ids
            .into_iter()
            .zip(counters)
            .map(|(id, counters)| {
                // Cooldown pass AND under the failure threshold: a proxy whose
                // threshold-crossing eviction has not landed yet must still
                // never be handed out.
                let eligible = health::is_eligible(&counters, cooldown, now)
                    && !health::is_bad(&counters, self.config.fail_threshold);
                Candidate {
                    id,
                    counters,
                    eligible,
                }
            })
            .collect();

        let selected = self.selector_for(strategy).select(&candidates)?;
        self.store.set_last_used(&selected.id, now).await?;

        debug!(proxy = %selected.id, strategy = strategy.as_str(), "Selected proxy");
        Ok(ProxyAddress::new(&selected.id))
    }

    /// Record the outcome of using a proxy.
    ///
    /// Accepts the pool's own formatted address or a raw canonical string.
    /// A failure that reaches the configured threshold evicts the proxy, a
    /// one-way transition; its final counters move to the evicted archive.
    /// Outcomes for proxies no longer in the pool are ignored.
    pub async fn report_outcome(&self, proxy: impl Into<ProxyRef>, success: bool) -> Result<()> {
        let id = proxy.into().canonical()?;

        if !self.store.contains(&id).await? {
            debug!(proxy = %id, "Outcome reported for unknown proxy, ignoring");
            return Ok(());
        }

        if success {
            self.store.incr_success(&id).await?;
            return Ok(());
        }

        let failures = self.store.incr_failure(&id).await?;
        if failures >= self.config.fail_threshold {
            self.store.archive(&id).await?;
            info!(proxy = %id, failures, "Evicted proxy after repeated failures");
        }

        Ok(())
    }

    /// Aggregate statistics over the active list and the evicted archive.
    ///
    /// Pure read, no side effects.
    pub async fn get_stats(&self) -> Result<PoolStats> {
        let ids = self.store.list_all().await?;
        let counters = try_join_all(ids.iter().map(|id| self.store.counters(id))).await?;
        let evicted = self.store.list_evicted().await?;

        let mut stats = PoolStats {
            total_proxies: ids.len() + evicted.len(),
            ..PoolStats::default()
        };

        for (id, counters) in ids.iter().zip(&counters) {
            if health::is_bad(counters, self.config.fail_threshold) {
                stats.bad_proxies += 1;
            } else {
                stats.good_proxies += 1;
            }

            stats.total_success += counters.success;
            stats.total_failure += counters.failure;
            stats
                .proxy_details
                .insert(id.to_string(), ProxyStatDetail::from_counters(counters, false));
        }

        for (id, counters) in &evicted {
            stats.bad_proxies += 1;
            stats.total_success += counters.success;
            stats.total_failure += counters.failure;
            stats
                .proxy_details
                .insert(id.to_string(), ProxyStatDetail::from_counters(counters, true));
        }

        stats.total_requests = stats.total_success + stats.total_failure;
        stats.overall_success_rate =
            crate::models::stats::success_rate_pct(stats.total_success, stats.total_requests);

        Ok(stats)
    }

    /// Bulk-insert valid inventory entries, skipping ones already present.
    ///
    /// Returns the number of proxies actually inserted. Entries that fail to
    /// form a canonical identifier are skipped with a warning rather than
    /// aborting the batch.
    pub async fn load_inventory(&self, entries: &[InventoryEntry]) -> Result<usize> {
        let mut inserted = 0;

        for entry in entries.iter().filter(|e| e.valid) {
            let id = match entry.canonical_id() {
                Ok(id) => id,
                Err(e) => {
                    warn!(host = %entry.host, error = %e, "Skipping malformed inventory entry");
                    continue;
                }
            };

            if self.store.add_if_absent(&id).await? {
                inserted += 1;
            }
        }

        info!(count = inserted, "Loaded proxies into pool");
        Ok(inserted)
    }

    /// Full refresh: clear every proxy, counter, and archive entry, then
    /// bulk-insert the new inventory.
    pub async fn refresh_all(&self, entries: &[InventoryEntry]) -> Result<usize> {
        self.store.clear_all().await?;
        let inserted = self.load_inventory(entries).await?;
        info!(count = inserted, "Refreshed proxy pool");
        Ok(inserted)
    }

    /// Administratively remove a proxy from the active list.
    ///
    /// Unlike eviction this is a hard delete; nothing is archived.
    pub async fn remove(&self, proxy: impl Into<ProxyRef>) -> Result<()> {
        let id = proxy.into().canonical()?;
        self.store.remove(&id).await?;
        info!(proxy = %id, "Removed proxy");
        Ok(())
    }

    /// Number of proxies in the active list.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.list_all().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn entry(user: &str, host: &str, port: u16, valid: bool) -> InventoryEntry {
        InventoryEntry {
            username: user.to_string(),
            password: "pw".to_string(),
            host: host.to_string(),
            port,
            valid,
        }
    }

    async fn pool_with(entries: &[InventoryEntry]) -> ProxyPool {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("palisade=debug")
            .try_init();

        let store = Arc::new(MemoryStore::new());
        let pool = ProxyPool::new(store, PoolConfig::default()).await.unwrap();
        pool.load_inventory(entries).await.unwrap();
        pool
    }

    fn canonical(user: &str, host: &str, port: u16) -> String {
        format!("{}:pw@{}:{}", user, host, port)
    }

    #[tokio::test]
    async fn test_get_proxy_empty_pool() {
        let pool = pool_with(&[]).await;
        let result = pool.get_proxy(SelectionStrategy::Smart, Duration::ZERO).await;
        assert!(matches!(result, Err(PalisadeError::PoolEmpty)));
    }

    #[tokio::test]
    async fn test_get_proxy_returns_address_pair() {
        let pool = pool_with(&[entry("a", "10.0.0.1", 8080, true)]).await;

        let addr = pool
            .get_proxy(SelectionStrategy::Smart, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(addr.http, "http://a:pw@10.0.0.1:8080");
        assert_eq!(addr.https, "http://a:pw@10.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_cooldown_gates_reselection() {
        let pool = pool_with(&[entry("a", "10.0.0.1", 8080, true)]).await;
        let cooldown = Duration::from_secs(60);

        pool.get_proxy(SelectionStrategy::Smart, cooldown).await.unwrap();

        // The only proxy is now cooling down.
        let result = pool.get_proxy(SelectionStrategy::Smart, cooldown).await;
        assert!(matches!(result, Err(PalisadeError::NoProxyAvailable)));
    }

    #[tokio::test]
    async fn test_cooldown_spreads_load_across_pool() {
        let pool = pool_with(&[
            entry("a", "10.0.0.1", 8080, true),
            entry("b", "10.0.0.2", 8080, true),
        ])
        .await;
        let cooldown = Duration::from_secs(60);

        let first = pool.get_proxy(SelectionStrategy::Smart, cooldown).await.unwrap();
        let second = pool.get_proxy(SelectionStrategy::Smart, cooldown).await.unwrap();
        assert_ne!(first, second);

        let result = pool.get_proxy(SelectionStrategy::Smart, cooldown).await;
        assert!(matches!(result, Err(PalisadeError::NoProxyAvailable)));
    }

    #[tokio::test]
    async fn test_zero_cooldown_allows_immediate_reuse() {
        let pool = pool_with(&[entry("a", "10.0.0.1", 8080, true)]).await;

        for _ in 0..3 {
            pool.get_proxy(SelectionStrategy::Smart, Duration::ZERO)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_smart_prefers_proven_proxy() {
        let pool = pool_with(&[
            entry("idle", "10.0.0.1", 8080, true),
            entry("proven", "10.0.0.2", 8080, true),
        ])
        .await;

        let proven = canonical("proven", "10.0.0.2", 8080);
        for _ in 0..10 {
            pool.report_outcome(proven.as_str(), true).await.unwrap();
        }

        let addr = pool
            .get_proxy(SelectionStrategy::Smart, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(addr.http, format!("http://{}", proven));
    }

    #[tokio::test]
    async fn test_sequential_visits_pool_in_order() {
        let pool = pool_with(&[
            entry("a", "10.0.0.1", 8080, true),
            entry("b", "10.0.0.2", 8080, true),
            entry("c", "10.0.0.3", 8080, true),
        ])
        .await;

        let mut picks = Vec::new();
        for _ in 0..6 {
            let addr = pool
                .get_proxy(SelectionStrategy::Sequential, Duration::ZERO)
                .await
                .unwrap();
            picks.push(addr.http);
        }

        let expected: Vec<String> = ["a", "b", "c", "a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, user)| {
                format!("http://{}", canonical(user, &format!("10.0.0.{}", i % 3 + 1), 8080))
            })
            .collect();
        assert_eq!(picks, expected);
    }

    #[tokio::test]
    async fn test_report_success_increments_counter() {
        let pool = pool_with(&[entry("a", "10.0.0.1", 8080, true)]).await;
        let id = canonical("a", "10.0.0.1", 8080);

        pool.report_outcome(id.as_str(), true).await.unwrap();
        pool.report_outcome(id.as_str(), true).await.unwrap();

        let stats = pool.get_stats().await.unwrap();
        assert_eq!(stats.total_success, 2);
        assert_eq!(stats.total_failure, 0);
        assert_eq!(stats.proxy_details[&id].success, 2);
    }

    #[tokio::test]
    async fn test_report_accepts_formatted_address() {
        let pool = pool_with(&[entry("a", "10.0.0.1", 8080, true)]).await;

        let addr = pool
            .get_proxy(SelectionStrategy::Smart, Duration::ZERO)
            .await
            .unwrap();
        pool.report_outcome(addr, true).await.unwrap();

        let stats = pool.get_stats().await.unwrap();
        assert_eq!(stats.total_success, 1);
    }

    #[tokio::test]
    async fn test_report_invalid_format_rejected() {
        let pool = pool_with(&[entry("a", "10.0.0.1", 8080, true)]).await;

        let err = pool.report_outcome("no-at-sign", false).await.unwrap_err();
        assert!(matches!(err, PalisadeError::InvalidProxyFormat(_)));

        // Nothing was mutated.
        let stats = pool.get_stats().await.unwrap();
        assert_eq!(stats.total_requests, 0);
    }

    #[tokio::test]
    async fn test_report_unknown_proxy_ignored() {
        let pool = pool_with(&[entry("a", "10.0.0.1", 8080, true)]).await;

        pool.report_outcome("ghost:pw@10.9.9.9:1234", false)
            .await
            .unwrap();

        let stats = pool.get_stats().await.unwrap();
        assert_eq!(stats.total_proxies, 1);
        assert_eq!(stats.total_requests, 0);
    }

    #[tokio::test]
    async fn test_eviction_at_threshold() {
        let pool = pool_with(&[
            entry("a", "10.0.0.1", 8080, true),
            entry("b", "10.0.0.2", 8080, true),
            entry("c", "10.0.0.3", 8080, true),
        ])
        .await;
        let bad = canonical("a", "10.0.0.1", 8080);

        // Default threshold is 3.
        for _ in 0..3 {
            pool.report_outcome(bad.as_str(), false).await.unwrap();
        }

        let stats = pool.get_stats().await.unwrap();
        assert_eq!(stats.bad_proxies, 1);
        assert_eq!(stats.good_proxies, 2);
        assert_eq!(stats.total_proxies, 3);
        assert!(stats.proxy_details[&bad].evicted);

        // The evicted proxy is never handed out again.
        assert_eq!(pool.count().await.unwrap(), 2);
        for strategy in [
            SelectionStrategy::Random,
            SelectionStrategy::Smart,
            SelectionStrategy::Sequential,
        ] {
            for _ in 0..6 {
                let addr = pool.get_proxy(strategy, Duration::ZERO).await.unwrap();
                assert_ne!(addr.http, format!("http://{}", bad));
            }
        }
    }

    #[tokio::test]
    async fn test_eviction_is_terminal() {
        let pool = pool_with(&[entry("a", "10.0.0.1", 8080, true)]).await;
        let id = canonical("a", "10.0.0.1", 8080);

        for _ in 0..3 {
            pool.report_outcome(id.as_str(), false).await.unwrap();
        }
        assert_eq!(pool.count().await.unwrap(), 0);

        // Reports after eviction are ignored; no un-eviction path exists.
        pool.report_outcome(id.as_str(), true).await.unwrap();
        assert_eq!(pool.count().await.unwrap(), 0);

        let result = pool.get_proxy(SelectionStrategy::Smart, Duration::ZERO).await;
        assert!(matches!(result, Err(PalisadeError::PoolEmpty)));
    }

    #[tokio::test]
    async fn test_load_inventory_filters_and_deduplicates() {
        let pool = pool_with(&[]).await;

        let entries = vec![
            entry("a", "10.0.0.1", 8080, true),
            entry("b", "10.0.0.2", 8080, false),
            entry("a", "10.0.0.1", 8080, true),
        ];
        let inserted = pool.load_inventory(&entries).await.unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(pool.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refresh_all_round_trip() {
        let pool = pool_with(&[entry("old", "10.0.0.9", 9999, true)]).await;
        pool.report_outcome(canonical("old", "10.0.0.9", 9999).as_str(), true)
            .await
            .unwrap();

        let inserted = pool
            .refresh_all(&[
                entry("p1", "10.0.0.1", 8080, true),
                entry("p2", "10.0.0.2", 8080, true),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let stats = pool.get_stats().await.unwrap();
        assert_eq!(stats.total_proxies, 2);
        assert_eq!(stats.total_requests, 0);

        let p1 = canonical("p1", "10.0.0.1", 8080);
        let p2 = canonical("p2", "10.0.0.2", 8080);
        assert_eq!(stats.proxy_details[&p1].total, 0);
        assert_eq!(stats.proxy_details[&p2].total, 0);
    }

    #[tokio::test]
    async fn test_refresh_all_clears_evicted_archive() {
        let pool = pool_with(&[entry("a", "10.0.0.1", 8080, true)]).await;
        for _ in 0..3 {
            pool.report_outcome(canonical("a", "10.0.0.1", 8080).as_str(), false)
                .await
                .unwrap();
        }
        assert_eq!(pool.get_stats().await.unwrap().bad_proxies, 1);

        pool.refresh_all(&[entry("b", "10.0.0.2", 8080, true)])
            .await
            .unwrap();

        let stats = pool.get_stats().await.unwrap();
        assert_eq!(stats.total_proxies, 1);
        assert_eq!(stats.bad_proxies, 0);
    }

    #[tokio::test]
    async fn test_remove_is_hard_delete() {
        let pool = pool_with(&[
            entry("a", "10.0.0.1", 8080, true),
            entry("b", "10.0.0.2", 8080, true),
        ])
        .await;

        pool.remove(canonical("a", "10.0.0.1", 8080).as_str())
            .await
            .unwrap();

        let stats = pool.get_stats().await.unwrap();
        assert_eq!(stats.total_proxies, 1);
        // Unlike eviction, nothing lands in the archive.
        assert_eq!(stats.bad_proxies, 0);
    }

    #[tokio::test]
    async fn test_get_stats_overall_rate() {
        let pool = pool_with(&[
            entry("a", "10.0.0.1", 8080, true),
            entry("b", "10.0.0.2", 8080, true),
        ])
        .await;
        let a = canonical("a", "10.0.0.1", 8080);
        let b = canonical("b", "10.0.0.2", 8080);

        pool.report_outcome(a.as_str(), true).await.unwrap();
        pool.report_outcome(a.as_str(), true).await.unwrap();
        pool.report_outcome(b.as_str(), false).await.unwrap();

        let stats = pool.get_stats().await.unwrap();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.total_success, 2);
        assert_eq!(stats.total_failure, 1);
        assert_eq!(stats.overall_success_rate, 66.67);
        assert_eq!(stats.proxy_details[&a].success_rate, 100.0);
        assert_eq!(stats.proxy_details[&b].success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_get_proxy_default_uses_config() {
        let store = Arc::new(MemoryStore::new());
        let config = PoolConfig {
            strategy: SelectionStrategy::Sequential,
            cooldown_secs: 0,
            fail_threshold: 3,
        };
        let pool = ProxyPool::new(store, config).await.unwrap();
        pool.load_inventory(&[
            entry("a", "10.0.0.1", 8080, true),
            entry("b", "10.0.0.2", 8080, true),
        ])
        .await
        .unwrap();

        let first = pool.get_proxy_default().await.unwrap();
        let second = pool.get_proxy_default().await.unwrap();
        assert_eq!(first.http, format!("http://{}", canonical("a", "10.0.0.1", 8080)));
        assert_eq!(second.http, format!("http://{}", canonical("b", "10.0.0.2", 8080)));
    }

    #[tokio::test]
    async fn test_counters_never_go_negative() {
        // Counters are unsigned and increments-only; a long failure streak on
        // a high threshold keeps both counters monotonic.
        let store = Arc::new(MemoryStore::new());
        let config = PoolConfig {
            fail_threshold: 100,
            ..PoolConfig::default()
        };
        let pool = ProxyPool::new(store, config).await.unwrap();
        pool.load_inventory(&[entry("a", "10.0.0.1", 8080, true)])
            .await
            .unwrap();
        let id = canonical("a", "10.0.0.1", 8080);

        for _ in 0..10 {
            pool.report_outcome(id.as_str(), false).await.unwrap();
        }
        for _ in 0..5 {
            pool.report_outcome(id.as_str(), true).await.unwrap();
        }

        let stats = pool.get_stats().await.unwrap();
        assert_eq!(stats.proxy_details[&id].failure, 10);
        assert_eq!(stats.proxy_details[&id].success, 5);
    }
}
