use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ProxyCounters;

/// Aggregate pool statistics
///
/// Covers both the active list and the evicted archive; evicted proxies keep
/// their final counters and count toward `bad_proxies`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PoolStats {
    /// Number of proxies known to the pool (active + evicted)
    pub total_proxies: usize,
    /// Active proxies under the failure threshold
    pub good_proxies: usize,
    /// Proxies at or over the failure threshold, including evicted ones
    pub bad_proxies: usize,
    /// Total outcomes reported across the pool
    pub total_requests: u64,
    pub total_success: u64,
    pub total_failure: u64,
    /// Overall success rate as a percentage (0-100, 2 decimals)
    pub overall_success_rate: f64,
    /// Per-proxy detail keyed by canonical identifier
    pub proxy_details: BTreeMap<String, ProxyStatDetail>,
}

/// Per-proxy statistics detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyStatDetail {
    pub success: u64,
    pub failure: u64,
    pub total: u64,
    /// Success rate as a percentage (0-100, 2 decimals)
    pub success_rate: f64,
    /// Whether the proxy has been evicted from the active list
    pub evicted: bool,
}

impl ProxyStatDetail {
    pub fn from_counters(counters: &ProxyCounters, evicted: bool) -> Self {
        ProxyStatDetail {
            success: counters.success,
            failure: counters.failure,
            total: counters.total(),
            success_rate: success_rate_pct(counters.success, counters.total()),
            evicted,
        }
    }
}

/// Success rate as a percentage rounded to 2 decimals; 0 when nothing was
/// reported yet.
pub(crate) fn success_rate_pct(success: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(success as f64 / total as f64 * 100.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
