//! Proxy selection strategies
//!
//! This module provides the policies for picking one proxy from the eligible
//! subset of the active list.

mod random;
mod sequential;
mod smart;

pub use random::RandomSelector;
pub use sequential::SequentialSelector;
pub use smart::SmartSelector;

use crate::error::Result;
use crate::models::{ProxyCounters, ProxyId};

/// Strategy types for proxy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    Random,
    #[default]
    Smart,
    Sequential,
}

impl SelectionStrategy {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "random" => Self::Random,
            "sequential" | "round_robin" | "round-robin" | "roundrobin" => Self::Sequential,
            _ => Self::Smart,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Smart => "smart",
            Self::Sequential => "sequential",
        }
    }
}

/// One proxy as seen by a selector: identity, raw counters, and the
/// eligibility verdict the pool computed for this call.
///
/// Snapshots preserve full list order and keep ineligible entries in place,
/// so positional strategies can hold stable cursors across calls.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: ProxyId,
    pub counters: ProxyCounters,
    pub eligible: bool,
}

/// Trait for proxy selection strategies
///
/// Implementations pick one eligible candidate from a pool snapshot; they
/// hold no proxy state of their own beyond positional cursors.
pub trait ProxySelector: Send + Sync {
    /// Select a proxy from the snapshot
    ///
    /// Returns `NoProxyAvailable` if no candidate is eligible.
    fn select<'a>(&self, candidates: &'a [Candidate]) -> Result<&'a Candidate>;

    /// Get the strategy name
    fn strategy_name(&self) -> &'static str;
}

/// Create a proxy selector for the strategy type
pub fn create_selector(strategy: SelectionStrategy) -> Box<dyn ProxySelector> {
    match strategy {
        SelectionStrategy::Random => Box::new(RandomSelector::new()),
        SelectionStrategy::Smart => Box::new(SmartSelector::new()),
        SelectionStrategy::Sequential => Box::new(SequentialSelector::new()),
    }
}

#[cfg(test)]
pub(crate) fn test_candidate(raw: &str, eligible: bool) -> Candidate {
    Candidate {
        id: ProxyId::parse(raw).unwrap(),
        counters: ProxyCounters::default(),
        eligible,
    }
}
