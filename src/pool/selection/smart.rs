//! Highest-score proxy selection strategy

use super::{Candidate, ProxySelector};
use crate::error::{PalisadeError, Result};
use crate::pool::health;

/// Selects the eligible proxy with the highest success score
///
/// Ties break to the first candidate in list order, which keeps selection
/// deterministic for a given snapshot.
pub struct SmartSelector;

impl SmartSelector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SmartSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxySelector for SmartSelector {
    fn select<'a>(&self, candidates: &'a [Candidate]) -> Result<&'a Candidate> {
        let mut best: Option<(&Candidate, f64)> = None;

        for candidate in candidates.iter().filter(|c| c.eligible) {
            let score = health::score(&candidate.counters);
            match best {
                // Strictly greater keeps the first-encountered on ties.
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((candidate, score)),
            }
        }

        best.map(|(candidate, _)| candidate)
            .ok_or(PalisadeError::NoProxyAvailable)
    }

    fn strategy_name(&self) -> &'static str {
        "smart"
    }
}
