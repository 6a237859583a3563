//! Random proxy selection strategy

use rand::seq::SliceRandom;

use super::{Candidate, ProxySelector};
use crate::error::{PalisadeError, Result};

/// Selects a uniformly random proxy from the eligible subset
pub struct RandomSelector;

impl RandomSelector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxySelector for RandomSelector {
    fn select<'a>(&self, candidates: &'a [Candidate]) -> Result<&'a Candidate> {
        let eligible: Vec<&Candidate> = candidates.iter().filter(|c| c.eligible).collect();

        let mut rng = rand::thread_rng();
        eligible
            .choose(&mut rng)
            .copied()
            .ok_or(PalisadeError::NoProxyAvailable)
    }

    fn strategy_name(&self) -> &'static str {
        "random"
    }
}
