//! Sequential (round-robin) proxy selection strategy

use parking_lot::Mutex;

use super::{Candidate, ProxySelector};
use crate::error::{PalisadeError, Result};

/// Selects proxies in round-robin order
///
/// The cursor indexes the stable full list, not the filtered eligible subset;
/// ineligible entries are skipped at read time. This keeps rotation fair when
/// eligibility fluctuates between calls: a proxy leaving cooldown does not
/// shift every other proxy's turn.
///
/// The cursor is process-local and resets on restart. Scan and advance happen
/// under one lock so concurrent callers cannot interleave mid-rotation.
pub struct SequentialSelector {
    cursor: Mutex<usize>,
}

impl SequentialSelector {
    pub fn new() -> Self {
        Self {
            cursor: Mutex::new(0),
        }
    }
}

impl Default for SequentialSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxySelector for SequentialSelector {
    fn select<'a>(&self, candidates: &'a [Candidate]) -> Result<&'a Candidate> {
        if candidates.is_empty() {
            return Err(PalisadeError::NoProxyAvailable);
        }

        let len = candidates.len();
        let mut cursor = self.cursor.lock();

        for offset in 0..len {
            // Modulo against the current length also resyncs a cursor left
            // beyond the end by a shrinking list.
            let idx = (*cursor + offset) % len;
            if candidates[idx].eligible {
                *cursor = (idx + 1) % len;
                return Ok(&candidates[idx]);
            }
        }

        Err(PalisadeError::NoProxyAvailable)
    }

    fn strategy_name(&self) -> &'static str {
        "sequential"
    }
}
