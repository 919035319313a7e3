//! Evaluation cache entries.

use crate::expr::{Outputs, Value};

/// Whether a cached value may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Up to date as of `computed_at`.
    Clean,

    /// Explicitly invalidated. Recomputed on next use.
    Dirty,
}

/// The last computed outlet values of one operator.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    outputs: Outputs,
    state: CacheState,
    /// Graph revision at the time of computation.
    computed_at: u64,
}

impl CacheEntry {
    pub(crate) fn new(outputs: Outputs, computed_at: u64) -> Self {
        Self {
            outputs,
            state: CacheState::Clean,
            computed_at,
        }
    }

    /// One value per outlet, in outlet order.
    pub fn outputs(&self) -> &[Value] {
        &self.outputs
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn computed_at(&self) -> u64 {
        self.computed_at
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.state = CacheState::Dirty;
    }

    /// Reusable for an operator whose inputs last changed at `effective`.
    pub(crate) fn is_fresh(&self, effective: u64) -> bool {
        self.state == CacheState::Clean && self.computed_at >= effective
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn freshness_follows_state_and_revision() {
        let mut entry = CacheEntry::new(smallvec![1.0], 5);
        assert!(entry.is_fresh(5));
        assert!(entry.is_fresh(3));
        assert!(!entry.is_fresh(6));

        entry.mark_dirty();
        assert_eq!(entry.state(), CacheState::Dirty);
        assert!(!entry.is_fresh(0));
    }
}
