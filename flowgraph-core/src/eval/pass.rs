//! Per-pass visitation marks.
//!
//! A [`Pass`] lives for a single `evaluate` call and is never shared between
//! calls, so evaluations are reentrant.

use std::collections::HashMap;

use crate::graph::OperatorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mark {
    /// Entered but not yet computed. Meeting it again means a cycle.
    InProgress,

    /// Computed (or reused from cache) in this pass. `effective` is the
    /// latest revision among the operator and everything it read.
    Complete { effective: u64 },
}

#[derive(Debug, Default)]
pub(crate) struct Pass {
    marks: HashMap<OperatorId, Mark>,
}

impl Pass {
    pub(crate) fn mark(&self, id: OperatorId) -> Option<Mark> {
        self.marks.get(&id).copied()
    }

    /// Enter `id`. Returns `false` if it was already entered in this pass.
    pub(crate) fn begin(&mut self, id: OperatorId) -> bool {
        if self.marks.contains_key(&id) {
            return false;
        }
        self.marks.insert(id, Mark::InProgress);
        true
    }

    pub(crate) fn complete(&mut self, id: OperatorId, effective: u64) {
        self.marks.insert(id, Mark::Complete { effective });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_progress_to_complete() {
        let mut pass = Pass::default();
        let id = OperatorId::new();
        assert_eq!(pass.mark(id), None);
        assert!(pass.begin(id));
        assert!(!pass.begin(id));
        assert_eq!(pass.mark(id), Some(Mark::InProgress));
        pass.complete(id, 4);
        assert_eq!(pass.mark(id), Some(Mark::Complete { effective: 4 }));
    }
}
