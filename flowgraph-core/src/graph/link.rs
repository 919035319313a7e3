//! Links between outlets and inlets.

use super::ids::{InletId, LinkId, OperatorId, OutletId};

/// One end of a link: a port plus the operator that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint<P> {
    pub operator: OperatorId,
    pub port: P,
}

/// A directed edge from an outlet to an inlet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    id: LinkId,
    source: Endpoint<OutletId>,
    target: Endpoint<InletId>,
}

impl Link {
    pub(crate) fn new(source: Endpoint<OutletId>, target: Endpoint<InletId>) -> Self {
        Self {
            id: LinkId::new(),
            source,
            target,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn source(&self) -> Endpoint<OutletId> {
        self.source
    }

    pub fn target(&self) -> Endpoint<InletId> {
        self.target
    }

    /// The operator producing the value.
    pub fn source_operator(&self) -> OperatorId {
        self.source.operator
    }

    /// The operator consuming the value.
    pub fn target_operator(&self) -> OperatorId {
        self.target.operator
    }

    pub(crate) fn set_source(&mut self, source: Endpoint<OutletId>) {
        self.source = source;
    }
}
