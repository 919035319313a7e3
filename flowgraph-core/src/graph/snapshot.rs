//! Enumeration of the graph for persistence layers.
//!
//! A [`GraphSnapshot`] lists operators and links in graph order with plain
//! data only. It is the source a persistence layer serializes from; the
//! crate does not define a file format of its own.

use serde::Serialize;

use super::ids::{InletId, LinkId, OperatorId, OutletId};
use super::store::FlowGraph;
use crate::error::Result;
use crate::expr::{Expression, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub revision: u64,
    pub operators: Vec<OperatorSnapshot>,
    pub links: Vec<LinkSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorSnapshot {
    pub id: OperatorId,
    pub name: String,
    /// Script source, or the label of a native expression.
    pub expression: String,
    pub native: bool,
    pub inlets: Vec<InletSnapshot>,
    pub outlets: Vec<OutletSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InletSnapshot {
    pub id: InletId,
    pub name: String,
    pub default: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutletSnapshot {
    pub id: OutletId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSnapshot {
    pub id: LinkId,
    pub source_operator: OperatorId,
    pub source_outlet: OutletId,
    pub target_operator: OperatorId,
    pub target_inlet: InletId,
}

impl GraphSnapshot {
    /// Pretty-printed JSON, for debugging and ad-hoc export.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FlowGraph {
    /// Enumerate operators and links in graph order.
    pub fn snapshot(&self) -> GraphSnapshot {
        let operators = self
            .operators()
            .map(|op| OperatorSnapshot {
                id: op.id(),
                name: op.name().to_string(),
                expression: op.expression().source().to_string(),
                native: matches!(op.expression(), Expression::Native(_)),
                inlets: op
                    .inlets()
                    .iter()
                    .map(|inlet| InletSnapshot {
                        id: inlet.id(),
                        name: inlet.name().to_string(),
                        default: inlet.default_value(),
                    })
                    .collect(),
                outlets: op
                    .outlets()
                    .iter()
                    .map(|outlet| OutletSnapshot {
                        id: outlet.id(),
                        name: outlet.name().to_string(),
                    })
                    .collect(),
            })
            .collect();

        let links = self
            .links()
            .map(|link| LinkSnapshot {
                id: link.id(),
                source_operator: link.source_operator(),
                source_outlet: link.source().port,
                target_operator: link.target_operator(),
                target_inlet: link.target().port,
            })
            .collect();

        GraphSnapshot {
            revision: self.revision(),
            operators,
            links,
        }
    }
}
