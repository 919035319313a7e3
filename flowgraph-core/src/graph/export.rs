//! Export to `petgraph`, for analyses the crate does not implement itself.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use super::ids::OperatorId;
use super::store::FlowGraph;
use crate::error::{Dangling, GraphError, Result};

impl FlowGraph {
    /// Build a `petgraph` digraph with one node per operator (weighted by
    /// operator name) and one edge per link (weighted by the target inlet's
    /// name). Node indices follow display order.
    ///
    /// Fails with `DanglingReference` if a link points at an operator that
    /// is not in the graph.
    pub fn to_digraph(&self) -> Result<DiGraph<String, String>> {
        let mut digraph = DiGraph::with_capacity(self.operator_count(), self.link_count());
        let mut nodes: HashMap<OperatorId, NodeIndex> = HashMap::new();
        for op in self.operators() {
            nodes.insert(op.id(), digraph.add_node(op.name().to_string()));
        }

        for link in self.links() {
            let endpoint = |operator: OperatorId| {
                nodes.get(&operator).copied().ok_or(GraphError::DanglingReference(
                    Dangling::Link {
                        link: link.id(),
                        operator,
                    },
                ))
            };
            let source = endpoint(link.source_operator())?;
            let target = endpoint(link.target_operator())?;
            let inlet = self
                .inlet(link.target().port)
                .map(|inlet| inlet.name().to_string())
                .unwrap_or_default();
            digraph.add_edge(source, target, inlet);
        }

        Ok(digraph)
    }
}
