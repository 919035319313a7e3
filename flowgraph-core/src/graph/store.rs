//! Operator Graph
//!
//! [`FlowGraph`] owns every operator and link and keeps two link indices:
//! outgoing links per outlet and incoming links per inlet. Each link is in
//! exactly one entry of each index, so removing it from both ends is O(1).
//!
//! Cycles are a valid graph state. Nothing here rejects them; the traversal
//! visited set and the evaluation pass marks are what keep queries finite.
//!
//! # Revisions
//!
//! The graph carries a counter bumped by every change that can alter a
//! value: operator creation or re-insertion, expression and inlet default
//! changes, and link changes (which stamp the operator on the inlet side).
//! The evaluator compares these stamps against its cache.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::ids::{InletId, LinkId, OperatorId, OutletId};
use super::link::{Endpoint, Link};
use super::operator::{Inlet, Operator, Outlet, RemovedPorts};
use crate::config::{FanIn, GraphConfig};
use crate::error::{Dangling, Entity, GraphError, Result};
use crate::expr::{Expression, NativeExpression, Value};
use crate::traversal::try_bfs;

/// A directed graph of operators connected by links.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    config: GraphConfig,

    /// Operators in display order.
    operators: IndexMap<OperatorId, Operator>,

    /// Links in insertion order.
    links: IndexMap<LinkId, Link>,

    /// Links leaving each outlet.
    outgoing: HashMap<OutletId, IndexSet<LinkId>>,

    /// Links entering each inlet, in link order.
    incoming: HashMap<InletId, IndexSet<LinkId>>,

    inlet_owner: HashMap<InletId, OperatorId>,
    outlet_owner: HashMap<OutletId, OperatorId>,

    revision: u64,
}

impl FlowGraph {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Current graph revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Stamp `id` with a fresh revision, if it is still in the graph.
    fn touch(&mut self, id: OperatorId) {
        let revision = self.bump();
        if let Some(op) = self.operators.get_mut(&id) {
            op.set_revision(revision);
        }
    }

    // ----- operators -----

    /// Append an operator.
    pub fn add_operator(&mut self, operator: Operator) -> Result<OperatorId> {
        self.insert_operator(self.operators.len(), operator)
    }

    /// Parse `source` and append an operator running it.
    ///
    /// Inlets start with the configured default value.
    pub fn create_operator(&mut self, name: impl Into<String>, source: &str) -> Result<OperatorId> {
        let expression = Expression::parse(source)?;
        let operator =
            Operator::with_default_inlet_value(name, expression, self.config.default_inlet_value);
        self.add_operator(operator)
    }

    /// Append an operator backed by a native expression.
    pub fn create_native_operator(
        &mut self,
        name: impl Into<String>,
        expression: NativeExpression,
    ) -> Result<OperatorId> {
        let operator =
            Operator::with_default_inlet_value(name, expression, self.config.default_inlet_value);
        self.add_operator(operator)
    }

    /// Insert an operator at `index` in display order (clamped to the
    /// operator count).
    ///
    /// This is also how an operator detached with [`take_operator`] comes
    /// back: links that were left pointing at it become live again.
    ///
    /// [`take_operator`]: FlowGraph::take_operator
    pub fn insert_operator(&mut self, index: usize, operator: Operator) -> Result<OperatorId> {
        let id = operator.id();
        if self.operators.contains_key(&id) {
            return Err(GraphError::DuplicateOperator(id));
        }

        self.register_ports(id, operator.inlets(), operator.outlets());
        let index = index.min(self.operators.len());
        self.operators.shift_insert(index, id, operator);
        self.touch(id);

        debug!(operator = %id, index, "operator inserted");
        Ok(id)
    }

    fn register_ports(&mut self, id: OperatorId, inlets: &[Inlet], outlets: &[Outlet]) {
        for inlet in inlets {
            self.inlet_owner.insert(inlet.id(), id);
        }
        for outlet in outlets {
            self.outlet_owner.insert(outlet.id(), id);
        }
    }

    fn unregister_ports(&mut self, operator: &Operator) {
        for inlet in operator.inlets() {
            self.inlet_owner.remove(&inlet.id());
        }
        for outlet in operator.outlets() {
            self.outlet_owner.remove(&outlet.id());
        }
    }

    /// Remove an operator together with every link attached to its ports.
    pub fn remove_operator(&mut self, id: OperatorId) -> Result<Operator> {
        let Some(operator) = self.operators.get(&id) else {
            return Err(GraphError::DanglingReference(Dangling::Absent(Entity::Operator(id))));
        };

        let mut attached: IndexSet<LinkId> = IndexSet::new();
        for inlet in operator.inlets() {
            attached.extend(self.incoming.get(&inlet.id()).into_iter().flatten().copied());
        }
        for outlet in operator.outlets() {
            attached.extend(self.outgoing.get(&outlet.id()).into_iter().flatten().copied());
        }
        for link in &attached {
            self.detach_link(*link);
        }

        let operator = self
            .operators
            .shift_remove(&id)
            .ok_or(GraphError::NotFound(Entity::Operator(id)))?;
        self.unregister_ports(&operator);
        self.bump();

        debug!(operator = %id, links = attached.len(), "operator removed");
        Ok(operator)
    }

    /// Detach an operator without touching its links.
    ///
    /// The links keep their endpoints and dangle until the operator is
    /// re-inserted or [`prune_dangling_links`] runs. Queries and evaluation
    /// that reach them fail with `DanglingReference`.
    ///
    /// [`prune_dangling_links`]: FlowGraph::prune_dangling_links
    pub fn take_operator(&mut self, id: OperatorId) -> Result<Operator> {
        let operator = self
            .operators
            .shift_remove(&id)
            .ok_or(GraphError::DanglingReference(Dangling::Absent(Entity::Operator(id))))?;
        self.unregister_ports(&operator);
        self.bump();

        debug!(operator = %id, "operator detached");
        Ok(operator)
    }

    pub fn rename_operator(&mut self, id: OperatorId, name: impl Into<String>) -> Result<()> {
        self.operator_mut(id)?.set_name(name.into());
        Ok(())
    }

    /// Replace an operator's expression.
    ///
    /// Inlets whose variable survives keep their identity and links. Inlets
    /// freed by the change are reused, in order, for the new variables.
    /// Whatever is left over is removed together with its links.
    pub fn set_expression(&mut self, id: OperatorId, expression: impl Into<Expression>) -> Result<RemovedPorts> {
        let default = self.config.default_inlet_value;
        let operator = self.operator_mut(id)?;
        let removed = operator.replace_expression(expression.into(), default);
        let inlets = operator.inlets().to_vec();
        let outlets = operator.outlets().to_vec();

        for inlet in &removed.inlets {
            let links = self.incoming.remove(inlet).unwrap_or_default();
            for link in links {
                self.detach_link(link);
            }
            self.inlet_owner.remove(inlet);
        }
        for outlet in &removed.outlets {
            let links = self.outgoing.remove(outlet).unwrap_or_default();
            for link in links {
                self.detach_link(link);
            }
            self.outlet_owner.remove(outlet);
        }
        self.register_ports(id, &inlets, &outlets);
        self.touch(id);

        debug!(
            operator = %id,
            removed_inlets = removed.inlets.len(),
            removed_outlets = removed.outlets.len(),
            "expression replaced"
        );
        Ok(removed)
    }

    /// Parse `source` and make it the operator's expression.
    pub fn set_script(&mut self, id: OperatorId, source: &str) -> Result<RemovedPorts> {
        let expression = Expression::parse(source)?;
        self.set_expression(id, expression)
    }

    /// Change the value an inlet takes while nothing is linked to it.
    pub fn set_inlet_default(&mut self, inlet: InletId, value: Value) -> Result<()> {
        let owner = self.inlet_operator(inlet)?;
        if !self.operator_mut(owner)?.set_inlet_default(inlet, value) {
            return Err(GraphError::NotFound(Entity::Inlet(inlet)));
        }
        self.touch(owner);
        Ok(())
    }

    fn operator_mut(&mut self, id: OperatorId) -> Result<&mut Operator> {
        self.operators
            .get_mut(&id)
            .ok_or(GraphError::NotFound(Entity::Operator(id)))
    }

    // ----- lookups -----

    pub fn operator(&self, id: OperatorId) -> Option<&Operator> {
        self.operators.get(&id)
    }

    pub fn contains(&self, id: OperatorId) -> bool {
        self.operators.contains_key(&id)
    }

    /// Operators in display order.
    pub fn operators(&self) -> impl Iterator<Item = &Operator> + '_ {
        self.operators.values()
    }

    pub fn operator_ids(&self) -> impl Iterator<Item = OperatorId> + '_ {
        self.operators.keys().copied()
    }

    pub fn operator_count(&self) -> usize {
        self.operators.len()
    }

    /// First operator with the given name.
    pub fn find_operator(&self, name: &str) -> Option<OperatorId> {
        self.operators
            .values()
            .find(|op| op.name() == name)
            .map(Operator::id)
    }

    /// Position of an operator in display order.
    pub fn position(&self, id: OperatorId) -> Option<usize> {
        self.operators.get_index_of(&id)
    }

    /// The live operator owning an inlet.
    pub fn inlet_operator(&self, inlet: InletId) -> Result<OperatorId> {
        self.inlet_owner
            .get(&inlet)
            .copied()
            .ok_or(GraphError::NotFound(Entity::Inlet(inlet)))
    }

    /// The live operator owning an outlet.
    pub fn outlet_operator(&self, outlet: OutletId) -> Result<OperatorId> {
        self.outlet_owner
            .get(&outlet)
            .copied()
            .ok_or(GraphError::NotFound(Entity::Outlet(outlet)))
    }

    pub fn inlet(&self, id: InletId) -> Option<&Inlet> {
        let owner = self.inlet_owner.get(&id)?;
        self.operators
            .get(owner)?
            .inlets()
            .iter()
            .find(|inlet| inlet.id() == id)
    }

    pub fn outlet(&self, id: OutletId) -> Option<&Outlet> {
        let owner = self.outlet_owner.get(&id)?;
        self.operators
            .get(owner)?
            .outlets()
            .iter()
            .find(|outlet| outlet.id() == id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Links in graph order.
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Links feeding an inlet, in link order.
    pub fn in_links(&self, inlet: InletId) -> impl Iterator<Item = &Link> + '_ {
        self.incoming
            .get(&inlet)
            .into_iter()
            .flatten()
            .filter_map(|id| self.links.get(id))
    }

    /// Links leaving an outlet.
    pub fn out_links(&self, outlet: OutletId) -> impl Iterator<Item = &Link> + '_ {
        self.outgoing
            .get(&outlet)
            .into_iter()
            .flatten()
            .filter_map(|id| self.links.get(id))
    }

    // ----- links -----

    /// Connect an outlet to an inlet, appending the link.
    pub fn add_link(&mut self, source: OutletId, target: InletId) -> Result<LinkId> {
        self.insert_link(self.links.len(), source, target)
    }

    /// Connect an outlet to an inlet, placing the link at `index` in link
    /// order (clamped to the link count).
    ///
    /// Both ports must belong to operators in the graph. Cycles, self-links
    /// included, are accepted.
    pub fn insert_link(&mut self, index: usize, source: OutletId, target: InletId) -> Result<LinkId> {
        let source = Endpoint {
            operator: self.outlet_operator(source)?,
            port: source,
        };
        let target = Endpoint {
            operator: self.inlet_operator(target)?,
            port: target,
        };

        let feeding = self.incoming.get(&target.port);
        if self.config.fan_in == FanIn::Single {
            if let Some(&existing) = feeding.and_then(|links| links.first()) {
                return Err(GraphError::InletOccupied {
                    inlet: target.port,
                    link: existing,
                });
            }
        }

        let index = index.min(self.links.len());
        // Keep the inlet's links in the same relative order as the graph's.
        let slot = feeding.map_or(0, |links| {
            links
                .iter()
                .filter(|id| self.links.get_index_of(*id).is_some_and(|at| at < index))
                .count()
        });

        let link = Link::new(source, target);
        let id = link.id();
        self.links.shift_insert(index, id, link);
        self.outgoing.entry(source.port).or_default().insert(id);
        self.incoming
            .entry(target.port)
            .or_default()
            .shift_insert(slot, id);
        self.touch(target.operator);

        debug!(
            link = %id,
            source = %source.operator,
            target = %target.operator,
            "link added"
        );
        Ok(id)
    }

    /// Re-point a link at a different source outlet.
    pub fn set_link_source(&mut self, link: LinkId, outlet: OutletId) -> Result<()> {
        let operator = self.outlet_operator(outlet)?;
        let entry = self
            .links
            .get_mut(&link)
            .ok_or(GraphError::NotFound(Entity::Link(link)))?;
        let old = entry.source();
        let target = entry.target_operator();
        entry.set_source(Endpoint { operator, port: outlet });

        if let Some(links) = self.outgoing.get_mut(&old.port) {
            links.shift_remove(&link);
            if links.is_empty() {
                self.outgoing.remove(&old.port);
            }
        }
        self.outgoing.entry(outlet).or_default().insert(link);
        self.touch(target);

        debug!(link = %link, source = %operator, "link source changed");
        Ok(())
    }

    /// Remove a link from the graph and from both link indices.
    pub fn remove_link(&mut self, id: LinkId) -> Result<Link> {
        let link = self
            .detach_link(id)
            .ok_or(GraphError::DanglingReference(Dangling::Absent(Entity::Link(id))))?;
        debug!(link = %id, "link removed");
        Ok(link)
    }

    fn detach_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.links.shift_remove(&id)?;

        let source = link.source().port;
        if let Some(links) = self.outgoing.get_mut(&source) {
            links.shift_remove(&id);
            if links.is_empty() {
                self.outgoing.remove(&source);
            }
        }
        let target = link.target().port;
        if let Some(links) = self.incoming.get_mut(&target) {
            links.shift_remove(&id);
            if links.is_empty() {
                self.incoming.remove(&target);
            }
        }

        self.touch(link.target_operator());
        Some(link)
    }

    /// Links whose source or target operator is not in the graph.
    pub fn dangling_links(&self) -> Vec<LinkId> {
        self.links
            .values()
            .filter(|link| {
                !self.contains(link.source_operator()) || !self.contains(link.target_operator())
            })
            .map(Link::id)
            .collect()
    }

    /// Remove every dangling link. Returns the removed links.
    pub fn prune_dangling_links(&mut self) -> Vec<Link> {
        let pruned: Vec<Link> = self
            .dangling_links()
            .into_iter()
            .filter_map(|id| self.detach_link(id))
            .collect();
        if !pruned.is_empty() {
            debug!(count = pruned.len(), "dangling links pruned");
        }
        pruned
    }

    // ----- queries -----

    fn require(&self, id: OperatorId) -> Result<&Operator> {
        self.operators
            .get(&id)
            .ok_or(GraphError::NotFound(Entity::Operator(id)))
    }

    /// The operator at the far end of `link`, which must be live.
    fn live_endpoint(&self, link: LinkId, operator: OperatorId) -> Result<OperatorId> {
        if self.contains(operator) {
            Ok(operator)
        } else {
            Err(GraphError::DanglingReference(Dangling::Link { link, operator }))
        }
    }

    /// Source operators of the links feeding `id`'s inlets, one entry per
    /// link, in inlet order.
    pub fn upstream_operators(&self, id: OperatorId) -> Result<Vec<OperatorId>> {
        let operator = self.require(id)?;
        let mut upstream = Vec::new();
        for inlet in operator.inlets() {
            for link in self.in_links(inlet.id()) {
                upstream.push(self.live_endpoint(link.id(), link.source_operator())?);
            }
        }
        Ok(upstream)
    }

    /// Target operators of the links leaving `id`'s outlets, one entry per
    /// link, in outlet order.
    pub fn downstream_operators(&self, id: OperatorId) -> Result<Vec<OperatorId>> {
        let operator = self.require(id)?;
        let mut downstream = Vec::new();
        for outlet in operator.outlets() {
            for link in self.out_links(outlet.id()) {
                downstream.push(self.live_endpoint(link.id(), link.target_operator())?);
            }
        }
        Ok(downstream)
    }

    /// Every operator feeding `id`, directly or transitively.
    ///
    /// The result starts with `id` itself, followed by the rest
    /// breadth-first, nearest first. An operator with no incoming links
    /// yields `[id]`.
    pub fn ancestors(&self, id: OperatorId) -> Result<Vec<OperatorId>> {
        self.require(id)?;
        try_bfs([id], |n| self.upstream_operators(*n), false)
    }

    /// Every operator fed by `id`, directly or transitively.
    ///
    /// Same shape as [`ancestors`](FlowGraph::ancestors), following links
    /// toward their target operators.
    pub fn descendants(&self, id: OperatorId) -> Result<Vec<OperatorId>> {
        self.require(id)?;
        try_bfs([id], |n| self.downstream_operators(*n), false)
    }

    /// [`ancestors`](FlowGraph::ancestors) reversed: farthest sources first,
    /// `id` last.
    pub fn evaluation_order(&self, id: OperatorId) -> Result<Vec<OperatorId>> {
        self.require(id)?;
        try_bfs([id], |n| self.upstream_operators(*n), true)
    }
}
