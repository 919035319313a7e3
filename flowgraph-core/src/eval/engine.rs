//! The evaluator.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::cache::{CacheEntry, CacheState};
use super::pass::{Mark, Pass};
use crate::config::{CyclePolicy, EvalConfig};
use crate::error::{Dangling, Entity, GraphError, Result};
use crate::expr::{ExprError, Outputs, Value};
use crate::graph::{FlowGraph, Inlet, Link, OperatorId, OutletId};

/// An operator on the resolution stack and the upstream operators it still
/// has to visit.
struct Frame {
    operator: OperatorId,
    upstream: Vec<OperatorId>,
    next: usize,
}

impl Frame {
    fn enter(graph: &FlowGraph, operator: OperatorId) -> Result<Self> {
        Ok(Self {
            operator,
            upstream: graph.upstream_operators(operator)?,
            next: 0,
        })
    }
}

/// Evaluates operators in dependency order and memoizes their outputs.
///
/// The cache outlives single calls. An entry is reused while it is clean
/// and no revision in its upstream cone is newer than the entry, so editing
/// the graph only recomputes what the edit can reach.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvalConfig,
    cache: HashMap<OperatorId, CacheEntry>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Self {
            config,
            cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Value of the first outlet of `id`.
    pub fn evaluate(&mut self, graph: &FlowGraph, id: OperatorId) -> Result<Value> {
        let outputs = self.outputs(graph, id)?;
        outputs.first().copied().ok_or(GraphError::Expression {
            operator: id,
            source: ExprError::OutletArity {
                expected: 1,
                found: 0,
            },
        })
    }

    /// Value of a specific outlet.
    pub fn evaluate_outlet(&mut self, graph: &FlowGraph, outlet: OutletId) -> Result<Value> {
        let owner = graph.outlet_operator(outlet)?;
        let index = outlet_index(graph, owner, outlet)?;
        let outputs = self.outputs(graph, owner)?;
        outputs
            .get(index)
            .copied()
            .ok_or(GraphError::NotFound(Entity::Outlet(outlet)))
    }

    /// Values of every outlet of `id`, in outlet order.
    ///
    /// 1. Forget operators that left the graph.
    /// 2. Take the ancestors of `id`, sources first.
    /// 3. Resolve each one depth-first, so an operator is only computed once
    ///    everything it reads is complete in this pass.
    pub fn outputs(&mut self, graph: &FlowGraph, id: OperatorId) -> Result<Outputs> {
        self.cache.retain(|operator, _| graph.contains(*operator));

        let order = graph.evaluation_order(id)?;
        debug!(operator = %id, ancestors = order.len() - 1, "evaluating");

        let mut pass = Pass::default();
        for operator in order {
            self.resolve(graph, operator, &mut pass)?;
        }

        self.cache
            .get(&id)
            .map(|entry| entry.outputs().iter().copied().collect())
            .ok_or(GraphError::NotFound(Entity::Operator(id)))
    }

    /// Mark `id` and everything downstream of it dirty.
    pub fn invalidate(&mut self, graph: &FlowGraph, id: OperatorId) -> Result<()> {
        for operator in graph.descendants(id)? {
            if let Some(entry) = self.cache.get_mut(&operator) {
                entry.mark_dirty();
            }
        }
        Ok(())
    }

    /// Drop every cached value.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn cached(&self, id: OperatorId) -> Option<&[Value]> {
        self.cache.get(&id).map(CacheEntry::outputs)
    }

    pub fn cache_state(&self, id: OperatorId) -> Option<CacheState> {
        self.cache.get(&id).map(CacheEntry::state)
    }

    pub fn cache_entry(&self, id: OperatorId) -> Option<&CacheEntry> {
        self.cache.get(&id)
    }

    /// Post-order walk from `root` over operators not yet entered in this
    /// pass. Uses an explicit stack so long chains cannot overflow.
    fn resolve(&mut self, graph: &FlowGraph, root: OperatorId, pass: &mut Pass) -> Result<()> {
        if !pass.begin(root) {
            return Ok(());
        }
        let mut stack = vec![Frame::enter(graph, root)?];

        while let Some(frame) = stack.last_mut() {
            match frame.upstream.get(frame.next).copied() {
                Some(upstream) => {
                    frame.next += 1;
                    // Operators already entered are either complete or on the
                    // stack; the latter is a cycle, handled when reading.
                    if pass.begin(upstream) {
                        stack.push(Frame::enter(graph, upstream)?);
                    }
                }
                None => {
                    let operator = frame.operator;
                    stack.pop();
                    let effective = self.compute(graph, operator, pass)?;
                    pass.complete(operator, effective);
                }
            }
        }
        Ok(())
    }

    /// Compute one operator whose upstream operators are all entered.
    /// Returns its effective revision.
    fn compute(&mut self, graph: &FlowGraph, id: OperatorId, pass: &Pass) -> Result<u64> {
        let operator = graph
            .operator(id)
            .ok_or(GraphError::NotFound(Entity::Operator(id)))?;

        let mut effective = operator.revision();
        let mut inputs: SmallVec<[Value; 4]> = SmallVec::with_capacity(operator.inlets().len());
        for inlet in operator.inlets() {
            let mut sum: Option<Value> = None;
            for link in graph.in_links(inlet.id()) {
                let (value, revision) = self.read_link(graph, link, inlet, id, pass)?;
                effective = effective.max(revision);
                sum = Some(sum.unwrap_or(0.0) + value);
            }
            inputs.push(sum.unwrap_or_else(|| inlet.default_value()));
        }

        if let Some(entry) = self.cache.get(&id) {
            if entry.is_fresh(effective) {
                trace!(operator = %id, "cache hit");
                return Ok(effective);
            }
        }

        let outputs = operator
            .expression()
            .execute(&inputs)
            .map_err(|source| GraphError::Expression { operator: id, source })?;
        debug!(operator = %id, name = operator.name(), ?outputs, "operator computed");

        self.cache
            .insert(id, CacheEntry::new(outputs, graph.revision()));
        Ok(effective)
    }

    /// Value carried by `link` into `inlet` of `reader`, and the revision
    /// it reflects.
    fn read_link(
        &self,
        graph: &FlowGraph,
        link: &Link,
        inlet: &Inlet,
        reader: OperatorId,
        pass: &Pass,
    ) -> Result<(Value, u64)> {
        let source = link.source_operator();
        let producer = graph.operator(source).ok_or(GraphError::DanglingReference(
            Dangling::Link {
                link: link.id(),
                operator: source,
            },
        ))?;
        let index = outlet_index(graph, source, link.source().port)?;

        match pass.mark(source) {
            Some(Mark::Complete { effective }) => {
                let value = self
                    .cache
                    .get(&source)
                    .and_then(|entry| entry.outputs().get(index).copied())
                    .ok_or(GraphError::NotFound(Entity::Outlet(link.source().port)))?;
                Ok((value, effective))
            }
            _ => match self.config.cycle_policy {
                CyclePolicy::Fail => Err(GraphError::CyclicDependency { operator: source }),
                CyclePolicy::UseCached => {
                    // A previous value is as new as the pass that stored it,
                    // so readers recompute once the producer has been redone.
                    let cached = self.cache.get(&source).and_then(|entry| {
                        let value = entry.outputs().get(index).copied()?;
                        Some((value, entry.computed_at()))
                    });
                    warn!(
                        operator = %reader,
                        upstream = %source,
                        cached = cached.is_some(),
                        "cycle reached during evaluation; using previous value"
                    );
                    Ok(match cached {
                        Some((value, computed_at)) => {
                            (value, producer.revision().max(computed_at))
                        }
                        None => (inlet.default_value(), producer.revision()),
                    })
                }
            },
        }
    }
}

fn outlet_index(graph: &FlowGraph, operator: OperatorId, outlet: OutletId) -> Result<usize> {
    graph
        .operator(operator)
        .and_then(|op| op.outlets().iter().position(|o| o.id() == outlet))
        .ok_or(GraphError::NotFound(Entity::Outlet(outlet)))
}
