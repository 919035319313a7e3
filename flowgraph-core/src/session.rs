//! Shared editing session.
//!
//! [`FlowGraph`] and [`Evaluator`] are plain data with no locking of their
//! own. A [`Session`] puts both behind one `parking_lot` mutex so editing
//! interactions and evaluation requests coming from different threads are
//! serialized. Clones share the same state.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::eval::Evaluator;
use crate::expr::Value;
use crate::graph::{FlowGraph, OperatorId};

#[derive(Debug, Default)]
struct State {
    graph: FlowGraph,
    evaluator: Evaluator,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<Mutex<State>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self::from_parts(
            FlowGraph::with_config(config.graph),
            Evaluator::with_config(config.evaluation),
        )
    }

    pub fn from_parts(graph: FlowGraph, evaluator: Evaluator) -> Self {
        Self {
            state: Arc::new(Mutex::new(State { graph, evaluator })),
        }
    }

    /// Read the graph under the lock.
    pub fn with_graph<R>(&self, f: impl FnOnce(&FlowGraph) -> R) -> R {
        f(&self.state.lock().graph)
    }

    /// Edit the graph under the lock.
    pub fn with_graph_mut<R>(&self, f: impl FnOnce(&mut FlowGraph) -> R) -> R {
        f(&mut self.state.lock().graph)
    }

    pub fn evaluate(&self, id: OperatorId) -> Result<Value> {
        let mut state = self.state.lock();
        let State { graph, evaluator } = &mut *state;
        evaluator.evaluate(graph, id)
    }

    pub fn invalidate(&self, id: OperatorId) -> Result<()> {
        let mut state = self.state.lock();
        let State { graph, evaluator } = &mut *state;
        evaluator.invalidate(graph, id)
    }

    pub fn ancestors(&self, id: OperatorId) -> Result<Vec<OperatorId>> {
        self.state.lock().graph.ancestors(id)
    }

    pub fn descendants(&self, id: OperatorId) -> Result<Vec<OperatorId>> {
        self.state.lock().graph.descendants(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn clones_share_state_across_threads() {
        let session = Session::new();
        let a = session
            .with_graph_mut(|graph| graph.create_operator("A", "x + 1"))
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let session = session.clone();
                thread::spawn(move || {
                    session
                        .with_graph_mut(|graph| graph.create_operator(format!("N{i}"), "2"))
                        .unwrap();
                    session.evaluate(a).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1.0);
        }
        assert_eq!(session.with_graph(FlowGraph::operator_count), 5);
        assert_eq!(session.ancestors(a).unwrap(), vec![a]);
        assert_eq!(session.descendants(a).unwrap(), vec![a]);
    }

    #[test]
    fn configured_session_uses_cycle_policy() {
        let config = Config::from_toml_str("[evaluation]\ncycle_policy = \"use_cached\"\n").unwrap();
        let session = Session::with_config(config);
        let a = session
            .with_graph_mut(|graph| {
                let a = graph.create_operator("A", "x + 1")?;
                let op = graph.operator(a).map(|op| (op.outlets()[0].id(), op.inlets()[0].id()));
                if let Some((outlet, inlet)) = op {
                    graph.add_link(outlet, inlet)?;
                }
                Ok::<_, crate::error::GraphError>(a)
            })
            .unwrap();

        assert_eq!(session.evaluate(a).unwrap(), 1.0);
        session.invalidate(a).unwrap();
        assert_eq!(session.evaluate(a).unwrap(), 2.0);
    }
}
