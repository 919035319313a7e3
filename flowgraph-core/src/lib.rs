//! Flowgraph Core
//!
//! This crate provides the dependency-graph core of the flowgraph node
//! editor. It implements:
//!
//! - A generic, cycle-safe traversal primitive
//! - The operator graph: operators, their inlets and outlets, and links
//! - Ancestor and descendant queries
//! - Dependency-ordered, memoized evaluation of operator expressions
//!
//! Rendering, model-view binding, undo/redo and file formats belong to the
//! host application.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `traversal`: breadth- and depth-first walks over any children relation
//! - `expr`: the script language operators run, and native expressions
//! - `graph`: arena storage of operators and links, queries and mutations
//! - `eval`: the evaluation engine and its cache
//! - `session`: a lock around graph and evaluator for multi-threaded hosts
//! - `config`, `logging`, `error`: ambient plumbing
//!
//! # Example
//!
//! ```rust
//! use flowgraph_core::{Evaluator, FlowGraph};
//!
//! let mut graph = FlowGraph::new();
//! let a = graph.create_operator("A", "2")?;
//! let b = graph.create_operator("B", "a * 10 + 1")?;
//!
//! let outlet = graph.operator(a).unwrap().outlets()[0].id();
//! let inlet = graph.operator(b).unwrap().inlet("a").unwrap().id();
//! graph.add_link(outlet, inlet)?;
//!
//! assert_eq!(graph.ancestors(b)?, vec![b, a]);
//! assert_eq!(graph.descendants(a)?, vec![a, b]);
//!
//! let mut evaluator = Evaluator::new();
//! assert_eq!(evaluator.evaluate(&graph, b)?, 21.0);
//! # Ok::<(), flowgraph_core::GraphError>(())
//! ```

pub mod config;
pub mod error;
pub mod eval;
pub mod expr;
pub mod graph;
pub mod logging;
pub mod session;
pub mod traversal;

pub use config::{Config, CyclePolicy, EvalConfig, FanIn, GraphConfig};
pub use error::{Dangling, Entity, GraphError, Result};
pub use eval::{CacheEntry, CacheState, Evaluator};
pub use expr::{ExprError, Expression, NativeExpression, Script, Value};
pub use graph::{FlowGraph, InletId, Link, LinkId, Operator, OperatorId, OutletId};
pub use session::Session;
