//! Operator Graph
//!
//! This module implements the directed graph of operators that the editor
//! displays and evaluates.
//!
//! # Overview
//!
//! - Operators are the nodes. Each owns ordered inlets (inputs) and outlets
//!   (outputs) derived from its expression.
//! - Links are the edges. A link runs from one outlet to one inlet; an
//!   outlet may feed any number of links.
//!
//! # Design Decisions
//!
//! 1. Arena storage: operators and links live in indexed maps inside
//!    [`FlowGraph`] and refer to each other through `Copy` handles, never
//!    through references.
//!
//! 2. Both link directions are indexed (outgoing per outlet, incoming per
//!    inlet) so upstream and downstream walks cost the same.
//!
//! 3. Cycles are allowed. The graph never refuses a link for closing a
//!    loop; queries and evaluation are responsible for terminating.
//!
//! 4. A link whose operator is missing is a structural defect. Queries
//!    report it as `DanglingReference` instead of skipping the link.

mod export;
mod ids;
mod link;
mod operator;
mod snapshot;
mod store;

pub use ids::{InletId, LinkId, OperatorId, OutletId};
pub use link::{Endpoint, Link};
pub use operator::{Inlet, Operator, Outlet, RemovedPorts};
pub use snapshot::{GraphSnapshot, InletSnapshot, LinkSnapshot, OperatorSnapshot, OutletSnapshot};
pub use store::FlowGraph;
