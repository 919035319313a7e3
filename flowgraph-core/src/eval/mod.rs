//! Evaluation Engine
//!
//! [`Evaluator::evaluate`] produces the value of an operator given the
//! current graph.
//!
//! # Algorithm
//!
//! 1. Collect the ancestors of the requested operator with the traversal
//!    primitive, reversed so sources come first.
//! 2. Resolve each of them depth-first. Every operator is entered once per
//!    pass; an upstream operator found still in progress is a cycle.
//! 3. Gather inlet values (the linked outlet's value, the sum of several
//!    links, or the inlet's default when nothing is linked), execute the
//!    expression and store the outputs in the cache.
//! 4. Return the cached outputs of the requested operator.
//!
//! # Cycles
//!
//! What a cycle contributes is decided by [`CyclePolicy`]:
//!
//! - `Fail` (default): the evaluation fails with `CyclicDependency`, naming
//!   the re-entered operator.
//! - `UseCached`: the re-entered operator contributes its last cached
//!   value, or the reading inlet's default if it was never computed. That
//!   value counts as new as the pass that cached it, so an edit feeding the
//!   loop reaches the reader one evaluation after it reaches the producer.
//!
//! Either way evaluation terminates: the visitation marks bound the work to
//! one computation per operator per pass.
//!
//! [`CyclePolicy`]: crate::config::CyclePolicy

mod cache;
mod engine;
mod pass;

pub use cache::{CacheEntry, CacheState};
pub use engine::Evaluator;
