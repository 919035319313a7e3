//! Graph Traversal
//!
//! Generic walks over a frontier of start nodes. The graph structure is not
//! known to this module: callers supply a *children relation*, a function
//! from a node to the nodes it leads to. The operator graph instantiates the
//! same walk twice, once following links upstream (ancestors) and once
//! downstream (descendants).
//!
//! # Algorithm
//!
//! 1. Seed the frontier with the roots, in the order given.
//! 2. Pop the next node. If it was already visited, discard it.
//! 3. Otherwise mark it visited, append it to the result and push every
//!    child that has not been visited yet.
//! 4. Stop when the frontier is empty.
//! 5. Optionally reverse the result.
//!
//! The visited check on pop is what makes the walk terminate on cyclic
//! relations: the visited set only grows and the reachable universe is
//! finite. It must never be skipped, even for children filtered at push
//! time, because the same node can be pushed by several parents before it
//! is popped.
//!
//! The visited set is local to each call. Walks are reentrant and can run
//! concurrently on shared read-only data.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::hash::Hash;

use indexmap::IndexSet;

/// Order in which the frontier is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frontier {
    /// FIFO: nearest nodes first.
    BreadthFirst,
    /// LIFO: follow the most recently discovered node first.
    DepthFirst,
}

/// Breadth-first walk from `roots`.
///
/// Every node reachable from the roots through `children` appears exactly
/// once in the result, roots included. With `reverse` the result is
/// returned farthest-first, which for an upstream walk puts sources before
/// the nodes that consume them.
///
/// ```
/// use flowgraph_core::traversal::bfs;
///
/// // 0 -> 1 -> 2 -> 0
/// let next = |n: &u32| vec![(n + 1) % 3];
/// assert_eq!(bfs([0], next, false), vec![0, 1, 2]);
/// assert_eq!(bfs([0], next, true), vec![2, 1, 0]);
/// ```
pub fn bfs<N, I, F>(roots: impl IntoIterator<Item = N>, mut children: F, reverse: bool) -> Vec<N>
where
    N: Eq + Hash + Clone,
    I: IntoIterator<Item = N>,
    F: FnMut(&N) -> I,
{
    match walk(roots, |n| Ok::<_, Infallible>(children(n)), Frontier::BreadthFirst, reverse) {
        Ok(nodes) => nodes,
        Err(never) => match never {},
    }
}

/// Breadth-first walk over a fallible children relation.
///
/// The walk stops at the first error returned by `children`.
pub fn try_bfs<N, I, E, F>(
    roots: impl IntoIterator<Item = N>,
    children: F,
    reverse: bool,
) -> Result<Vec<N>, E>
where
    N: Eq + Hash + Clone,
    I: IntoIterator<Item = N>,
    F: FnMut(&N) -> Result<I, E>,
{
    walk(roots, children, Frontier::BreadthFirst, reverse)
}

/// Depth-first walk from `roots`, with the same visit-once guarantee as
/// [`bfs`].
pub fn dfs<N, I, F>(roots: impl IntoIterator<Item = N>, mut children: F, reverse: bool) -> Vec<N>
where
    N: Eq + Hash + Clone,
    I: IntoIterator<Item = N>,
    F: FnMut(&N) -> I,
{
    match walk(roots, |n| Ok::<_, Infallible>(children(n)), Frontier::DepthFirst, reverse) {
        Ok(nodes) => nodes,
        Err(never) => match never {},
    }
}

/// Depth-first walk over a fallible children relation.
pub fn try_dfs<N, I, E, F>(
    roots: impl IntoIterator<Item = N>,
    children: F,
    reverse: bool,
) -> Result<Vec<N>, E>
where
    N: Eq + Hash + Clone,
    I: IntoIterator<Item = N>,
    F: FnMut(&N) -> Result<I, E>,
{
    walk(roots, children, Frontier::DepthFirst, reverse)
}

fn walk<N, I, E, F>(
    roots: impl IntoIterator<Item = N>,
    mut children: F,
    frontier: Frontier,
    reverse: bool,
) -> Result<Vec<N>, E>
where
    N: Eq + Hash + Clone,
    I: IntoIterator<Item = N>,
    F: FnMut(&N) -> Result<I, E>,
{
    let mut pending: VecDeque<N> = roots.into_iter().collect();
    // Insertion order of the visited set is the visiting order.
    let mut visited: IndexSet<N> = IndexSet::new();

    loop {
        let next = match frontier {
            Frontier::BreadthFirst => pending.pop_front(),
            Frontier::DepthFirst => pending.pop_back(),
        };
        let Some(node) = next else {
            break;
        };

        if visited.contains(&node) {
            continue;
        }

        let (index, _) = visited.insert_full(node);
        for child in children(&visited[index])? {
            if !visited.contains(&child) {
                pending.push_back(child);
            }
        }
    }

    tracing::trace!(visited = visited.len(), ?frontier, "walk finished");

    let mut nodes: Vec<N> = visited.into_iter().collect();
    if reverse {
        nodes.reverse();
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn adjacency(edges: &[(u32, u32)]) -> HashMap<u32, Vec<u32>> {
        let mut map: HashMap<u32, Vec<u32>> = HashMap::new();
        for &(from, to) in edges {
            map.entry(from).or_default().push(to);
        }
        map
    }

    #[test]
    fn bfs_visits_in_breadth_order() {
        // 0 -> 1, 0 -> 2, 1 -> 3, 2 -> 3
        let graph = adjacency(&[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let order = bfs([0], |n| graph.get(n).cloned().unwrap_or_default(), false);
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn bfs_terminates_on_self_loop() {
        let order = bfs([5u32], |n| vec![*n], false);
        assert_eq!(order, vec![5]);
    }

    #[test]
    fn bfs_terminates_on_mutual_cycle() {
        let graph = adjacency(&[(0, 1), (1, 0)]);
        let order = bfs([0], |n| graph.get(n).cloned().unwrap_or_default(), false);
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn bfs_reverse_yields_farthest_first() {
        let graph = adjacency(&[(0, 1), (1, 2)]);
        let order = bfs([0], |n| graph.get(n).cloned().unwrap_or_default(), true);
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn bfs_with_multiple_roots_keeps_caller_order() {
        let graph = adjacency(&[(0, 2), (1, 3)]);
        let order = bfs([1, 0], |n| graph.get(n).cloned().unwrap_or_default(), false);
        assert_eq!(order, vec![1, 0, 3, 2]);
    }

    #[test]
    fn duplicate_roots_are_visited_once() {
        let order = bfs([4u32, 4, 4], |_| Vec::new(), false);
        assert_eq!(order, vec![4]);
    }

    #[test]
    fn dfs_follows_the_latest_discovery() {
        // 0 -> 1, 0 -> 2, 1 -> 3
        let graph = adjacency(&[(0, 1), (0, 2), (1, 3)]);
        let order = dfs([0], |n| graph.get(n).cloned().unwrap_or_default(), false);
        assert_eq!(order, vec![0, 2, 1, 3]);
    }

    #[test]
    fn dfs_terminates_on_three_cycle() {
        let graph = adjacency(&[(0, 1), (1, 2), (2, 0)]);
        let order = dfs([0], |n| graph.get(n).cloned().unwrap_or_default(), false);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn try_bfs_stops_at_first_error() {
        let mut expanded = Vec::new();
        let result: Result<Vec<u32>, String> = try_bfs(
            [0],
            |n| {
                expanded.push(*n);
                if *n == 2 {
                    Err(format!("broken node {n}"))
                } else {
                    Ok(vec![n + 1])
                }
            },
            false,
        );
        assert_eq!(result, Err("broken node 2".to_string()));
        assert_eq!(expanded, vec![0, 1, 2]);
    }

    #[test]
    fn children_are_expanded_once_per_node() {
        let graph = adjacency(&[(0, 1), (0, 2), (1, 2), (2, 1)]);
        let mut calls: HashMap<u32, usize> = HashMap::new();
        bfs(
            [0],
            |n| {
                *calls.entry(*n).or_default() += 1;
                graph.get(n).cloned().unwrap_or_default()
            },
            false,
        );
        assert!(calls.values().all(|&count| count == 1));
        assert_eq!(calls.len(), 3);
    }
}
