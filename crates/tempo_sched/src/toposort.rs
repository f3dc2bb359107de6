//! Linearization of the resolved, acyclic dependency graph.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tempo_common::{InternalError, TempoResult};

use crate::graph::DepGraph;
use crate::ids::BlockId;

/// Topologically sorts `graph`, breaking ties by lowest block ID.
///
/// Kahn's algorithm over a min-heap of ready blocks; iterative, so chain
/// depth is bounded only by memory. Fails if the graph still has a cycle,
/// which would mean disambiguation left one behind.
pub fn linearize(graph: &DepGraph) -> TempoResult<Vec<BlockId>> {
    let succ = graph.successors();
    let mut in_degree = vec![0usize; graph.block_count()];
    for (_, to) in graph.edges() {
        in_degree[to.index()] += 1;
    }

    let mut ready: BinaryHeap<Reverse<BlockId>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(i, _)| Reverse(BlockId::from_raw(i as u32)))
        .collect();

    let mut order = Vec::with_capacity(graph.block_count());
    while let Some(Reverse(block)) = ready.pop() {
        order.push(block);
        for &next in &succ[block.index()] {
            in_degree[next.index()] -= 1;
            if in_degree[next.index()] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != graph.block_count() {
        return Err(InternalError::new(format!(
            "dependency graph still cyclic after disambiguation ({} of {} blocks ordered)",
            order.len(),
            graph.block_count()
        )));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{EdgeCause, RawEdge};

    fn edge(from: u32, to: u32) -> RawEdge {
        RawEdge {
            from: BlockId::from_raw(from),
            to: BlockId::from_raw(to),
            cause: EdgeCause::Before,
        }
    }

    fn ids(order: &[BlockId]) -> Vec<u32> {
        order.iter().map(|b| b.as_raw()).collect()
    }

    #[test]
    fn unconstrained_blocks_keep_registration_order() {
        let graph = DepGraph::new(4);
        assert_eq!(ids(&linearize(&graph).unwrap()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn lowest_ready_id_goes_first() {
        // 3 -> 0; 1 and 2 are free.
        let graph = DepGraph::build(4, &[edge(3, 0)]);
        assert_eq!(ids(&linearize(&graph).unwrap()), vec![1, 2, 3, 0]);
    }

    #[test]
    fn respects_every_edge() {
        let edges = [edge(4, 2), edge(2, 0), edge(1, 3), edge(4, 1)];
        let graph = DepGraph::build(5, &edges);
        let order = linearize(&graph).unwrap();
        let pos = |b: u32| order.iter().position(|x| x.as_raw() == b).unwrap();
        for e in &edges {
            assert!(pos(e.from.as_raw()) < pos(e.to.as_raw()));
        }
    }

    #[test]
    fn cycle_is_an_internal_error() {
        let graph = DepGraph::build(2, &[edge(0, 1), edge(1, 0)]);
        let err = linearize(&graph).unwrap_err();
        assert!(err.message.contains("0 of 2"));
    }

    #[test]
    fn long_chain_is_iterative() {
        let edges: Vec<_> = (0..4999).map(|i| edge(i + 1, i)).collect();
        let graph = DepGraph::build(5000, &edges);
        let order = linearize(&graph).unwrap();
        assert_eq!(order.first().map(|b| b.as_raw()), Some(4999));
        assert_eq!(order.last().map(|b| b.as_raw()), Some(0));
    }
}
