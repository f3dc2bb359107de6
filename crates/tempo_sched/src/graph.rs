//! The block dependency graph.
//!
//! [`DepGraph`] is a simple directed graph over update blocks: at most one
//! edge per ordered pair, no self-edges, every cause for an edge kept for
//! error reporting. Edges live in a `BTreeMap`, so iteration order (and
//! with it everything downstream) depends only on block IDs.

use std::collections::BTreeMap;

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::collect::{EdgeCause, RawEdge};
use crate::ids::BlockId;

/// Deduplicated dependency graph over `block_count` blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DepGraph {
    block_count: usize,
    edges: BTreeMap<(BlockId, BlockId), Vec<EdgeCause>>,
}

impl DepGraph {
    /// Creates a graph with no edges.
    pub fn new(block_count: usize) -> Self {
        Self {
            block_count,
            edges: BTreeMap::new(),
        }
    }

    /// Builds the graph from raw edges.
    ///
    /// Self-edges are dropped, as are the two halves of each expanded
    /// `equal` constraint: two blocks sharing a priority may run in either
    /// order, so those edges only matter for grouping, which the collector
    /// has already applied.
    pub fn build(block_count: usize, raw: &[RawEdge]) -> Self {
        let mut graph = Self::new(block_count);
        let mut folded = 0usize;
        for edge in raw {
            if edge.cause == EdgeCause::Equal {
                folded += 1;
                continue;
            }
            graph.add_edge(edge.from, edge.to, edge.cause);
        }
        debug!(
            blocks = block_count,
            edges = graph.edge_count(),
            equal_edges_folded = folded,
            "dependency graph built"
        );
        graph
    }

    /// Adds an edge, ignoring self-edges and duplicate causes.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId, cause: EdgeCause) {
        if from == to {
            return;
        }
        let causes = self.edges.entry((from, to)).or_default();
        if !causes.contains(&cause) {
            causes.push(cause);
        }
    }

    /// The causes recorded for `from -> to`, empty if there is no edge.
    pub fn causes(&self, from: BlockId, to: BlockId) -> &[EdgeCause] {
        self.edges
            .get(&(from, to))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates over edges in `(from, to)` order.
    pub fn edges(&self) -> impl Iterator<Item = (BlockId, BlockId)> + '_ {
        self.edges.keys().copied()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of nodes.
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Successor lists indexed by block.
    pub fn successors(&self) -> Vec<Vec<BlockId>> {
        let mut succ = vec![Vec::new(); self.block_count];
        for (from, to) in self.edges() {
            succ[from.index()].push(to);
        }
        succ
    }

    /// Replaces every edge between two members of `members` with `edges`.
    ///
    /// Edges entering or leaving the set are kept.
    pub fn replace_internal(&mut self, members: &[BlockId], edges: &[RawEdge]) {
        let inside = |b: &BlockId| members.binary_search(b).is_ok();
        self.edges
            .retain(|(from, to), _| !(inside(from) && inside(to)));
        for edge in edges {
            if inside(&edge.from) && inside(&edge.to) {
                self.add_edge(edge.from, edge.to, edge.cause);
            }
        }
    }

    /// Converts to a petgraph graph whose node `i` is block `i`.
    pub fn to_petgraph(&self) -> DiGraph<BlockId, ()> {
        let mut graph = DiGraph::with_capacity(self.block_count, self.edges.len());
        for i in 0..self.block_count {
            graph.add_node(BlockId::from_raw(i as u32));
        }
        for (from, to) in self.edges() {
            graph.add_edge(NodeIndex::new(from.index()), NodeIndex::new(to.index()), ());
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::VarId;

    fn b(i: u32) -> BlockId {
        BlockId::from_raw(i)
    }

    fn data(v: u32) -> EdgeCause {
        EdgeCause::Data {
            written: VarId::from_raw(v),
            read: VarId::from_raw(v),
        }
    }

    #[test]
    fn duplicates_merge_and_keep_causes() {
        let raw = [
            RawEdge { from: b(0), to: b(1), cause: data(0) },
            RawEdge { from: b(0), to: b(1), cause: data(0) },
            RawEdge { from: b(0), to: b(1), cause: EdgeCause::Before },
        ];
        let graph = DepGraph::build(2, &raw);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.causes(b(0), b(1)), &[data(0), EdgeCause::Before]);
    }

    #[test]
    fn self_and_equal_edges_dropped() {
        let raw = [
            RawEdge { from: b(0), to: b(0), cause: data(0) },
            RawEdge { from: b(0), to: b(1), cause: EdgeCause::Equal },
            RawEdge { from: b(1), to: b(0), cause: EdgeCause::Equal },
        ];
        let graph = DepGraph::build(2, &raw);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn replace_internal_keeps_boundary_edges() {
        let raw = [
            RawEdge { from: b(0), to: b(1), cause: data(0) },
            RawEdge { from: b(1), to: b(2), cause: data(1) },
            RawEdge { from: b(2), to: b(1), cause: data(2) },
        ];
        let mut graph = DepGraph::build(3, &raw);
        graph.replace_internal(
            &[b(1), b(2)],
            &[RawEdge { from: b(1), to: b(2), cause: data(1) }],
        );
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges, vec![(b(0), b(1)), (b(1), b(2))]);
    }

    #[test]
    fn petgraph_nodes_match_ids() {
        let raw = [RawEdge { from: b(2), to: b(0), cause: data(0) }];
        let graph = DepGraph::build(3, &raw).to_petgraph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph[NodeIndex::new(2)], b(2));
        assert!(graph.contains_edge(NodeIndex::new(2), NodeIndex::new(0)));
    }

    #[test]
    fn successors_in_id_order() {
        let raw = [
            RawEdge { from: b(0), to: b(2), cause: data(0) },
            RawEdge { from: b(0), to: b(1), cause: data(0) },
        ];
        let succ = DepGraph::build(3, &raw).successors();
        assert_eq!(succ[0], vec![b(1), b(2)]);
        assert!(succ[2].is_empty());
    }
}
