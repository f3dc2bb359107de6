//! Cycle analysis: candidate cycles, constraint conflicts, minimal cycles.

use std::collections::{BTreeMap, VecDeque};

use petgraph::algo::kosaraju_scc;
use tracing::debug;

use crate::collect::{EdgeCause, RawEdge};
use crate::error::{BlockRef, ScheduleError};
use crate::graph::DepGraph;
use crate::ids::BlockId;

/// Finds every strongly connected component with two or more blocks.
///
/// Members of each component are sorted by ID and components are sorted by
/// their first member, so the result is a function of the edge set alone.
pub fn candidate_cycles(graph: &DepGraph) -> Vec<Vec<BlockId>> {
    let pg = graph.to_petgraph();
    let mut sccs: Vec<Vec<BlockId>> = kosaraju_scc(&pg)
        .into_iter()
        .filter(|scc| scc.len() >= 2)
        .map(|scc| {
            let mut members: Vec<BlockId> = scc.into_iter().map(|n| pg[n]).collect();
            members.sort_unstable();
            members
        })
        .collect();
    sccs.sort_unstable_by_key(|members| members[0]);
    debug!(candidates = sccs.len(), "strongly connected components found");
    sccs
}

/// Rejects explicit `before` constraints that cannot all hold.
///
/// Only constraint edges are considered: a contradiction among them can
/// never be resolved by tracing, unlike a data cycle.
pub fn check_constraints(edges: &[RawEdge], names: &[BlockRef]) -> Result<(), ScheduleError> {
    let before: Vec<RawEdge> = edges
        .iter()
        .copied()
        .filter(|e| e.cause == EdgeCause::Before)
        .collect();

    if let Some(edge) = before.iter().find(|e| e.from == e.to) {
        let block = names[edge.from.index()].clone();
        return Err(ScheduleError::ConflictingConstraint {
            constraints: vec![format!("{block} < {block}")],
            blocks: vec![block],
        });
    }

    let graph = DepGraph::build(names.len(), &before);
    if let Some(members) = candidate_cycles(&graph).into_iter().next() {
        let constraints = graph
            .edges()
            .filter(|(from, to)| {
                members.binary_search(from).is_ok() && members.binary_search(to).is_ok()
            })
            .map(|(from, to)| format!("{} < {}", names[from.index()], names[to.index()]))
            .collect();
        return Err(ScheduleError::ConflictingConstraint {
            blocks: members.iter().map(|b| names[b.index()].clone()).collect(),
            constraints,
        });
    }
    Ok(())
}

/// Finds a shortest cycle through the given edges, restricted to `members`.
///
/// Starts are tried in ID order and the first shortest cycle wins. The
/// result lists the cycle's blocks; the closing edge runs from the last
/// block back to the first. Returns `None` if the edges are acyclic.
pub fn shortest_cycle(members: &[BlockId], graph: &DepGraph) -> Option<Vec<BlockId>> {
    let mut succ: BTreeMap<BlockId, Vec<BlockId>> = BTreeMap::new();
    for (from, to) in graph.edges() {
        if members.binary_search(&from).is_ok() && members.binary_search(&to).is_ok() {
            succ.entry(from).or_default().push(to);
        }
    }

    let mut best: Option<Vec<BlockId>> = None;
    for &start in members {
        let Some(cycle) = bfs_back_to(start, &succ) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| cycle.len() < b.len()) {
            best = Some(cycle);
        }
    }
    best
}

/// Breadth-first search from `start` for the shortest path back to it.
fn bfs_back_to(start: BlockId, succ: &BTreeMap<BlockId, Vec<BlockId>>) -> Option<Vec<BlockId>> {
    let mut parent: BTreeMap<BlockId, BlockId> = BTreeMap::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for &next in succ.get(&node).map(Vec::as_slice).unwrap_or_default() {
            if next == start {
                let mut path = vec![node];
                let mut cursor = node;
                while cursor != start {
                    cursor = parent[&cursor];
                    path.push(cursor);
                }
                path.reverse();
                return Some(path);
            }
            if !parent.contains_key(&next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::VarId;

    fn b(i: u32) -> BlockId {
        BlockId::from_raw(i)
    }

    fn names(n: u32) -> Vec<BlockRef> {
        (0..n)
            .map(|i| BlockRef {
                id: b(i),
                name: format!("up{i}"),
            })
            .collect()
    }

    fn data(from: u32, to: u32) -> RawEdge {
        RawEdge {
            from: b(from),
            to: b(to),
            cause: EdgeCause::Data {
                written: VarId::from_raw(0),
                read: VarId::from_raw(0),
            },
        }
    }

    fn before(from: u32, to: u32) -> RawEdge {
        RawEdge {
            from: b(from),
            to: b(to),
            cause: EdgeCause::Before,
        }
    }

    #[test]
    fn sccs_sorted_and_trivial_ones_skipped() {
        let graph = DepGraph::build(
            6,
            &[data(4, 3), data(3, 4), data(2, 1), data(1, 2), data(0, 5)],
        );
        assert_eq!(candidate_cycles(&graph), vec![vec![b(1), b(2)], vec![b(3), b(4)]]);
    }

    #[test]
    fn acyclic_graph_has_no_candidates() {
        let graph = DepGraph::build(3, &[data(0, 1), data(1, 2), data(0, 2)]);
        assert!(candidate_cycles(&graph).is_empty());
    }

    #[test]
    fn contradicting_before_constraints() {
        let err = check_constraints(&[before(0, 1), before(1, 0)], &names(2)).unwrap_err();
        match err {
            ScheduleError::ConflictingConstraint {
                blocks,
                constraints,
            } => {
                assert_eq!(blocks.len(), 2);
                assert_eq!(constraints.len(), 2);
                assert_eq!(constraints[0], "`up0` (#0) < `up1` (#1)");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn self_before_conflicts() {
        assert!(matches!(
            check_constraints(&[before(1, 1)], &names(2)),
            Err(ScheduleError::ConflictingConstraint { .. })
        ));
    }

    #[test]
    fn data_cycles_are_not_constraint_conflicts() {
        assert!(check_constraints(&[data(0, 1), data(1, 0), before(0, 1)], &names(2)).is_ok());
    }

    #[test]
    fn shortest_cycle_prefers_fewest_blocks() {
        // 0 -> 1 -> 2 -> 0 and 1 <-> 2
        let graph = DepGraph::build(3, &[data(0, 1), data(1, 2), data(2, 0), data(2, 1)]);
        let cycle = shortest_cycle(&[b(0), b(1), b(2)], &graph).unwrap();
        assert_eq!(cycle, vec![b(1), b(2)]);
    }

    #[test]
    fn shortest_cycle_none_when_acyclic() {
        let graph = DepGraph::build(2, &[data(0, 1)]);
        assert!(shortest_cycle(&[b(0), b(1)], &graph).is_none());
    }
}
