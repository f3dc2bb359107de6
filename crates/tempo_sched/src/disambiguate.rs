//! Dynamic disambiguation of candidate cycles.
//!
//! Declared read and write sets over-approximate what a block does: a read
//! inside a branch that is never taken still shows up as a dependency. For
//! each candidate cycle the blocks are executed under tracing against a
//! snapshot of the initial state, and the dependency edges are recomputed
//! from the accesses actually observed. If the observed edges are acyclic
//! the cycle was false and the observed edges replace the declared ones.

use tempo_common::{InternalError, Interner};
use tempo_config::{CommitPolicy, ScheduleConfig};
use tracing::debug;

use crate::alias::StorageLayout;
use crate::arena::Arena;
use crate::block::{AccessTrace, BlockCtx, BlockKind, UpdateBlock};
use crate::collect::{access_edges, Access, EdgeCause, RawEdge};
use crate::cycles::{candidate_cycles, shortest_cycle};
use crate::error::{BlockRef, LoopCause, LoopEdge, ScheduleError};
use crate::graph::DepGraph;
use crate::ids::{BlockId, VarId};
use crate::state::SimState;
use crate::var::VarTable;

/// A candidate cycle shown to be false.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// The blocks of the candidate cycle, sorted by ID.
    pub members: Vec<BlockId>,
    /// Index of the accepted trial.
    pub trial: usize,
    /// Execution order of the accepted trial.
    pub order: Vec<BlockId>,
    /// Edges observed in the accepted trial, including explicit constraints
    /// among the members.
    pub edges: Vec<RawEdge>,
}

/// Everything a trial needs besides the blocks themselves.
pub struct TrialContext<'a> {
    /// Storage layout for computing conflicts.
    pub layout: &'a StorageLayout,
    /// State every trial starts from.
    pub initial: &'a SimState,
    /// Explicit `before` edges, kept in every trial.
    pub constraint_edges: &'a [RawEdge],
    /// Commit policy of the schedule being built.
    pub commit: CommitPolicy,
    /// Trial budget.
    pub schedule: &'a ScheduleConfig,
    /// Block names for error reports.
    pub names: &'a [BlockRef],
    /// Variables, for error reports.
    pub vars: &'a VarTable,
    /// Interner, for error reports.
    pub interner: &'a Interner,
}

/// Trial `k` runs the members in ID order rotated left by `k`.
pub fn trial_order(members: &[BlockId], k: usize) -> Vec<BlockId> {
    let mut order = members.to_vec();
    if !order.is_empty() {
        order.rotate_left(k % members.len());
    }
    order
}

/// Resolves one candidate cycle or reports it as a combinational loop.
pub fn disambiguate(
    members: &[BlockId],
    blocks: &mut Arena<BlockId, UpdateBlock>,
    cx: &TrialContext<'_>,
) -> Result<Resolution, ScheduleError> {
    let trials = cx.schedule.trials_for(members.len()).max(1);
    let mut first_observed: Option<DepGraph> = None;

    for k in 0..trials {
        let order = trial_order(members, k);
        let edges = run_trial(&order, members, blocks, cx);
        let graph = DepGraph::build(cx.names.len(), &edges);
        let acyclic = candidate_cycles(&graph).is_empty();
        debug!(
            trial = k,
            blocks = members.len(),
            observed_edges = graph.edge_count(),
            acyclic,
            "traced trial order"
        );
        if acyclic {
            return Ok(Resolution {
                members: members.to_vec(),
                trial: k,
                order,
                edges,
            });
        }
        if first_observed.is_none() {
            first_observed = Some(graph);
        }
    }

    let graph = first_observed
        .ok_or_else(|| InternalError::new("no trial was run for a candidate cycle"))?;
    Err(loop_error(members, &graph, cx)?)
}

/// Executes one trial order and returns the observed edges among `members`.
fn run_trial(
    order: &[BlockId],
    members: &[BlockId],
    blocks: &mut Arena<BlockId, UpdateBlock>,
    cx: &TrialContext<'_>,
) -> Vec<RawEdge> {
    let mut state = cx.initial.clone();
    let mut traces: Vec<(BlockId, BlockKind, AccessTrace)> = Vec::with_capacity(order.len());
    for &id in order {
        let block = &mut blocks[id];
        let kind = block.kind;
        let mut trace = AccessTrace::default();
        let mut staged = Vec::new();
        let mut ctx = BlockCtx::traced(&mut state, kind, &mut staged, &mut trace);
        block.execute(&mut ctx);
        if cx.commit == CommitPolicy::PerBlock {
            state.commit(&staged);
        }
        traces.push((id, kind, trace.finish()));
    }
    traces.sort_unstable_by_key(|(id, _, _)| *id);

    let accesses: Vec<Access<'_>> = traces
        .iter()
        .map(|(block, kind, trace)| Access {
            block: *block,
            kind: *kind,
            reads: &trace.reads,
            writes: &trace.writes,
        })
        .collect();
    let (mut edges, _) = access_edges(&accesses, cx.layout, cx.commit);
    let inside = |b: BlockId| members.binary_search(&b).is_ok();
    edges.extend(
        cx.constraint_edges
            .iter()
            .filter(|e| inside(e.from) && inside(e.to)),
    );
    edges
}

fn loop_error(
    members: &[BlockId],
    graph: &DepGraph,
    cx: &TrialContext<'_>,
) -> Result<ScheduleError, InternalError> {
    let cycle = shortest_cycle(members, graph)
        .ok_or_else(|| InternalError::new("cyclic trial has no cycle through its members"))?;
    let path = |v: VarId| cx.interner.resolve(cx.vars.get(v).path).to_string();

    let mut edges = Vec::with_capacity(cycle.len());
    for (i, &from) in cycle.iter().enumerate() {
        let to = cycle[(i + 1) % cycle.len()];
        let cause = match graph.causes(from, to).first() {
            Some(EdgeCause::Data { written, read }) => LoopCause::Data {
                written: path(*written),
                read: path(*read),
            },
            Some(EdgeCause::StateRead { read, written }) => LoopCause::StateRead {
                read: path(*read),
                written: path(*written),
            },
            Some(EdgeCause::Before | EdgeCause::Equal) => LoopCause::Constraint,
            None => {
                return Err(InternalError::new(format!(
                    "reported cycle uses missing edge {from} -> {to}"
                )))
            }
        };
        edges.push(LoopEdge {
            from: cx.names[from.index()].clone(),
            to: cx.names[to.index()].clone(),
            cause,
        });
    }

    Ok(ScheduleError::CombinationalLoop {
        blocks: cycle.iter().map(|b| cx.names[b.index()].clone()).collect(),
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotations_start_from_registration_order() {
        let members: Vec<_> = (0..3).map(BlockId::from_raw).collect();
        let raw = |k| -> Vec<u32> { trial_order(&members, k).iter().map(|b| b.as_raw()).collect() };
        assert_eq!(raw(0), vec![0, 1, 2]);
        assert_eq!(raw(1), vec![1, 2, 0]);
        assert_eq!(raw(2), vec![2, 0, 1]);
        assert_eq!(raw(3), vec![0, 1, 2]);
    }
}
