//! Dependency collection: raw edges from accesses and constraints.
//!
//! Data edges follow two rules. A combinational block that writes `w` runs
//! before every other block reading a variable that conflicts with `w`. A
//! sequential block that writes `w` runs *after* every block reading it, so
//! readers observe the value from before the clock edge. Self-dependencies
//! never become edges; combinational ones are reported separately.

use std::collections::HashMap;

use tempo_config::CommitPolicy;
use tracing::debug;

use crate::alias::StorageLayout;
use crate::block::BlockKind;
use crate::constraint::{ConstraintKind, Target};
use crate::design::Design;
use crate::ids::{BlockId, VarId};

/// Why an edge exists.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum EdgeCause {
    /// The source writes `written`; the target reads the conflicting `read`.
    Data {
        /// Variable written by the source block.
        written: VarId,
        /// Variable read by the target block.
        read: VarId,
    },
    /// The source reads `read` before the sequential target updates `written`.
    StateRead {
        /// Variable read by the source block.
        read: VarId,
        /// Variable written by the target block.
        written: VarId,
    },
    /// An explicit `before` constraint.
    Before,
    /// One half of an expanded `equal` constraint.
    Equal,
}

/// A directed dependency edge before deduplication.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RawEdge {
    /// Block that must run first.
    pub from: BlockId,
    /// Block that must run second.
    pub to: BlockId,
    /// Why.
    pub cause: EdgeCause,
}

/// The accesses of one block, declared or observed.
#[derive(Clone, Copy, Debug)]
pub struct Access<'a> {
    /// The accessing block.
    pub block: BlockId,
    /// Its kind.
    pub kind: BlockKind,
    /// Variables read.
    pub reads: &'a [VarId],
    /// Variables written.
    pub writes: &'a [VarId],
}

/// Everything the collector found.
#[derive(Clone, Debug, Default)]
pub struct Collected {
    /// Raw edges, possibly with duplicates.
    pub edges: Vec<RawEdge>,
    /// Combinational blocks that read storage they write, with one
    /// offending variable each.
    pub self_dependencies: Vec<(BlockId, VarId)>,
    /// Indices of constraints naming a method with no bound block.
    pub vacuous: Vec<usize>,
}

/// Computes data edges from a set of accesses.
///
/// `StateRead` edges from one sequential block to another only matter
/// when each block commits its own writes, so they are emitted only under
/// [`CommitPolicy::PerBlock`].
pub fn access_edges(
    accesses: &[Access<'_>],
    layout: &StorageLayout,
    commit: CommitPolicy,
) -> (Vec<RawEdge>, Vec<(BlockId, VarId)>) {
    let mut readers: HashMap<VarId, Vec<(BlockId, BlockKind)>> = HashMap::new();
    for access in accesses {
        for &var in access.reads {
            readers.entry(var).or_default().push((access.block, access.kind));
        }
    }

    let mut edges = Vec::new();
    let mut self_deps = Vec::new();
    for writer in accesses {
        for &written in writer.writes {
            for &read in layout.conflicts(written) {
                let Some(readers) = readers.get(&read) else {
                    continue;
                };
                for &(reader, reader_kind) in readers {
                    if reader == writer.block {
                        if writer.kind == BlockKind::Combinational {
                            self_deps.push((reader, read));
                        }
                        continue;
                    }
                    match writer.kind {
                        BlockKind::Combinational => edges.push(RawEdge {
                            from: writer.block,
                            to: reader,
                            cause: EdgeCause::Data { written, read },
                        }),
                        BlockKind::Sequential => {
                            if reader_kind == BlockKind::Combinational
                                || commit == CommitPolicy::PerBlock
                            {
                                edges.push(RawEdge {
                                    from: reader,
                                    to: writer.block,
                                    cause: EdgeCause::StateRead { read, written },
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    self_deps.sort_unstable();
    self_deps.dedup_by_key(|(block, _)| *block);
    (edges, self_deps)
}

/// Collects declared data edges and expanded constraint edges.
pub fn collect(design: &Design, layout: &StorageLayout, commit: CommitPolicy) -> Collected {
    let accesses: Vec<Access<'_>> = design
        .blocks
        .values()
        .map(|block| Access {
            block: block.id,
            kind: block.kind,
            reads: &block.reads,
            writes: &block.writes,
        })
        .collect();
    let (mut edges, self_dependencies) = access_edges(&accesses, layout, commit);
    let data_edges = edges.len();

    let groups = TargetGroups::new(design);
    let mut vacuous = Vec::new();
    for (index, constraint) in design.constraints.iter().enumerate() {
        let lhs = groups.expand(constraint.lhs);
        let rhs = groups.expand(constraint.rhs);
        if lhs.is_empty() || rhs.is_empty() {
            vacuous.push(index);
            continue;
        }
        match constraint.kind {
            ConstraintKind::Before if groups.same(constraint.lhs, constraint.rhs) => {
                // Something strictly before itself; kept as a self-edge so
                // the constraint check can report it.
                edges.push(RawEdge {
                    from: lhs[0],
                    to: lhs[0],
                    cause: EdgeCause::Before,
                });
            }
            ConstraintKind::Before => {
                for &from in lhs {
                    for &to in rhs.iter().filter(|&&to| to != from) {
                        edges.push(RawEdge {
                            from,
                            to,
                            cause: EdgeCause::Before,
                        });
                    }
                }
            }
            ConstraintKind::Equal => {
                for &a in lhs {
                    for &b in rhs.iter().filter(|&&b| b != a) {
                        edges.push(RawEdge {
                            from: a,
                            to: b,
                            cause: EdgeCause::Equal,
                        });
                        edges.push(RawEdge {
                            from: b,
                            to: a,
                            cause: EdgeCause::Equal,
                        });
                    }
                }
            }
        }
    }

    debug!(
        blocks = design.blocks.len(),
        data_edges,
        constraint_edges = edges.len() - data_edges,
        self_dependencies = self_dependencies.len(),
        "dependencies collected"
    );

    Collected {
        edges,
        self_dependencies,
        vacuous,
    }
}

/// Blocks and methods merged by `equal` constraints, with the blocks each
/// group stands for.
struct TargetGroups {
    block_count: usize,
    rep: Vec<usize>,
    members: HashMap<usize, Vec<BlockId>>,
}

impl TargetGroups {
    fn new(design: &Design) -> Self {
        let block_count = design.blocks.len();
        let index = |target: Target| match target {
            Target::Block(id) => id.index(),
            Target::Method(id) => block_count + id.index(),
        };

        let mut uf = UnionFind::new(block_count + design.methods.len());
        for constraint in &design.constraints {
            if constraint.kind == ConstraintKind::Equal {
                uf.union(index(constraint.lhs), index(constraint.rhs));
            }
        }
        let rep: Vec<usize> = (0..block_count + design.methods.len())
            .map(|i| uf.find(i))
            .collect();

        let mut members: HashMap<usize, Vec<BlockId>> = HashMap::new();
        for block in design.blocks.values() {
            members.entry(rep[block.id.index()]).or_default().push(block.id);
            for &method in &block.calls {
                members
                    .entry(rep[block_count + method.index()])
                    .or_default()
                    .push(block.id);
            }
        }
        for blocks in members.values_mut() {
            blocks.sort_unstable();
            blocks.dedup();
        }

        Self {
            block_count,
            rep,
            members,
        }
    }

    fn rep_of(&self, target: Target) -> usize {
        match target {
            Target::Block(id) => self.rep[id.index()],
            Target::Method(id) => self.rep[self.block_count + id.index()],
        }
    }

    fn same(&self, a: Target, b: Target) -> bool {
        self.rep_of(a) == self.rep_of(b)
    }

    fn expand(&self, target: Target) -> &[BlockId] {
        self.members
            .get(&self.rep_of(target))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Disjoint-set forest over dense indices with path halving.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merges two sets; the smaller representative wins so results don't
    /// depend on union order.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}
