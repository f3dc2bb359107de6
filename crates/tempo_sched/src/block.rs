//! Update blocks and the context they execute in.
//!
//! A block's body is an ordinary closure that accesses simulation state
//! only through a [`BlockCtx`]. That single access path is what lets the
//! scheduler trace the reads and writes a block actually performs, as
//! opposed to the ones it declares.

use std::fmt;

use tempo_common::Ident;

use crate::ids::{BlockId, MethodId, VarId};
use crate::state::{SimState, StagedWrite};

/// Whether a block models combinational logic or clocked state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BlockKind {
    /// Writes are visible to later blocks in the same cycle.
    Combinational,
    /// Writes are staged and become visible at the commit point.
    Sequential,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Combinational => write!(f, "combinational"),
            BlockKind::Sequential => write!(f, "sequential"),
        }
    }
}

/// The executable body of an update block.
pub type BlockFn = Box<dyn FnMut(&mut BlockCtx<'_>)>;

/// A registered update block.
pub struct UpdateBlock {
    /// Registration ID.
    pub id: BlockId,
    /// Declared name.
    pub name: Ident,
    /// Combinational or sequential.
    pub kind: BlockKind,
    /// Variables the block may read.
    pub reads: Vec<VarId>,
    /// Variables the block may write.
    pub writes: Vec<VarId>,
    /// Methods the block calls.
    pub calls: Vec<MethodId>,
    body: BlockFn,
}

impl UpdateBlock {
    /// Runs the block body once against `ctx`.
    pub fn execute(&mut self, ctx: &mut BlockCtx<'_>) {
        (self.body)(ctx);
    }
}

impl fmt::Debug for UpdateBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateBlock")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

/// Builder for registering an update block with
/// [`Design::add_block`](crate::Design::add_block).
///
/// ```
/// use tempo_sched::{BlockSpec, Design};
///
/// let mut design = Design::new();
/// let a = design.declare("top.a", 8);
/// let b = design.declare("top.b", 8);
/// design.add_block(
///     BlockSpec::combinational("inc", move |ctx| {
///         let v = ctx.read(a);
///         ctx.write(b, v + 1);
///     })
///     .reads([a])
///     .writes([b]),
/// );
/// ```
pub struct BlockSpec {
    pub(crate) name: String,
    pub(crate) kind: BlockKind,
    pub(crate) reads: Vec<VarId>,
    pub(crate) writes: Vec<VarId>,
    pub(crate) calls: Vec<MethodId>,
    pub(crate) body: BlockFn,
}

impl BlockSpec {
    /// Starts a block of the given kind.
    pub fn new(
        name: impl Into<String>,
        kind: BlockKind,
        body: impl FnMut(&mut BlockCtx<'_>) + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            reads: Vec::new(),
            writes: Vec::new(),
            calls: Vec::new(),
            body: Box::new(body),
        }
    }

    /// Starts a combinational block.
    pub fn combinational(
        name: impl Into<String>,
        body: impl FnMut(&mut BlockCtx<'_>) + 'static,
    ) -> Self {
        Self::new(name, BlockKind::Combinational, body)
    }

    /// Starts a sequential block.
    pub fn sequential(
        name: impl Into<String>,
        body: impl FnMut(&mut BlockCtx<'_>) + 'static,
    ) -> Self {
        Self::new(name, BlockKind::Sequential, body)
    }

    /// Declares variables the block may read.
    pub fn reads(mut self, vars: impl IntoIterator<Item = VarId>) -> Self {
        self.reads.extend(vars);
        self
    }

    /// Declares variables the block may write.
    pub fn writes(mut self, vars: impl IntoIterator<Item = VarId>) -> Self {
        self.writes.extend(vars);
        self
    }

    /// Declares methods the block calls.
    pub fn calls(mut self, methods: impl IntoIterator<Item = MethodId>) -> Self {
        self.calls.extend(methods);
        self
    }

    pub(crate) fn into_block(self, id: BlockId, name: Ident) -> UpdateBlock {
        let mut reads = self.reads;
        let mut writes = self.writes;
        let mut calls = self.calls;
        reads.sort_unstable();
        reads.dedup();
        writes.sort_unstable();
        writes.dedup();
        calls.sort_unstable();
        calls.dedup();
        UpdateBlock {
            id,
            name,
            kind: self.kind,
            reads,
            writes,
            calls,
            body: self.body,
        }
    }
}

/// The variables one execution of a block actually touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessTrace {
    /// Variables read, sorted and deduplicated once finished.
    pub reads: Vec<VarId>,
    /// Variables written, sorted and deduplicated once finished.
    pub writes: Vec<VarId>,
}

impl AccessTrace {
    /// Sorts and deduplicates both sets.
    pub fn finish(mut self) -> Self {
        self.reads.sort_unstable();
        self.reads.dedup();
        self.writes.sort_unstable();
        self.writes.dedup();
        self
    }
}

/// A block's view of simulation state for one execution.
pub struct BlockCtx<'a> {
    state: &'a mut SimState,
    kind: BlockKind,
    staged: &'a mut Vec<StagedWrite>,
    trace: Option<&'a mut AccessTrace>,
}

impl<'a> BlockCtx<'a> {
    /// Creates a context for running a block of `kind`.
    ///
    /// Sequential writes are pushed to `staged` instead of `state`.
    pub fn new(
        state: &'a mut SimState,
        kind: BlockKind,
        staged: &'a mut Vec<StagedWrite>,
    ) -> Self {
        Self {
            state,
            kind,
            staged,
            trace: None,
        }
    }

    /// Creates a context that also records every access into `trace`.
    pub fn traced(
        state: &'a mut SimState,
        kind: BlockKind,
        staged: &'a mut Vec<StagedWrite>,
        trace: &'a mut AccessTrace,
    ) -> Self {
        Self {
            state,
            kind,
            staged,
            trace: Some(trace),
        }
    }

    /// Kind of the executing block.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Reads the current value of a variable.
    ///
    /// Sequential blocks see the value from before this cycle's staged
    /// writes are committed.
    pub fn read(&mut self, var: VarId) -> u64 {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.reads.push(var);
        }
        self.state.read(var)
    }

    /// Writes a variable, truncating `value` to its width.
    pub fn write(&mut self, var: VarId, value: u64) {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.writes.push(var);
        }
        match self.kind {
            BlockKind::Combinational => self.state.write(var, value),
            BlockKind::Sequential => self.staged.push(StagedWrite { var, value }),
        }
    }
}
