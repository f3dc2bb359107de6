//! The tick driver: a compiled execution order bound to live state.
//!
//! A [`Schedule`] owns everything it needs to run: the blocks, the storage,
//! and the order. [`Schedule::tick`] executes every block exactly once in
//! that order and then advances the cycle counter. Sequential writes are
//! staged and committed according to the configured [`CommitPolicy`], which
//! applies to every sequential block alike.

use tempo_common::{ContentHash, Interner};
use tempo_config::{CommitPolicy, SimConfig};
use tracing::trace;

use crate::arena::Arena;
use crate::block::{BlockCtx, BlockKind, UpdateBlock};
use crate::ids::{BlockId, VarId};
use crate::pipeline::CompiledOrder;
use crate::state::{SimState, StagedWrite};
use crate::var::VarTable;

/// Outcome of [`Schedule::run_until`]-style runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimResult {
    /// Cycles executed by the run.
    pub cycles: u64,
    /// Whether the stop condition was met before the cycle budget ran out.
    pub finished: bool,
    /// Fingerprint of the order that was executed.
    pub fingerprint: ContentHash,
}

/// A compiled, runnable per-cycle schedule.
pub struct Schedule {
    order: Vec<BlockId>,
    fingerprint: ContentHash,
    blocks: Arena<BlockId, UpdateBlock>,
    state: SimState,
    staged: Vec<StagedWrite>,
    vars: VarTable,
    interner: Interner,
    config: SimConfig,
    cycle: u64,
}

impl Schedule {
    pub(crate) fn new(
        compiled: CompiledOrder,
        blocks: Arena<BlockId, UpdateBlock>,
        vars: VarTable,
        interner: Interner,
        config: SimConfig,
    ) -> Self {
        Self {
            order: compiled.order,
            fingerprint: compiled.fingerprint,
            blocks,
            state: compiled.initial,
            staged: Vec::new(),
            vars,
            interner,
            config,
            cycle: 0,
        }
    }

    /// Executes one cycle and advances the cycle counter.
    pub fn tick(&mut self) {
        for &id in &self.order {
            let block = &mut self.blocks[id];
            let mut ctx = BlockCtx::new(&mut self.state, block.kind, &mut self.staged);
            block.execute(&mut ctx);
            if block.kind == BlockKind::Sequential && self.config.commit == CommitPolicy::PerBlock
            {
                self.state.commit(&self.staged);
                self.staged.clear();
            }
        }
        if !self.staged.is_empty() {
            self.state.commit(&self.staged);
            self.staged.clear();
        }
        self.cycle += 1;
        trace!(cycle = self.cycle, blocks = self.order.len(), "tick");
    }

    /// Runs only the combinational blocks, in schedule order, without
    /// advancing the cycle counter.
    ///
    /// Used to settle combinational outputs after poking inputs.
    pub fn eval_combinational(&mut self) {
        let mut discard = Vec::new();
        for &id in &self.order {
            let block = &mut self.blocks[id];
            if block.kind == BlockKind::Combinational {
                let mut ctx = BlockCtx::new(&mut self.state, block.kind, &mut discard);
                block.execute(&mut ctx);
            }
        }
    }

    /// Number of blocks executed per cycle.
    pub fn block_count(&self) -> usize {
        self.order.len()
    }

    /// Number of completed cycles.
    pub fn cycle_count(&self) -> u64 {
        self.cycle
    }

    /// The execution order.
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    /// XXH3 fingerprint of the execution order.
    pub fn fingerprint(&self) -> ContentHash {
        self.fingerprint
    }

    /// Declared name of a block.
    pub fn block_name(&self, id: BlockId) -> &str {
        self.interner.resolve(self.blocks[id].name)
    }

    /// Looks up the first variable declared at `path`.
    pub fn var(&self, path: &str) -> Option<VarId> {
        let ident = self.interner.get(path)?;
        self.vars.iter().find(|v| v.path == ident).map(|v| v.id)
    }

    /// Current value of a variable.
    pub fn peek(&self, var: VarId) -> u64 {
        self.state.read(var)
    }

    /// Overwrites a variable, as a test harness driving an input would.
    pub fn poke(&mut self, var: VarId, value: u64) {
        self.state.write(var, value);
    }

    /// Holds `reset` high for the configured number of cycles, then low.
    pub fn sim_reset(&mut self, reset: VarId) {
        self.poke(reset, 1);
        for _ in 0..self.config.reset_cycles {
            self.tick();
        }
        self.poke(reset, 0);
        self.eval_combinational();
    }

    /// Ticks until `done` returns `true` or the cycle budget is spent.
    ///
    /// `done` is checked before every cycle. Returns the number of cycles
    /// executed by this call.
    pub fn run_until(&mut self, mut done: impl FnMut(&Schedule) -> bool) -> u64 {
        let start = self.cycle;
        while !done(self) && self.cycle - start < self.config.max_cycles {
            self.tick();
        }
        self.cycle - start
    }

    /// Formats `path value` pairs separated by ` | `.
    pub fn line_trace(&self, vars: &[VarId]) -> String {
        vars.iter()
            .map(|&v| {
                format!(
                    "{} {}",
                    self.interner.resolve(self.vars.get(v).path),
                    self.peek(v)
                )
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl std::fmt::Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field("order", &self.order)
            .field("fingerprint", &self.fingerprint)
            .field("cycle", &self.cycle)
            .field("commit", &self.config.commit)
            .finish_non_exhaustive()
    }
}
