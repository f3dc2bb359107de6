//! Dependency-graph scheduler and tick driver for the Tempo cycle simulator.
//!
//! This crate takes an elaborated design, expressed as update blocks that
//! read and write named variables plus explicit ordering constraints, and
//! compiles it into a deterministic per-cycle execution order.
//!
//! # Architecture
//!
//! The build runs once, synchronously, and either yields a [`Schedule`] or
//! fails with a [`ScheduleError`]:
//!
//! 1. **Collect** raw edges from declared accesses and constraints.
//! 2. **Build** the storage layout and containment closure, then the
//!    deduplicated block graph.
//! 3. **Analyze** it for strongly connected components.
//! 4. **Disambiguate** each candidate cycle by traced execution.
//! 5. **Sort** topologically, lowest block ID first among ready blocks.
//! 6. **Drive** the order once per [`Schedule::tick`].
//!
//! # Usage
//!
//! ```
//! use tempo_config::SchedConfig;
//! use tempo_diagnostics::DiagnosticSink;
//! use tempo_sched::{build_schedule, BlockSpec, Design};
//!
//! let mut design = Design::new();
//! let count = design.declare("top.count", 8);
//! let next = design.declare("top.next", 8);
//! design.add_block(
//!     BlockSpec::combinational("incr", move |ctx| {
//!         let v = ctx.read(count);
//!         ctx.write(next, v + 1);
//!     })
//!     .reads([count])
//!     .writes([next]),
//! );
//! design.add_block(
//!     BlockSpec::sequential("reg", move |ctx| {
//!         let v = ctx.read(next);
//!         ctx.write(count, v);
//!     })
//!     .reads([next])
//!     .writes([count]),
//! );
//!
//! let sink = DiagnosticSink::new();
//! let mut schedule = build_schedule(design, &SchedConfig::default(), &sink)?;
//! for _ in 0..3 {
//!     schedule.tick();
//! }
//! assert_eq!(schedule.peek(count), 3);
//! assert_eq!(schedule.cycle_count(), 3);
//! # Ok::<(), tempo_sched::ScheduleError>(())
//! ```
//!
//! # Modules
//!
//! - `design`: the build context blocks and variables are registered in
//! - `var`, `alias`: the variable namespace and its storage layout
//! - `block`, `constraint`: update blocks and explicit ordering
//! - `collect`, `graph`, `cycles`, `disambiguate`, `toposort`: pipeline stages
//! - `schedule`: the tick driver

#![warn(missing_docs)]

pub mod alias;
pub mod arena;
pub mod block;
pub mod collect;
pub mod constraint;
pub mod cycles;
pub mod design;
pub mod disambiguate;
pub mod error;
pub mod graph;
pub mod ids;
pub mod pipeline;
pub mod schedule;
pub mod state;
pub mod toposort;
pub mod var;

use tempo_config::SchedConfig;
use tempo_diagnostics::DiagnosticSink;

pub use block::{AccessTrace, BlockCtx, BlockKind, BlockSpec, UpdateBlock};
pub use constraint::{Constraint, ConstraintKind, Target};
pub use design::{Design, Method};
pub use error::{BlockRef, LoopCause, LoopEdge, ScheduleError};
pub use ids::{BlockId, MethodId, SlotId, VarId};
pub use pipeline::CompiledOrder;
pub use schedule::{Schedule, SimResult};
pub use var::{TypeTag, VarKind, Variable};

/// Compiles `design` into a runnable [`Schedule`].
///
/// Warnings and notes (self-dependencies, vacuous constraints, resolved
/// false cycles) go to `sink`; any fatal problem is returned as an error
/// and no schedule is produced.
pub fn build_schedule(
    mut design: Design,
    config: &SchedConfig,
    sink: &DiagnosticSink,
) -> Result<Schedule, ScheduleError> {
    let compiled = design.compile_order(config, sink)?;
    Ok(Schedule::new(
        compiled,
        design.blocks,
        design.vars,
        design.interner,
        config.sim.clone(),
    ))
}

/// High-level entry point: builds a schedule and ticks it until `done`.
///
/// The design is reset through `reset` first when one is given. `done` is
/// checked before every cycle; the run stops at the configured cycle budget
/// if it never returns `true`.
pub fn simulate(
    design: Design,
    config: &SchedConfig,
    sink: &DiagnosticSink,
    reset: Option<VarId>,
    done: impl FnMut(&Schedule) -> bool,
) -> Result<SimResult, ScheduleError> {
    let mut schedule = build_schedule(design, config, sink)?;
    if let Some(reset) = reset {
        schedule.sim_reset(reset);
    }
    let mut done = done;
    let cycles = schedule.run_until(&mut done);
    Ok(SimResult {
        cycles,
        finished: done(&schedule),
        fingerprint: schedule.fingerprint(),
    })
}
