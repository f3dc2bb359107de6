//! The one-shot schedule build: collect, build, analyze, disambiguate, sort.

use tempo_common::{ContentHash, ContentHasher};
use tempo_config::{SchedConfig, SelfLoopPolicy};
use tempo_diagnostics::{Diagnostic, DiagnosticSink, Label};
use tracing::{debug, info, warn};

use crate::alias::StorageLayout;
use crate::collect::{collect, EdgeCause, RawEdge};
use crate::constraint::Target;
use crate::cycles::{candidate_cycles, check_constraints};
use crate::design::Design;
use crate::disambiguate::{disambiguate, Resolution, TrialContext};
use crate::error::{codes, BlockRef, ScheduleError};
use crate::graph::DepGraph;
use crate::ids::{BlockId, VarId};
use crate::state::SimState;
use crate::toposort::linearize;

/// The result of a successful build, before it is bound to a driver.
#[derive(Clone, Debug)]
pub struct CompiledOrder {
    /// Execution order, one entry per block.
    pub order: Vec<BlockId>,
    /// XXH3 over the order's block IDs.
    pub fingerprint: ContentHash,
    /// The resolved dependency graph the order was sorted from.
    pub graph: DepGraph,
    /// Candidate cycles that turned out to be false.
    pub resolved: Vec<Resolution>,
    /// Initial simulation state.
    pub initial: SimState,
}

/// Hashes an execution order.
pub fn fingerprint(order: &[BlockId]) -> ContentHash {
    let mut hasher = ContentHasher::new();
    for id in order {
        hasher.update_u32(id.as_raw());
    }
    hasher.finish()
}

/// Runs every pipeline stage over `design`.
pub(crate) fn compile(
    design: &mut Design,
    config: &SchedConfig,
    sink: &DiagnosticSink,
) -> Result<CompiledOrder, ScheduleError> {
    design.validate_references()?;
    let layout = StorageLayout::build(&design.vars, &design.interner)?;
    let initial = SimState::new(&layout, &design.vars);
    let names: Vec<BlockRef> = design
        .blocks
        .values()
        .map(|b| BlockRef {
            id: b.id,
            name: design.interner.resolve(b.name).to_string(),
        })
        .collect();

    let collected = collect(design, &layout, config.sim.commit);
    report_self_dependencies(design, &collected.self_dependencies, &names, config, sink);
    report_vacuous(design, &collected.vacuous, sink);
    check_constraints(&collected.edges, &names)?;

    let mut graph = DepGraph::build(names.len(), &collected.edges);
    let candidates = candidate_cycles(&graph);

    let constraint_edges: Vec<RawEdge> = collected
        .edges
        .iter()
        .copied()
        .filter(|e| e.cause == EdgeCause::Before)
        .collect();
    let cx = TrialContext {
        layout: &layout,
        initial: &initial,
        constraint_edges: &constraint_edges,
        commit: config.sim.commit,
        schedule: &config.schedule,
        names: &names,
        vars: &design.vars,
        interner: &design.interner,
    };
    let mut resolved = Vec::with_capacity(candidates.len());
    for members in &candidates {
        let resolution = disambiguate(members, &mut design.blocks, &cx)?;
        graph.replace_internal(members, &resolution.edges);
        sink.emit(false_cycle_note(&resolution, &names));
        debug!(
            blocks = members.len(),
            trial = resolution.trial,
            "false cycle resolved"
        );
        resolved.push(resolution);
    }

    let order = linearize(&graph)?;
    let fingerprint = fingerprint(&order);
    info!(
        blocks = order.len(),
        edges = graph.edge_count(),
        false_cycles = resolved.len(),
        %fingerprint,
        "schedule built"
    );

    Ok(CompiledOrder {
        order,
        fingerprint,
        graph,
        resolved,
        initial,
    })
}

fn report_self_dependencies(
    design: &Design,
    found: &[(BlockId, VarId)],
    names: &[BlockRef],
    config: &SchedConfig,
    sink: &DiagnosticSink,
) {
    if config.schedule.self_loop == SelfLoopPolicy::Allow {
        return;
    }
    for &(block, var) in found {
        let name = &names[block.index()];
        let path = design.path(var);
        warn!(block = %name, var = path, "combinational block reads its own output");
        sink.emit(
            Diagnostic::warning(
                codes::SELF_DEPENDENCY,
                format!("combinational block {name} reads `{path}`, which it also writes"),
            )
            .with_label(Label::primary(format!("block {name}"), "reads and writes here"))
            .with_note("the self-edge is dropped; the block sees its own earlier writes"),
        );
    }
}

fn report_vacuous(design: &Design, vacuous: &[usize], sink: &DiagnosticSink) {
    for &index in vacuous {
        let constraint = design.constraints[index];
        let unbound: Vec<String> = constraint
            .targets()
            .into_iter()
            .filter_map(|t| match t {
                Target::Method(m) => Some(format!("`{}`", design.method_name(m))),
                Target::Block(_) => None,
            })
            .collect();
        let subject = unbound.join(", ");
        warn!(methods = %subject, "constraint names a method with no bound block");
        sink.emit(
            Diagnostic::warning(
                codes::VACUOUS_CONSTRAINT,
                format!("constraint on {subject} has no effect"),
            )
            .with_label(Label::primary(subject, "no update block calls this method"))
            .with_help("call the method from a block or tie it to one with an `equal` constraint"),
        );
    }
}

fn false_cycle_note(resolution: &Resolution, names: &[BlockRef]) -> Diagnostic {
    let blocks: Vec<String> = resolution
        .members
        .iter()
        .map(|b| names[b.index()].to_string())
        .collect();
    let order: Vec<String> = resolution
        .order
        .iter()
        .map(|b| names[b.index()].name.clone())
        .collect();
    Diagnostic::note(
        codes::FALSE_CYCLE,
        format!("false cycle among {} resolved by tracing", blocks.join(", ")),
    )
    .with_note(format!(
        "trial {} ({}) observed no cycle",
        resolution.trial,
        order.join(" -> ")
    ))
}
