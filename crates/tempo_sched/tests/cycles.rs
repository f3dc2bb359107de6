//! False-cycle resolution and combinational-loop rejection.

use tempo_config::SchedConfig;
use tempo_diagnostics::{DiagnosticRenderer, DiagnosticSink, Severity, TerminalRenderer};
use tempo_sched::error::codes;
use tempo_sched::{build_schedule, BlockSpec, Constraint, Design, LoopCause, ScheduleError, VarId};

#[derive(Clone, Copy)]
struct Vars {
    sel: VarId,
    v1: VarId,
    v2: VarId,
}

fn declare(d: &mut Design) -> Vars {
    Vars {
        sel: d.declare("top.sel", 1),
        v1: d.declare("top.v1", 8),
        v2: d.declare("top.v2", 8),
    }
}

/// X writes V1 and reads V2 only when `sel` is set.
fn add_x(d: &mut Design, v: &Vars, conditional: bool) {
    let Vars { sel, v1, v2 } = *v;
    d.add_block(
        BlockSpec::combinational("x", move |ctx| {
            let taken = !conditional || ctx.read(sel) != 0;
            let value = if taken { ctx.read(v2) } else { 7 };
            ctx.write(v1, value);
        })
        .reads([sel, v2])
        .writes([v1]),
    );
}

/// Y writes V2 from V1.
fn add_y(d: &mut Design, v: &Vars) {
    let Vars { v1, v2, .. } = *v;
    d.add_block(
        BlockSpec::combinational("y", move |ctx| {
            let value = ctx.read(v1);
            ctx.write(v2, value + 1);
        })
        .reads([v1])
        .writes([v2]),
    );
}

#[test]
fn branch_never_taken_is_a_false_cycle() {
    let mut d = Design::new();
    let v = declare(&mut d);
    add_x(&mut d, &v, true);
    add_y(&mut d, &v);

    let sink = DiagnosticSink::new();
    let mut schedule = build_schedule(d, &SchedConfig::default(), &sink).unwrap();
    let names: Vec<_> = schedule
        .order()
        .iter()
        .map(|&b| schedule.block_name(b).to_string())
        .collect();
    assert_eq!(names, ["x", "y"]);

    let diags = sink.take_all();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::FALSE_CYCLE);
    assert_eq!(diags[0].severity, Severity::Note);
    assert!(!sink.has_errors());
    let rendered = TerminalRenderer::new(false).render(&diags[0]);
    assert!(rendered.starts_with("note[W313]: false cycle among"), "{rendered}");

    schedule.tick();
    assert_eq!(schedule.peek(v.v1), 7);
    assert_eq!(schedule.peek(v.v2), 8);
}

#[test]
fn observed_edges_decide_order_not_trial_sequence() {
    // Y registered first: the first trial runs Y before X, but what it
    // observes is X -> Y, so X still goes first.
    let mut d = Design::new();
    let v = declare(&mut d);
    add_y(&mut d, &v);
    add_x(&mut d, &v, true);

    let compiled = d
        .compile_order(&SchedConfig::default(), &DiagnosticSink::new())
        .unwrap();
    let order: Vec<u32> = compiled.order.iter().map(|b| b.as_raw()).collect();
    assert_eq!(order, vec![1, 0]);
    assert_eq!(compiled.resolved.len(), 1);
    assert_eq!(compiled.resolved[0].trial, 0);
}

#[test]
fn unconditional_cycle_is_a_combinational_loop() {
    let mut d = Design::new();
    let v = declare(&mut d);
    add_x(&mut d, &v, false);
    add_y(&mut d, &v);

    let err = build_schedule(d, &SchedConfig::default(), &DiagnosticSink::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "combinational loop through `x` (#0) -> `y` (#1) [via `top.v1`] -> `x` (#0) [via `top.v2`]"
    );
    match &err {
        ScheduleError::CombinationalLoop { blocks, edges } => {
            let names: Vec<_> = blocks.iter().map(|b| b.name.as_str()).collect();
            assert_eq!(names, ["x", "y"]);
            assert_eq!(
                edges[0].cause,
                LoopCause::Data {
                    written: "top.v1".into(),
                    read: "top.v1".into()
                }
            );
            assert_eq!(
                edges[1].cause,
                LoopCause::Data {
                    written: "top.v2".into(),
                    read: "top.v2".into()
                }
            );
        }
        other => panic!("expected a combinational loop, got {other}"),
    }

    let rendered = TerminalRenderer::new(false).render(&err.to_diagnostic());
    assert!(rendered.starts_with("error[E302]: combinational loop through"));
    assert!(rendered.contains("block `x` (#0)"));
    assert!(rendered.contains("top.v2"));
}

#[test]
fn three_block_false_cycle() {
    let mut d = Design::new();
    let sel = d.declare("top.sel", 1);
    let a = d.declare("top.a", 8);
    let b = d.declare("top.b", 8);
    let c = d.declare("top.c", 8);
    d.add_block(
        BlockSpec::combinational("up1", move |ctx| {
            let v = if ctx.read(sel) != 0 { ctx.read(c) } else { 1 };
            ctx.write(a, v);
        })
        .reads([sel, c])
        .writes([a]),
    );
    d.add_block(
        BlockSpec::combinational("up2", move |ctx| {
            let v = ctx.read(a);
            ctx.write(b, v + 1);
        })
        .reads([a])
        .writes([b]),
    );
    d.add_block(
        BlockSpec::combinational("up3", move |ctx| {
            let v = ctx.read(b);
            ctx.write(c, v + 1);
        })
        .reads([b])
        .writes([c]),
    );

    let mut schedule = build_schedule(d, &SchedConfig::default(), &DiagnosticSink::new()).unwrap();
    schedule.tick();
    assert_eq!(schedule.peek(c), 3);
}

#[test]
fn loop_through_constraint_names_it() {
    let mut d = Design::new();
    let v = d.declare("top.v", 8);
    let w = d.declare("top.w", 8);
    let producer = d.add_block(
        BlockSpec::combinational("producer", move |ctx| ctx.write(v, 1)).writes([v]),
    );
    let consumer = d.add_block(
        BlockSpec::combinational("consumer", move |ctx| {
            let x = ctx.read(v);
            ctx.write(w, x);
        })
        .reads([v])
        .writes([w]),
    );
    d.add_constraint(Constraint::before(consumer, producer));

    let err = build_schedule(d, &SchedConfig::default(), &DiagnosticSink::new()).unwrap_err();
    match err {
        ScheduleError::CombinationalLoop { edges, .. } => {
            assert!(edges.iter().any(|e| e.cause == LoopCause::Constraint));
            assert!(edges
                .iter()
                .any(|e| matches!(&e.cause, LoopCause::Data { written, .. } if written == "top.v")));
        }
        other => panic!("expected a combinational loop, got {other}"),
    }
}

#[test]
fn trial_budget_of_one_still_resolves_registration_order() {
    let mut d = Design::new();
    let v = declare(&mut d);
    add_x(&mut d, &v, true);
    add_y(&mut d, &v);
    let config = tempo_config::load_config_from_str("[schedule]\nmax_trials = 1\n").unwrap();
    assert!(build_schedule(d, &config, &DiagnosticSink::new()).is_ok());
}
