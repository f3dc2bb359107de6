//! Schedule construction error types.
//!
//! Every error is detected during the one-shot build; a [`Schedule`](crate::Schedule)
//! only exists if none occurred. Each error renders to a structured
//! [`Diagnostic`] that names the implicated blocks and variables.

use std::fmt;

use tempo_common::InternalError;
use tempo_diagnostics::{Category, Diagnostic, DiagnosticCode, Label};

use crate::ids::{BlockId, MethodId, VarId};

/// Stable diagnostic codes emitted by the scheduler.
///
/// `E` codes always fail the build. `W` codes are advisory; the severity
/// they are emitted at says how much attention they deserve, so a `W`
/// code may arrive as a warning or as a note.
pub mod codes {
    use super::{Category, DiagnosticCode};

    /// Variable storage cannot be reconciled into a containment relation.
    pub const ALIAS_AMBIGUITY: DiagnosticCode = DiagnosticCode::new(Category::Error, 301);
    /// A candidate cycle survived dynamic disambiguation.
    pub const COMBINATIONAL_LOOP: DiagnosticCode = DiagnosticCode::new(Category::Error, 302);
    /// Explicit ordering constraints contradict each other.
    pub const CONFLICTING_CONSTRAINT: DiagnosticCode = DiagnosticCode::new(Category::Error, 303);
    /// A malformed declaration or a reference to something never registered.
    pub const INVALID_DESIGN: DiagnosticCode = DiagnosticCode::new(Category::Error, 304);
    /// A combinational block reads storage it also writes.
    pub const SELF_DEPENDENCY: DiagnosticCode = DiagnosticCode::new(Category::Warning, 311);
    /// A constraint names a method no block is bound to.
    pub const VACUOUS_CONSTRAINT: DiagnosticCode = DiagnosticCode::new(Category::Warning, 312);
    /// A static cycle was shown to be false by traced execution.
    ///
    /// Emitted at `Severity::Note` and rendered as `note[W313]`, since the
    /// design schedules fine.
    pub const FALSE_CYCLE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 313);
}

/// An update block named by ID and declared name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockRef {
    /// The block's registration ID.
    pub id: BlockId,
    /// The block's declared name.
    pub name: String,
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` ({})", self.name, self.id)
    }
}

/// Why one block of a reported loop must run before the next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopCause {
    /// `from` writes `written`, which overlaps `read`, read by `to`.
    Data {
        /// Path of the variable written by `from`.
        written: String,
        /// Path of the variable read by `to`.
        read: String,
    },
    /// `from` reads `read` before the sequential block `to` updates `written`.
    StateRead {
        /// Path of the variable read by `from`.
        read: String,
        /// Path of the variable written by `to`.
        written: String,
    },
    /// An explicit ordering constraint.
    Constraint,
}

impl fmt::Display for LoopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopCause::Data { written, read } if written == read => write!(f, "via `{written}`"),
            LoopCause::Data { written, read } => write!(f, "via `{written}` -> `{read}`"),
            LoopCause::StateRead { read, written } => {
                write!(f, "reads `{read}` before `{written}` is updated")
            }
            LoopCause::Constraint => write!(f, "explicit constraint"),
        }
    }
}

/// One edge of a reported cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopEdge {
    /// The block that must run first.
    pub from: BlockRef,
    /// The block that must run second.
    pub to: BlockRef,
    /// The dependency forcing the order.
    pub cause: LoopCause,
}

/// Errors that can occur while building a schedule.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Two variables could not be reconciled into a containment relation.
    #[error("ambiguous alias at `{path}`: `{first}` conflicts with `{second}`")]
    AliasAmbiguity {
        /// Path where the ambiguity was found.
        path: String,
        /// Description of the first declaration.
        first: String,
        /// Description of the conflicting declaration.
        second: String,
    },

    /// A candidate cycle persisted under traced execution.
    #[error("combinational loop through {}", render_cycle(.edges))]
    CombinationalLoop {
        /// Blocks on the cycle, in cycle order.
        blocks: Vec<BlockRef>,
        /// The cycle's edges; the last edge returns to the first block.
        edges: Vec<LoopEdge>,
    },

    /// Explicit ordering constraints form a cycle.
    #[error("conflicting constraints among {}", render_blocks(.blocks))]
    ConflictingConstraint {
        /// Blocks whose explicit constraints contradict each other.
        blocks: Vec<BlockRef>,
        /// The contradicting constraints, rendered `a < b`.
        constraints: Vec<String>,
    },

    /// A variable declaration is malformed.
    #[error("invalid variable `{path}`: {reason}")]
    InvalidVariable {
        /// Path of the offending variable.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A structural connection cannot be realized.
    #[error("cannot connect `{a}` and `{b}`: {reason}")]
    InvalidConnection {
        /// Path of the first endpoint.
        a: String,
        /// Path of the second endpoint.
        b: String,
        /// Why the connection is rejected.
        reason: String,
    },

    /// A block or connection references a variable that was never declared.
    #[error("unknown variable {0}")]
    UnknownVariable(VarId),

    /// A constraint references a block that was never registered.
    #[error("unknown update block {0}")]
    UnknownBlock(BlockId),

    /// A block or constraint references a method that was never registered.
    #[error("unknown method {0}")]
    UnknownMethod(MethodId),

    /// The scheduler broke one of its own invariants.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

fn render_cycle(edges: &[LoopEdge]) -> String {
    let mut out = String::new();
    for (i, edge) in edges.iter().enumerate() {
        if i == 0 {
            out.push_str(&edge.from.to_string());
        }
        out.push_str(&format!(" -> {} [{}]", edge.to, edge.cause));
    }
    out
}

fn render_blocks(blocks: &[BlockRef]) -> String {
    blocks
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ScheduleError {
    /// Returns the diagnostic code for this error.
    pub fn code(&self) -> tempo_diagnostics::DiagnosticCode {
        match self {
            ScheduleError::AliasAmbiguity { .. } => codes::ALIAS_AMBIGUITY,
            ScheduleError::CombinationalLoop { .. } => codes::COMBINATIONAL_LOOP,
            ScheduleError::ConflictingConstraint { .. } => codes::CONFLICTING_CONSTRAINT,
            ScheduleError::InvalidVariable { .. }
            | ScheduleError::InvalidConnection { .. }
            | ScheduleError::UnknownVariable(_)
            | ScheduleError::UnknownBlock(_)
            | ScheduleError::UnknownMethod(_)
            | ScheduleError::Internal(_) => codes::INVALID_DESIGN,
        }
    }

    /// Converts this error into a structured report.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            ScheduleError::AliasAmbiguity { path, first, second } => diag
                .with_label(Label::primary(path.clone(), first.clone()))
                .with_label(Label::secondary(path.clone(), second.clone()))
                .with_note("merging these declarations could order blocks incorrectly"),
            ScheduleError::CombinationalLoop { edges, .. } => {
                let mut diag = diag;
                for (i, edge) in edges.iter().enumerate() {
                    let label = format!("must run before {}: {}", edge.to, edge.cause);
                    diag = diag.with_label(if i == 0 {
                        Label::primary(format!("block {}", edge.from), label)
                    } else {
                        Label::secondary(format!("block {}", edge.from), label)
                    });
                }
                diag.with_note("the cycle persists under traced execution of every trial order")
                    .with_help("break the loop with a sequential block or restructure the logic")
            }
            ScheduleError::ConflictingConstraint {
                blocks,
                constraints,
            } => {
                let mut diag = diag;
                for block in blocks {
                    diag = diag.with_label(Label::secondary(
                        format!("block {block}"),
                        "constrained here",
                    ));
                }
                for constraint in constraints {
                    diag = diag.with_note(format!("constraint: {constraint}"));
                }
                diag
            }
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_diagnostics::LabelStyle;

    fn block(id: u32, name: &str) -> BlockRef {
        BlockRef {
            id: BlockId::from_raw(id),
            name: name.to_string(),
        }
    }

    fn sample_loop() -> ScheduleError {
        ScheduleError::CombinationalLoop {
            blocks: vec![block(0, "x"), block(1, "y")],
            edges: vec![
                LoopEdge {
                    from: block(0, "x"),
                    to: block(1, "y"),
                    cause: LoopCause::Data {
                        written: "top.v1".into(),
                        read: "top.v1".into(),
                    },
                },
                LoopEdge {
                    from: block(1, "y"),
                    to: block(0, "x"),
                    cause: LoopCause::Data {
                        written: "top.v2".into(),
                        read: "top.v2".into(),
                    },
                },
            ],
        }
    }

    #[test]
    fn loop_display_names_blocks_and_vars() {
        let msg = sample_loop().to_string();
        assert_eq!(
            msg,
            "combinational loop through `x` (#0) -> `y` (#1) [via `top.v1`] -> `x` (#0) [via `top.v2`]"
        );
    }

    #[test]
    fn loop_diagnostic_labels_each_edge() {
        let diag = sample_loop().to_diagnostic();
        assert_eq!(diag.code, codes::COMBINATIONAL_LOOP);
        assert_eq!(diag.labels.len(), 2);
        assert_eq!(diag.labels[0].style, LabelStyle::Primary);
        assert_eq!(diag.labels[1].style, LabelStyle::Secondary);
        assert!(diag.labels[0].message.contains("top.v1"));
    }

    #[test]
    fn alias_display() {
        let e = ScheduleError::AliasAmbiguity {
            path: "top.out".into(),
            first: "field `a`: struct `SomeMsg1`".into(),
            second: "field `b`: struct `SomeMsg1` with a different layout".into(),
        };
        assert!(e.to_string().starts_with("ambiguous alias at `top.out`"));
        assert_eq!(e.code(), codes::ALIAS_AMBIGUITY);
        assert_eq!(e.to_diagnostic().labels.len(), 2);
    }

    #[test]
    fn conflicting_constraint_display() {
        let e = ScheduleError::ConflictingConstraint {
            blocks: vec![block(0, "a"), block(1, "b")],
            constraints: vec!["`a` < `b`".into(), "`b` < `a`".into()],
        };
        assert_eq!(e.to_string(), "conflicting constraints among `a` (#0), `b` (#1)");
        assert_eq!(e.to_diagnostic().notes.len(), 2);
    }

    #[test]
    fn state_read_cause_display() {
        let cause = LoopCause::StateRead {
            read: "top.r".into(),
            written: "top.r".into(),
        };
        assert_eq!(cause.to_string(), "reads `top.r` before `top.r` is updated");
    }

    #[test]
    fn reference_errors_share_code() {
        assert_eq!(
            ScheduleError::UnknownVariable(VarId::from_raw(3)).code(),
            codes::INVALID_DESIGN
        );
        assert_eq!(
            ScheduleError::UnknownBlock(BlockId::from_raw(1)).to_string(),
            "unknown update block #1"
        );
    }

    #[test]
    fn internal_error_is_transparent() {
        let e: ScheduleError = InternalError::new("lost a block").into();
        assert_eq!(e.to_string(), "internal scheduler error: lost a block");
    }
}
