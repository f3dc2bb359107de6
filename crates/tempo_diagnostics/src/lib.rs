//! Structured reports for schedule construction.
//!
//! A [`Diagnostic`] names the update blocks, methods, and variables involved
//! in a problem through [`Label`]s instead of source locations, since the
//! scheduler only ever sees elaborated designs. The [`DiagnosticSink`]
//! collects warnings and notes emitted while a schedule is built, and
//! [`TerminalRenderer`] formats them for humans.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode, ParseCodeError};
pub use diagnostic::Diagnostic;
pub use label::{Label, LabelStyle};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
