//! Ops cycle execution.
//!
//! One scheduled invocation runs a fixed list of detection/maintenance steps
//! against the store and always leaves a complete audit trail, regardless of
//! partial failure.

pub mod runner;
pub mod steps;

pub use runner::{CycleKind, CycleReport, CycleRunner, StepContext};
