//! Action orchestration.
//!
//! Provides `ActionMetadata`, `ActionRegistry`, the planner and the
//! `Orchestrator` that runs a plan under the host-wide `FileLock`. The CLI
//! builds the registry once and drives every run through `run_actions`.

pub mod action;
pub mod plan;
pub mod registry;
pub mod result;
pub mod runner;

pub use action::{ActionMetadata, ActionSummary, Handler, ParamSpec, ParamSummary, Params};
pub use plan::{ExecutionPlan, MissingDependencyPolicy};
pub use registry::ActionRegistry;
pub use result::{ActionOutcome, ResultMap};
pub use runner::{Orchestrator, RunOptions};
