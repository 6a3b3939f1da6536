//! Scenario runner
//!
//! Composes the orchestrator, the report parser and the tio client into
//! the harness scenarios. Each scenario starts from a clean server and
//! compares what the driver claims it did with what the server holds.

mod runner;
mod scenario;

pub use runner::{run_suite, ScenarioRunner, SuiteSummary};
pub use scenario::{check_executable, Scenario, ScenarioResult, ScenarioState};
