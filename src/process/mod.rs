//! Process orchestration for the server and the benchmark driver

pub mod guard;
pub mod orchestrator;

pub use guard::{ServerGuard, ServerProcess};
pub use orchestrator::{DriverOutput, Launcher, ProcessOrchestrator};
