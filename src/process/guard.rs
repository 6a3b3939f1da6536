//! Scoped ownership of the server process
//!
//! A [`ServerGuard`] kills its process exactly once. The explicit
//! [`ServerGuard::terminate`] waits until the process has exited, so the
//! next scenario can bind the same port. Dropping an unterminated guard
//! (early return, panic, task cancellation) can only send the kill.

use std::io;

use async_trait::async_trait;

/// A started server process
#[async_trait]
pub trait ServerProcess: Send {
    /// OS process id, if still known
    fn id(&self) -> Option<u32>;

    /// Forcibly stop the process and wait for it to exit
    async fn kill(&mut self) -> io::Result<()>;

    /// Send the kill without waiting
    fn start_kill(&mut self) -> io::Result<()>;
}

pub struct ServerGuard {
    label: String,
    process: Option<Box<dyn ServerProcess>>,
}

impl ServerGuard {
    pub fn new(label: impl Into<String>, process: Box<dyn ServerProcess>) -> Self {
        Self {
            label: label.into(),
            process: Some(process),
        }
    }

    /// Whether the process has not been terminated yet
    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    pub fn id(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.id())
    }

    /// Kill the server and wait for it to exit; later calls do nothing
    pub async fn terminate(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };

        let pid = process.id();
        let result = process.kill().await;
        self.log_kill(pid, result);
    }

    fn log_kill(&self, pid: Option<u32>, result: io::Result<()>) {
        match result {
            Ok(()) => tracing::info!(pid = ?pid, "Terminated {}", self.label),
            // Already exited on its own; nothing left to stop
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                tracing::warn!(pid = ?pid, "{} had already exited", self.label)
            }
            Err(e) => tracing::error!(pid = ?pid, "Failed to kill {}: {}", self.label, e),
        }
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        // Best effort: we can't await in drop
        if let Some(mut process) = self.process.take() {
            let pid = process.id();
            let result = process.start_kill();
            self.log_kill(pid, result);
        }
    }
}
