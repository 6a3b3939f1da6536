//! Starting the server and running the driver
//!
//! The server is started with no arguments and left running; the driver is
//! run to completion with its stdout captured.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::common::{Error, Result};

use super::guard::ServerProcess;

/// Exit status and stdout of a finished driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    /// Everything the driver wrote to stdout
    pub stdout: String,
}

impl DriverOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Process operations the scenarios need
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start the server and return without waiting for it
    async fn launch_server(&self, path: &Path) -> Result<Box<dyn ServerProcess>>;

    /// Run the driver until it exits, capturing stdout
    async fn run_driver(&self, path: &Path, args: &[String]) -> Result<DriverOutput>;
}

/// Launches real OS processes
#[derive(Debug, Default, Clone)]
pub struct ProcessOrchestrator {
    envs: Vec<(OsString, OsString)>,
    driver_timeout: Option<Duration>,
}

impl ProcessOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an environment variable for every process started
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Kill the driver and fail if it runs longer than `limit`
    pub fn driver_timeout(mut self, limit: Option<Duration>) -> Self {
        self.driver_timeout = limit;
        self
    }

    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(path);
        cmd.envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// A server started by [`ProcessOrchestrator`]
pub struct OsServer {
    child: Child,
}

#[async_trait]
impl ServerProcess for OsServer {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn kill(&mut self) -> io::Result<()> {
        // Returns once the child has been reaped
        self.child.kill().await
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }
}

#[async_trait]
impl Launcher for ProcessOrchestrator {
    async fn launch_server(&self, path: &Path) -> Result<Box<dyn ServerProcess>> {
        let child = self
            .command(path)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::spawn_failed(&path.display().to_string(), e))?;

        tracing::info!(pid = ?child.id(), "Started server {}", path.display());

        Ok(Box::new(OsServer { child }))
    }

    async fn run_driver(&self, path: &Path, args: &[String]) -> Result<DriverOutput> {
        tracing::info!("Running {} {}", path.display(), args.join(" "));

        let child = self
            .command(path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::spawn_failed(&path.display().to_string(), e))?;

        let pid = child.id();

        // Dropping the future on timeout drops the child, which kills it
        let output = match self.driver_timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| Error::timeout("driver", limit.as_secs()))??,
            None => child.wait_with_output().await?,
        };

        let status = output.status.code();
        tracing::info!(pid = ?pid, status = ?status, "Driver exited");

        Ok(DriverOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
