//! Scenario definitions and results

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;

use crate::common::{Error, Result, WorkloadConfig};

/// The harness scenarios, in the order a full suite runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Scenario {
    /// Both executables exist and can be executed
    Preflight,
    /// One map container filled by `--run-test-parallel-data-stress`
    DataStress,
    /// Per-symbol order books filled by `--run-test-umdf-feeder-stress`
    FeederStress,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::Preflight,
        Scenario::DataStress,
        Scenario::FeederStress,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Preflight => "preflight",
            Scenario::DataStress => "data-stress",
            Scenario::FeederStress => "feeder-stress",
        }
    }

    /// Whether the scenario launches processes and is gated to Windows hosts
    ///
    /// tiobench only implements the UMDF feeders and the threaded parallel
    /// stress run on Windows.
    pub fn is_stress(self) -> bool {
        !matches!(self, Scenario::Preflight)
    }

    /// Driver arguments for this scenario
    ///
    /// Counts are parsed here, so a malformed override fails before any
    /// process is started.
    pub fn driver_args(self, config: &WorkloadConfig) -> Result<Vec<String>> {
        let args = match self {
            Scenario::Preflight => Vec::new(),
            Scenario::DataStress => vec![
                "--run-test-parallel-data-stress".to_string(),
                "--umdf-feeder-test-total-operations".to_string(),
                config.total_operations.get()?.to_string(),
            ],
            Scenario::FeederStress => vec![
                "--run-test-umdf-feeder-stress".to_string(),
                "--umdf-feeder-test-total-feeders".to_string(),
                config.total_feeders.get()?.to_string(),
                "--umdf-feeder-test-total-clients".to_string(),
                config.total_clients.get()?.to_string(),
                "--umdf-feeder-test-total-operations".to_string(),
                config.operations_by_feeder.get()?.to_string(),
            ],
        };
        Ok(args)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a scenario is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    NotStarted,
    ServerRunning,
    DriverCompleted,
    Verified,
    Failed,
    /// Platform-gated; nothing was launched
    Skipped,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScenarioState::NotStarted => "not started",
            ScenarioState::ServerRunning => "server running",
            ScenarioState::DriverCompleted => "driver completed",
            ScenarioState::Verified => "verified",
            ScenarioState::Failed => "failed",
            ScenarioState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Outcome of one scenario run
#[derive(Debug)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    /// Every state the scenario passed through, ending in a terminal one
    pub history: Vec<ScenarioState>,
    /// Why it failed, or why it was skipped
    pub error: Option<Error>,
    pub skip_reason: Option<String>,
    /// Captured driver stdout, when the driver ran
    pub driver_output: Option<String>,
    pub elapsed: Duration,
}

impl ScenarioResult {
    pub fn state(&self) -> ScenarioState {
        self.history
            .last()
            .copied()
            .unwrap_or(ScenarioState::NotStarted)
    }

    pub fn passed(&self) -> bool {
        self.state() == ScenarioState::Verified
    }

    pub fn skipped(&self) -> bool {
        self.state() == ScenarioState::Skipped
    }

    pub fn failed(&self) -> bool {
        self.state() == ScenarioState::Failed
    }
}

/// Check that `path` names an executable file
///
/// A bare program name that does not exist relative to the working
/// directory is looked up on `PATH`. Returns the path that was checked.
pub fn check_executable(path: &Path) -> Result<PathBuf> {
    let display = path.display().to_string();

    let resolved = if path.exists() {
        path.to_path_buf()
    } else if path.components().count() == 1 {
        which::which(path).map_err(|_| Error::preflight(&display, "not found on PATH"))?
    } else {
        return Err(Error::preflight(&display, "no such file"));
    };

    let metadata = std::fs::metadata(&resolved)
        .map_err(|e| Error::preflight(&display, &e.to_string()))?;
    if !metadata.is_file() {
        return Err(Error::preflight(&display, "not a regular file"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(Error::preflight(&display, "not executable"));
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_stress_args() {
        let config = WorkloadConfig::default();
        assert_eq!(
            Scenario::DataStress.driver_args(&config).unwrap(),
            vec![
                "--run-test-parallel-data-stress",
                "--umdf-feeder-test-total-operations",
                "1000"
            ]
        );
    }

    #[test]
    fn test_feeder_stress_args() {
        let config = WorkloadConfig::default();
        assert_eq!(
            Scenario::FeederStress.driver_args(&config).unwrap(),
            vec![
                "--run-test-umdf-feeder-stress",
                "--umdf-feeder-test-total-feeders",
                "20",
                "--umdf-feeder-test-total-clients",
                "3",
                "--umdf-feeder-test-total-operations",
                "100"
            ]
        );
    }

    #[test]
    fn test_args_with_malformed_count() {
        let mut config = WorkloadConfig::default();
        config
            .apply_env(|name| (name == "TIO_BENCH_TOTAL_OPERATIONS").then(|| "1e3".to_string()))
            .unwrap();
        assert!(matches!(
            Scenario::DataStress.driver_args(&config),
            Err(Error::InvalidCount { .. })
        ));
        // The feeder scenario does not use that count
        assert!(Scenario::FeederStress.driver_args(&config).is_ok());
    }

    #[test]
    fn test_check_executable_missing() {
        let err = check_executable(Path::new("/no/such/dir/tio")).unwrap_err();
        assert!(matches!(err, Error::Preflight { .. }));

        let err = check_executable(Path::new("tio-binary-that-does-not-exist")).unwrap_err();
        assert!(matches!(err, Error::Preflight { .. }));
    }

    #[test]
    fn test_check_executable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_executable(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[cfg(unix)]
    #[test]
    fn test_check_executable_mode_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tio");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let err = check_executable(&path).unwrap_err();
        assert!(err.to_string().contains("not executable"));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(check_executable(&path).unwrap(), path);
    }
}
