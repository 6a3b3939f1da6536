//! Workload configuration
//!
//! Values are layered, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional TOML file (`--config <path>` or the platform config dir)
//! 3. environment overrides (`TIO_PATH`, `TIO_BENCH_*`, ...)
//!
//! An empty environment variable counts as absent. Counts are kept as the
//! text that was supplied and only parsed when a scenario needs them, so a
//! malformed override fails the scenario that uses it and nothing else.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::{config_path, executable_name};
use super::{Error, Result};

pub const ENV_TIO_PATH: &str = "TIO_PATH";
pub const ENV_TIO_BENCH_PATH: &str = "TIO_BENCH_PATH";
pub const ENV_TOTAL_OPERATIONS: &str = "TIO_BENCH_TOTAL_OPERATIONS";
pub const ENV_TOTAL_FEEDERS: &str = "TIO_BENCH_TOTAL_FEEDERS";
pub const ENV_TOTAL_CLIENTS: &str = "TIO_BENCH_TOTAL_CLIENTS";
pub const ENV_OPERATIONS_BY_FEEDER: &str = "TIO_BENCH_OPERATIONS_BY_FEEDER";
pub const ENV_URI: &str = "TIO_URI";
pub const ENV_ALLOW_NON_WINDOWS: &str = "TIO_BENCH_ALLOW_NON_WINDOWS";
pub const ENV_DRIVER_TIMEOUT: &str = "TIO_BENCH_DRIVER_TIMEOUT_SECS";
pub const ENV_IO_TIMEOUT: &str = "TIO_IO_TIMEOUT_SECS";

/// Default port of the tio server
pub const DEFAULT_PORT: u16 = 2605;

/// A count setting, kept as supplied until a scenario asks for its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Count {
    name: &'static str,
    raw: String,
}

impl Count {
    fn new(name: &'static str, raw: impl Into<String>) -> Self {
        Self {
            name,
            raw: raw.into(),
        }
    }

    /// The setting name (the environment variable it is read from)
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The text as supplied
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parse the value as a non-negative integer
    pub fn get(&self) -> Result<u64> {
        self.raw.trim().parse().map_err(|_| Error::InvalidCount {
            name: self.name.to_string(),
            value: self.raw.clone(),
        })
    }
}

/// Fully resolved configuration for one harness run
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Path to the tio server executable
    pub tio_path: PathBuf,
    /// Path to the tiobench driver executable
    pub tio_bench_path: PathBuf,
    /// Operations for the parallel data stress scenario
    pub total_operations: Count,
    /// Feeders for the UMDF feeder stress scenario
    pub total_feeders: Count,
    /// Clients per feeder for the UMDF feeder stress scenario
    pub total_clients: Count,
    /// Operations each feeder issues
    pub operations_by_feeder: Count,
    /// Where the verification client connects
    pub server_uri: String,
    /// Run the Windows-only stress scenarios on other hosts too
    pub allow_non_windows: bool,
    /// Bound on the driver run; unbounded when absent
    pub driver_timeout_secs: Option<Count>,
    /// Bound on each protocol exchange; unbounded when absent
    pub io_timeout_secs: Option<Count>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            tio_path: PathBuf::from(executable_name("tio")),
            tio_bench_path: PathBuf::from(executable_name("tiobench")),
            total_operations: Count::new(ENV_TOTAL_OPERATIONS, "1000"),
            total_feeders: Count::new(ENV_TOTAL_FEEDERS, "20"),
            total_clients: Count::new(ENV_TOTAL_CLIENTS, "3"),
            operations_by_feeder: Count::new(ENV_OPERATIONS_BY_FEEDER, "100"),
            server_uri: default_uri(),
            allow_non_windows: false,
            driver_timeout_secs: None,
            io_timeout_secs: None,
        }
    }
}

fn default_uri() -> String {
    format!("tio://localhost:{}", DEFAULT_PORT)
}

/// On-disk configuration file layout
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub tio_path: Option<PathBuf>,
    pub tio_bench_path: Option<PathBuf>,
    pub server_uri: Option<String>,
    pub allow_non_windows: Option<bool>,

    #[serde(default)]
    pub workload: WorkloadSection,

    #[serde(default)]
    pub timeouts: TimeoutSection,
}

/// `[workload]` table
#[derive(Debug, Deserialize, Default)]
pub struct WorkloadSection {
    pub total_operations: Option<u64>,
    pub total_feeders: Option<u64>,
    pub total_clients: Option<u64>,
    pub operations_by_feeder: Option<u64>,
}

/// `[timeouts]` table, in seconds
#[derive(Debug, Deserialize, Default)]
pub struct TimeoutSection {
    pub driver_secs: Option<u64>,
    pub io_secs: Option<u64>,
}

impl ConfigFile {
    /// Read and parse a configuration file
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

impl WorkloadConfig {
    /// Load configuration: defaults, then the config file, then the environment
    ///
    /// An explicit `file` must exist. Without one, the default config path is
    /// used only if present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) => Some(ConfigFile::read(path)?),
            None => match config_path() {
                Some(path) if path.exists() => Some(ConfigFile::read(&path)?),
                _ => None,
            },
        };

        let mut config = Self::default();
        if let Some(file) = file {
            config.apply_file(file);
        }
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overlay values from a parsed config file
    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(path) = file.tio_path {
            self.tio_path = path;
        }
        if let Some(path) = file.tio_bench_path {
            self.tio_bench_path = path;
        }
        if let Some(uri) = file.server_uri {
            self.server_uri = uri;
        }
        if let Some(allow) = file.allow_non_windows {
            self.allow_non_windows = allow;
        }

        let workload = file.workload;
        if let Some(n) = workload.total_operations {
            self.total_operations = Count::new(ENV_TOTAL_OPERATIONS, n.to_string());
        }
        if let Some(n) = workload.total_feeders {
            self.total_feeders = Count::new(ENV_TOTAL_FEEDERS, n.to_string());
        }
        if let Some(n) = workload.total_clients {
            self.total_clients = Count::new(ENV_TOTAL_CLIENTS, n.to_string());
        }
        if let Some(n) = workload.operations_by_feeder {
            self.operations_by_feeder = Count::new(ENV_OPERATIONS_BY_FEEDER, n.to_string());
        }

        if let Some(secs) = file.timeouts.driver_secs {
            self.driver_timeout_secs = Some(Count::new(ENV_DRIVER_TIMEOUT, secs.to_string()));
        }
        if let Some(secs) = file.timeouts.io_secs {
            self.io_timeout_secs = Some(Count::new(ENV_IO_TIMEOUT, secs.to_string()));
        }
    }

    /// Overlay environment overrides read through `lookup`
    ///
    /// Only the boolean switch is validated here; counts stay raw.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(path) = get(ENV_TIO_PATH) {
            self.tio_path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_TIO_BENCH_PATH) {
            self.tio_bench_path = PathBuf::from(path);
        }
        if let Some(raw) = get(ENV_TOTAL_OPERATIONS) {
            self.total_operations = Count::new(ENV_TOTAL_OPERATIONS, raw);
        }
        if let Some(raw) = get(ENV_TOTAL_FEEDERS) {
            self.total_feeders = Count::new(ENV_TOTAL_FEEDERS, raw);
        }
        if let Some(raw) = get(ENV_TOTAL_CLIENTS) {
            self.total_clients = Count::new(ENV_TOTAL_CLIENTS, raw);
        }
        if let Some(raw) = get(ENV_OPERATIONS_BY_FEEDER) {
            self.operations_by_feeder = Count::new(ENV_OPERATIONS_BY_FEEDER, raw);
        }
        if let Some(uri) = get(ENV_URI) {
            self.server_uri = uri;
        }
        if let Some(raw) = get(ENV_ALLOW_NON_WINDOWS) {
            self.allow_non_windows = parse_switch(ENV_ALLOW_NON_WINDOWS, &raw)?;
        }
        if let Some(raw) = get(ENV_DRIVER_TIMEOUT) {
            self.driver_timeout_secs = Some(Count::new(ENV_DRIVER_TIMEOUT, raw));
        }
        if let Some(raw) = get(ENV_IO_TIMEOUT) {
            self.io_timeout_secs = Some(Count::new(ENV_IO_TIMEOUT, raw));
        }

        Ok(())
    }

    /// Bound on the driver run, if configured
    pub fn driver_timeout(&self) -> Result<Option<Duration>> {
        secs_to_duration(self.driver_timeout_secs.as_ref())
    }

    /// Bound on each protocol exchange, if configured
    pub fn io_timeout(&self) -> Result<Option<Duration>> {
        secs_to_duration(self.io_timeout_secs.as_ref())
    }

    /// Whether the Windows-only stress scenarios may run on this host
    pub fn stress_scenarios_enabled(&self) -> bool {
        super::paths::is_windows_family() || self.allow_non_windows
    }
}

fn secs_to_duration(count: Option<&Count>) -> Result<Option<Duration>> {
    count
        .map(|c| c.get().map(Duration::from_secs))
        .transpose()
}

fn parse_switch(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Configuration(format!(
            "{} must be a boolean, got '{}'",
            name, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WorkloadConfig::default();
        assert_eq!(config.total_operations.get().unwrap(), 1000);
        assert_eq!(config.total_feeders.get().unwrap(), 20);
        assert_eq!(config.total_clients.get().unwrap(), 3);
        assert_eq!(config.operations_by_feeder.get().unwrap(), 100);
        assert_eq!(config.server_uri, "tio://localhost:2605");
        assert!(config.driver_timeout().unwrap().is_none());

        let expected = if cfg!(windows) { "tio.exe" } else { "tio" };
        assert_eq!(config.tio_path, PathBuf::from(expected));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = WorkloadConfig::default();
        config
            .apply_env(env(&[
                (ENV_TIO_PATH, "/opt/tio/bin/tio"),
                (ENV_TOTAL_FEEDERS, "4"),
                (ENV_OPERATIONS_BY_FEEDER, "250"),
                (ENV_DRIVER_TIMEOUT, "90"),
            ]))
            .unwrap();

        assert_eq!(config.tio_path, PathBuf::from("/opt/tio/bin/tio"));
        assert_eq!(config.total_feeders.get().unwrap(), 4);
        assert_eq!(config.operations_by_feeder.get().unwrap(), 250);
        assert_eq!(config.total_clients.get().unwrap(), 3);
        assert_eq!(
            config.driver_timeout().unwrap(),
            Some(Duration::from_secs(90))
        );
    }

    #[test]
    fn test_empty_env_uses_default() {
        let mut config = WorkloadConfig::default();
        config
            .apply_env(env(&[(ENV_TOTAL_OPERATIONS, ""), (ENV_TIO_BENCH_PATH, "")]))
            .unwrap();
        assert_eq!(config.total_operations.raw(), "1000");
        assert_eq!(
            config.tio_bench_path,
            WorkloadConfig::default().tio_bench_path
        );
    }

    #[test]
    fn test_malformed_count_fails_at_use() {
        let mut config = WorkloadConfig::default();
        config
            .apply_env(env(&[(ENV_TOTAL_CLIENTS, "three")]))
            .unwrap();

        let err = config.total_clients.get().unwrap_err();
        assert!(matches!(err, Error::InvalidCount { .. }));
        assert!(err.to_string().contains(ENV_TOTAL_CLIENTS));

        let mut config = WorkloadConfig::default();
        config.apply_env(env(&[(ENV_TOTAL_FEEDERS, "-5")])).unwrap();
        assert!(config.total_feeders.get().is_err());
    }

    #[test]
    fn test_bad_switch_is_rejected() {
        let mut config = WorkloadConfig::default();
        let err = config
            .apply_env(env(&[(ENV_ALLOW_NON_WINDOWS, "maybe")]))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        config
            .apply_env(env(&[(ENV_ALLOW_NON_WINDOWS, "YES")]))
            .unwrap();
        assert!(config.allow_non_windows);
        assert!(config.stress_scenarios_enabled());
    }

    #[test]
    fn test_file_layer_below_env() {
        let file: ConfigFile = toml::from_str(
            r#"
            tio_bench_path = "/srv/tiobench"
            server_uri = "tio://10.0.0.5:2605"

            [workload]
            total_feeders = 8
            total_operations = 50

            [timeouts]
            io_secs = 15
            "#,
        )
        .unwrap();

        let mut config = WorkloadConfig::default();
        config.apply_file(file);
        config
            .apply_env(env(&[(ENV_TOTAL_FEEDERS, "2")]))
            .unwrap();

        assert_eq!(config.tio_bench_path, PathBuf::from("/srv/tiobench"));
        assert_eq!(config.server_uri, "tio://10.0.0.5:2605");
        assert_eq!(config.total_operations.get().unwrap(), 50);
        assert_eq!(config.total_feeders.get().unwrap(), 2);
        assert_eq!(config.io_timeout().unwrap(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_read_missing_file() {
        let err = ConfigFile::read(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
