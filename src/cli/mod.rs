//! CLI command handling
//!
//! Dispatches CLI commands and formats their output.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Count;
use crate::common::paths;
use crate::common::{Error, Result, WorkloadConfig};
use crate::process::ProcessOrchestrator;
use crate::report::BenchmarkReport;
use crate::testing::{run_suite, Scenario, ScenarioRunner};
use crate::tio::{TioConnection, TioConnector};

/// Options shared by every command
#[derive(Debug, Default)]
pub struct Options {
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, options: Options) -> Result<()> {
    match command {
        Commands::Run { scenario } => {
            let config = WorkloadConfig::load(options.config.as_deref())?;
            let scenarios = if scenario.is_empty() {
                Scenario::ALL.to_vec()
            } else {
                scenario
            };
            run(&config, &scenarios, options.verbose).await
        }

        Commands::Config { json } => {
            let config = WorkloadConfig::load(options.config.as_deref())?;
            if json {
                println!("{}", config_json(&config)?);
            } else {
                print_config(&config, options.config.as_deref());
            }
            Ok(())
        }

        Commands::Count { containers, uri } => {
            let config = WorkloadConfig::load(options.config.as_deref())?;
            let uri = uri.unwrap_or_else(|| config.server_uri.clone());
            let mut cn = TioConnection::connect_with_timeout(&uri, config.io_timeout()?).await?;

            for name in &containers {
                let container = cn.open(name).await?;
                let length = cn.length(&container).await?;
                println!("{} {}", length.to_string().bold(), container.name);
                cn.close(container).await?;
            }
            Ok(())
        }

        Commands::Parse { file, symbols } => {
            let raw = std::fs::read_to_string(&file).map_err(|e| Error::FileRead {
                path: file.display().to_string(),
                error: e.to_string(),
            })?;
            let report = BenchmarkReport::new(raw);

            if symbols {
                let symbols = report.symbols()?;
                println!("{} symbol(s):", symbols.len());
                for symbol in &symbols {
                    println!("  {:?}", symbol);
                }
            } else {
                let map = report.map_report()?;
                println!("container: {}", map.container);
                println!("expected:  {}", map.expected);
            }
            Ok(())
        }
    }
}

async fn run(config: &WorkloadConfig, scenarios: &[Scenario], verbose: bool) -> Result<()> {
    let launcher = ProcessOrchestrator::new().driver_timeout(config.driver_timeout()?);
    let connector = TioConnector {
        io_timeout: config.io_timeout()?,
    };
    let runner = ScenarioRunner::new(config, &launcher, &connector);

    let summary = run_suite(&runner, scenarios, verbose).await;
    if summary.success() {
        Ok(())
    } else {
        Err(Error::Assertion(format!(
            "{} of {} scenario(s) failed",
            summary.failed(),
            summary.results.len()
        )))
    }
}

fn config_json(config: &WorkloadConfig) -> Result<String> {
    let value = serde_json::json!({
        "tio_path": config.tio_path,
        "tio_bench_path": config.tio_bench_path,
        "total_operations": config.total_operations.raw(),
        "total_feeders": config.total_feeders.raw(),
        "total_clients": config.total_clients.raw(),
        "operations_by_feeder": config.operations_by_feeder.raw(),
        "server_uri": config.server_uri,
        "allow_non_windows": config.allow_non_windows,
        "stress_scenarios_enabled": config.stress_scenarios_enabled(),
        "driver_timeout_secs": config.driver_timeout_secs.as_ref().map(|c| c.raw()),
        "io_timeout_secs": config.io_timeout_secs.as_ref().map(|c| c.raw()),
    });
    serde_json::to_string_pretty(&value)
        .map_err(|e| Error::Configuration(format!("cannot serialize configuration: {}", e)))
}

fn print_config(config: &WorkloadConfig, file: Option<&Path>) {
    let file = file.map(Path::to_path_buf).or_else(paths::config_path);
    match file {
        Some(path) if path.exists() => println!("Config file: {}", path.display()),
        Some(path) => println!("Config file: {} {}", path.display(), "(not present)".dimmed()),
        None => println!("Config file: {}", "(no config directory)".dimmed()),
    }
    println!();

    println!("  tio:       {}", config.tio_path.display());
    println!("  tiobench:  {}", config.tio_bench_path.display());
    println!("  server:    {}", config.server_uri);
    println!();

    for count in [
        &config.total_operations,
        &config.total_feeders,
        &config.total_clients,
        &config.operations_by_feeder,
    ] {
        let value = match count.get() {
            Ok(n) => n.to_string().normal(),
            Err(_) => format!("{} (invalid)", count.raw()).red(),
        };
        println!("  {:<32} {}", count.name(), value);
    }
    println!();

    let gate = if config.stress_scenarios_enabled() {
        "enabled".green()
    } else {
        "disabled on this host".yellow()
    };
    println!("  stress scenarios: {}", gate);

    println!("  driver timeout:   {}", describe_timeout(config.driver_timeout_secs.as_ref()));
    println!("  io timeout:       {}", describe_timeout(config.io_timeout_secs.as_ref()));
}

fn describe_timeout(secs: Option<&Count>) -> String {
    match secs {
        Some(count) => format!("{}s", count.raw()),
        None => "unbounded".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_shows_raw_counts() {
        let mut config = WorkloadConfig::default();
        config
            .apply_env(|name| (name == "TIO_BENCH_TOTAL_FEEDERS").then(|| "lots".to_string()))
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&config_json(&config).unwrap()).unwrap();
        assert_eq!(json["total_feeders"], "lots");
        assert_eq!(json["total_operations"], "1000");
        assert_eq!(json["server_uri"], "tio://localhost:2605");
        assert!(json["driver_timeout_secs"].is_null());
    }

    #[tokio::test]
    async fn test_parse_missing_file() {
        let err = dispatch(
            Commands::Parse {
                file: PathBuf::from("/no/such/report.txt"),
                symbols: false,
            },
            Options::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_parse_saved_report() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.txt");
        std::fs::write(&file, "n=10\r\nMAP abc C:0 R:0 per sec\r\n").unwrap();

        dispatch(
            Commands::Parse {
                file: file.clone(),
                symbols: false,
            },
            Options::default(),
        )
        .await
        .unwrap();

        let err = dispatch(
            Commands::Parse {
                file,
                symbols: true,
            },
            Options::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
