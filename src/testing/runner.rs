//! Scenario runner implementation
//!
//! Drives a scenario through its states, always tearing the server down,
//! and prints results with the captured driver output for diagnosis.

use std::time::Instant;

use colored::Colorize;

use crate::common::{Error, Result, WorkloadConfig};
use crate::process::{Launcher, ServerGuard};
use crate::report::BenchmarkReport;
use crate::tio::{Connector, SymbolContainer};

use super::scenario::{check_executable, Scenario, ScenarioResult, ScenarioState};

const SKIP_REASON: &str = "non Windows tests disabled (set TIO_BENCH_ALLOW_NON_WINDOWS=1 to force)";

/// State history of one run
struct Progress {
    scenario: Scenario,
    history: Vec<ScenarioState>,
}

impl Progress {
    fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            history: vec![ScenarioState::NotStarted],
        }
    }

    fn advance(&mut self, next: ScenarioState) {
        let current = self.history.last().copied().unwrap_or(ScenarioState::NotStarted);
        tracing::debug!(scenario = %self.scenario, "{} -> {}", current, next);
        self.history.push(next);
    }
}

/// Runs scenarios against one configuration
pub struct ScenarioRunner<'a> {
    config: &'a WorkloadConfig,
    launcher: &'a dyn Launcher,
    connector: &'a dyn Connector,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(
        config: &'a WorkloadConfig,
        launcher: &'a dyn Launcher,
        connector: &'a dyn Connector,
    ) -> Self {
        Self {
            config,
            launcher,
            connector,
        }
    }

    /// Run one scenario to a terminal state
    pub async fn run(&self, scenario: Scenario) -> ScenarioResult {
        let started = Instant::now();
        let mut progress = Progress::new(scenario);
        let mut driver_output = None;

        if scenario.is_stress() && !self.config.stress_scenarios_enabled() {
            tracing::info!(scenario = %scenario, "{}", SKIP_REASON);
            progress.advance(ScenarioState::Skipped);
            return ScenarioResult {
                scenario,
                history: progress.history,
                error: None,
                skip_reason: Some(SKIP_REASON.to_string()),
                driver_output: None,
                elapsed: started.elapsed(),
            };
        }

        let outcome = match scenario {
            Scenario::Preflight => self.preflight(),
            _ => {
                self.stress(scenario, &mut progress, &mut driver_output)
                    .await
            }
        };

        let error = match outcome {
            Ok(()) => {
                progress.advance(ScenarioState::Verified);
                None
            }
            Err(e) => {
                tracing::warn!(scenario = %scenario, "{}: {}", e.kind(), e);
                progress.advance(ScenarioState::Failed);
                Some(e)
            }
        };

        ScenarioResult {
            scenario,
            history: progress.history,
            error,
            skip_reason: None,
            driver_output,
            elapsed: started.elapsed(),
        }
    }

    fn preflight(&self) -> Result<()> {
        for path in [&self.config.tio_path, &self.config.tio_bench_path] {
            let resolved = check_executable(path)?;
            tracing::info!("using {}", resolved.display());
        }
        Ok(())
    }

    /// Server lifetime wraps the driver run and the verification
    async fn stress(
        &self,
        scenario: Scenario,
        progress: &mut Progress,
        driver_output: &mut Option<String>,
    ) -> Result<()> {
        let args = scenario.driver_args(self.config)?;

        let process = self.launcher.launch_server(&self.config.tio_path).await?;
        let mut server = ServerGuard::new("tio server", process);
        progress.advance(ScenarioState::ServerRunning);

        let outcome = self
            .drive_and_verify(scenario, &args, progress, driver_output)
            .await;

        server.terminate().await;
        outcome
    }

    async fn drive_and_verify(
        &self,
        scenario: Scenario,
        args: &[String],
        progress: &mut Progress,
        driver_output: &mut Option<String>,
    ) -> Result<()> {
        let output = self
            .launcher
            .run_driver(&self.config.tio_bench_path, args)
            .await?;
        *driver_output = Some(output.stdout.clone());

        if !output.success() {
            return Err(Error::DriverFailed(output.status));
        }
        progress.advance(ScenarioState::DriverCompleted);

        let report = BenchmarkReport::new(output.stdout);
        match scenario {
            Scenario::DataStress => self.verify_map(&report).await,
            Scenario::FeederStress => self.verify_books(&report).await,
            Scenario::Preflight => Ok(()),
        }
    }

    /// The map container holds exactly `n` records
    async fn verify_map(&self, report: &BenchmarkReport) -> Result<()> {
        let expected = report.map_report()?;

        let mut store = self.connector.connect(&self.config.server_uri).await?;
        let container = store.open(&expected.container).await?;
        let length = store.length(&container).await?;

        tracing::info!(
            container = %expected.container,
            expected = expected.expected,
            observed = length,
            "Checked map container"
        );

        if length != expected.expected {
            return Err(Error::Assertion(format!(
                "container '{}' holds {} records, driver reported n={}",
                expected.container, length, expected.expected
            )));
        }
        Ok(())
    }

    /// book_buy + book_sell over all symbols equals feeders × operations
    async fn verify_books(&self, report: &BenchmarkReport) -> Result<()> {
        let feeders = self.config.total_feeders.get()?;
        let per_feeder = self.config.operations_by_feeder.get()?;
        let expected = feeders.checked_mul(per_feeder).ok_or_else(|| {
            Error::Configuration(format!(
                "{} feeders x {} operations overflows",
                feeders, per_feeder
            ))
        })?;

        let symbols = report.symbols()?;

        let mut store = self.connector.connect(&self.config.server_uri).await?;
        let mut observed: u64 = 0;
        for symbol in &symbols {
            for child in SymbolContainer::ALL {
                let container = store.open(&child.path(symbol)).await?;
                if child.counts_operations() {
                    let length = store.length(&container).await?;
                    tracing::debug!(container = %container.name, length, "Read book");
                    observed = observed.checked_add(length).ok_or_else(|| {
                        Error::Protocol(format!(
                            "record counts overflow at '{}' ({} + {})",
                            container.name, observed, length
                        ))
                    })?;
                }
            }
        }

        tracing::info!(
            symbols = symbols.len(),
            expected,
            observed,
            "Checked order books"
        );

        if observed != expected {
            return Err(Error::Assertion(format!(
                "order books of {} symbol(s) hold {} records, expected {} feeders x {} operations = {}",
                symbols.len(),
                observed,
                feeders,
                per_feeder,
                expected
            )));
        }
        Ok(())
    }
}

/// Results of a suite run
#[derive(Debug, Default)]
pub struct SuiteSummary {
    pub results: Vec<ScenarioResult>,
}

impl SuiteSummary {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.skipped()).count()
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }
}

/// Run scenarios one after another, printing each result
pub async fn run_suite(
    runner: &ScenarioRunner<'_>,
    scenarios: &[Scenario],
    verbose: bool,
) -> SuiteSummary {
    let mut summary = SuiteSummary::default();

    for &scenario in scenarios {
        println!(
            "\n{} {}",
            "Running Scenario:".blue().bold(),
            scenario.name().white().bold()
        );

        let result = runner.run(scenario).await;
        print_result(&result, verbose);
        summary.results.push(result);
    }

    print_summary(&summary);
    summary
}

fn print_result(result: &ScenarioResult, verbose: bool) {
    let elapsed = format!("({:.1}s)", result.elapsed.as_secs_f64());

    match result.state() {
        ScenarioState::Verified => {
            println!("  {} Verified {}", "✓".green(), elapsed.dimmed());
        }
        ScenarioState::Skipped => {
            let reason = result.skip_reason.as_deref().unwrap_or("skipped");
            println!("  {} Skipped: {}", "○".yellow(), reason.dimmed());
        }
        state => {
            let message = result
                .error
                .as_ref()
                .map(|e| format!("{}: {}", e.kind(), e))
                .unwrap_or_else(|| format!("stopped in state '{}'", state));
            println!("  {} {} {}", "✗".red(), message, elapsed.dimmed());
        }
    }

    if let Some(output) = &result.driver_output {
        if verbose || result.failed() {
            println!("\n{}", "Driver output:".cyan());
            for line in output.lines() {
                println!("  {}", line.dimmed());
            }
        }
    }
}

fn print_summary(summary: &SuiteSummary) {
    let line = format!(
        "{} passed, {} failed, {} skipped",
        summary.passed(),
        summary.failed(),
        summary.skipped()
    );

    if summary.success() {
        println!("\n{} {}\n", "✓".green().bold(), line.green().bold());
    } else {
        println!("\n{} {}\n", "✗".red().bold(), line.red().bold());
    }
}
