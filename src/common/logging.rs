//! Logging and tracing configuration
//!
//! The harness logs to stderr so that captured driver output printed on
//! stdout stays readable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies; `verbose`
/// raises the crate level to DEBUG.
pub fn init_cli(verbose: bool) {
    let default_directive = if verbose {
        "tiobench_harness=debug,warn"
    } else {
        "tiobench_harness=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing for tests; safe to call more than once
pub fn init_test() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("tiobench_harness=debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}
