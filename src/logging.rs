//! Logging setup
//!
//! Structured logging goes through `tracing` and is written to stderr so
//! that command output on stdout stays clean. The filter is chosen in this
//! order:
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (errors only) or `-v`/`-vv`/`-vvv`
//! 3. Default: warnings

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber from the CLI verbosity flags
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(verbose: u8, quiet: bool) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::default().add_directive(determine_level(verbose, quiet).into()),
    };

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .try_init();

    if result.is_ok() {
        tracing::debug!(verbose, quiet, "logging initialized");
    }
}

fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}
