//! Conference companion
//!
//! Entry point for the `companion` CLI.

use clap::Parser;
use conference_companion::{cli::Cli, logging::init_logging, run_app};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run_app(cli).await {
        Ok(output) => {
            let output = output.trim_end();
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}
