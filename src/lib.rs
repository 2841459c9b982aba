//! Conference companion command-line app
//!
//! The binary wires the workspace crates together: the REST client and
//! session store, the query cache, the screen logic in `app-core` and the
//! routing and theme in `app-ui`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;

pub use app::Companion;
pub use cli::{Cli, Commands};
pub use config::AppConfig;

use anyhow::Result;

/// Load the configuration, open the companion and run the command
pub async fn run_app(cli: Cli) -> Result<String> {
    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(cli.api_url, cli.data_dir);
    let mut companion = Companion::open(&config).await?.with_config_file(cli.config);
    companion.run(cli.command, chrono::Utc::now()).await
}
