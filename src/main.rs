// Entrypoint for the CLI application.
// - Usage errors are settled before configuration is loaded, so a bad
//   command line never reaches the network.
// - Logs go to stderr; stdout only carries results.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gtr_submit::api::ApiClient;
use gtr_submit::cli::{exit_with_usage, Cli};
use gtr_submit::config::Config;
use gtr_submit::dispatch::{Dispatcher, RunStatus};

fn main() -> anyhow::Result<()> {
    let invocation = match Cli::parse().resolve() {
        Ok(invocation) => invocation,
        Err(err) => exit_with_usage(err),
    };

    // Load .env if present
    let _ = dotenvy::dotenv();
    let config = Config::from_env(invocation.timeout)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let api = ApiClient::new(&config)?;
    let mut dispatcher =
        Dispatcher::new(api, std::io::stdout().lock()).keep_going(invocation.keep_going);

    match dispatcher.run(invocation.action, invocation.mode, &invocation.data)? {
        RunStatus::Completed => Ok(()),
        RunStatus::EntriesFailed(n) => {
            tracing::warn!(failed = n, "batch finished with failed entries");
            std::process::exit(1)
        }
    }
}
