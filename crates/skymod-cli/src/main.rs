//! # skymod CLI entry point
//!
//! Parses arguments, installs the tracing subscriber and runs one
//! registration pass on a single-threaded runtime.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use skymod_cli::{run, verbosity_filter, RunArgs};

/// Add every account matching a search query to a Bluesky moderation list.
///
/// Accounts already on the list are skipped. Known members are kept in a
/// local snapshot file so an interrupted run can be restarted safely.
#[derive(Parser, Debug)]
#[command(name = "skymod", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    args: RunArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(cli.verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(args = ?cli.args, "skymod starting");

    match run(cli.args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
