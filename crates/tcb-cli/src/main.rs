//! `tcb` binary: logging setup and command dispatch

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tcb_cli::Cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log filter variable
const LOG_ENV: &str = "TCB_LOG";

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().compact().with_writer(std::io::stderr)))
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.log_json) {
        eprintln!("failed to initialise logging: {err}");
    }

    let mut stdout = std::io::stdout();
    match tcb_cli::run(cli, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            ExitCode::FAILURE
        }
    }
}
