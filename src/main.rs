use std::process::ExitCode;

use clap::Parser;
use config::Config;
use tracing_subscriber::EnvFilter;

mod config;
mod sim;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::parse();

    match sim::run(&config) {
        Ok(report) => {
            tracing::info!(%report, "simulation finished");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(%error, "simulation failed");
            ExitCode::FAILURE
        }
    }
}
