use std::process::ExitCode;

use clap::Parser;
use figment::providers::Env;
use figment::Figment;
use tracing::{error, info};

use crate::app::App;
use crate::cli::Args;
use crate::config::Config;
use crate::logging::setup_logging;

mod app;
mod cache;
mod cli;
mod config;
mod data;
mod hvw;
mod logging;
mod scheduler;
mod state;
mod web;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and setup logging before App::new() so startup logs are
    // never silently dropped.
    let config = match Figment::new().merge(Env::raw()).extract::<Config>() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting hvw"
    );

    let app = match App::new(config).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = app.run().await {
        error!("Application error: {e:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
