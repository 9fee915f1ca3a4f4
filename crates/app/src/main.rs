//! Tether command-line client.

mod cli;
mod commands;
mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tether_application::AppClient;
use tether_infrastructure::{FileUserStorage, ReqwestTransport, SystemClock};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            if error.needs_login() {
                eprintln!("hint: run `tether login` first");
            }
            ExitCode::FAILURE
        }
    }
}

/// Failures of the binary as a whole.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Settings(#[from] settings::SettingsError),

    #[error(transparent)]
    Session(#[from] tether_application::SessionError),

    #[error(transparent)]
    Transport(#[from] tether_application::ports::TransportError),

    #[error(transparent)]
    Command(#[from] commands::CommandError),

    #[error("failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

impl AppError {
    const fn needs_login(&self) -> bool {
        match self {
            Self::Session(error) => error.needs_login(),
            Self::Command(error) => error.needs_login(),
            _ => false,
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = settings::load(&cli)?;
    let storage_path = settings::storage_path(&config)?;
    tracing::debug!(
        base_url = %config.base_url,
        app_id = %config.client_app_id,
        storage = %storage_path.display(),
        "starting tether v{}",
        env!("CARGO_PKG_VERSION")
    );

    let client = AppClient::new(
        &config,
        Arc::new(ReqwestTransport::new()?),
        Arc::new(FileUserStorage::new(storage_path)),
        Arc::new(SystemClock::new()),
    )
    .await?;

    let output = commands::run(&client, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
