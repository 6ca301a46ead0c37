// src/main.rs

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::InstallOptions;

const EXIT_FAILURE: u8 = 1;
const EXIT_CANCELLED: u8 = 2;

async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    match cli.command {
        Commands::Restore {
            path,
            packages_directory,
            solution_directory,
            save_mode,
            source,
        } => {
            commands::cmd_restore(
                path.as_deref(),
                packages_directory.as_deref(),
                solution_directory.as_deref(),
                save_mode.as_deref(),
                &source,
                cancel,
            )
            .await
        }
        Commands::Install {
            id,
            version,
            prerelease,
            include_unlisted,
            dependency_version,
            output_directory,
            solution_directory,
            save_mode,
            source,
        } => {
            let options = InstallOptions {
                version: version.as_deref(),
                prerelease,
                include_unlisted,
                dependency_version: dependency_version.as_deref(),
                output_directory: output_directory.as_deref(),
                solution_directory: solution_directory.as_deref(),
                save_mode: save_mode.as_deref(),
            };
            commands::cmd_install(&id, options, &source, cancel).await
        }
        Commands::Update { source, .. } => commands::cmd_update_self(&source, cancel).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    match run(cli, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let cancelled = e
                .downcast_ref::<nupack::Error>()
                .is_some_and(nupack::Error::is_cancelled);
            if cancelled {
                error!("Cancelled");
                ExitCode::from(EXIT_CANCELLED)
            } else {
                error!("{:#}", e);
                ExitCode::from(EXIT_FAILURE)
            }
        }
    }
}
