mod cli;
mod client;
mod commands;
mod error;
mod output;

use clap::Parser;
use cli::Command;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    let _ = dotenvy::dotenv(); // load .env if present
    let cli = cli::Cli::parse();

    // Initialize tracing
    let filter = cli
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(page_url) = &cli.page_url {
        info!(page = %page_url, "arrived through link");
    }

    // Shared cancellation token + signal handlers.
    let cancel = setup_signal_handlers();

    if let Err(e) = run(&cli, cancel).await {
        tracing::error!(error = %e, "autostake failed");
        std::process::exit(1);
    }
}

async fn run(cli: &cli::Cli, cancel: CancellationToken) -> Result<(), AppError> {
    let work = async {
        match &cli.command {
            Command::Packages => commands::packages(cli).await,
            Command::Allowance(args) => commands::allowance(cli, args).await,
            Command::Approve => commands::approve(cli).await,
            Command::Buy(args) => commands::buy(cli, args).await,
            Command::Link(args) => commands::link(cli, args).await,
            Command::Watch(args) => commands::watch(cli, args, cancel.clone()).await,
        }
    };

    tokio::select! {
        result = work => result,
        _ = cancel.cancelled(), if !matches!(cli.command, Command::Watch(_)) => Err(AppError::Cancelled),
    }
}

/// Register SIGINT and SIGTERM handlers that trigger the returned token.
fn setup_signal_handlers() -> CancellationToken {
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received SIGINT, shutting down");
        cancel_clone.cancel();
    });

    #[cfg(unix)]
    {
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            let mut sig = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
            sig.recv().await;
            info!("received SIGTERM, shutting down");
            cancel_clone.cancel();
        });
    }

    cancel
}
