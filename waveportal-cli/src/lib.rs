pub mod cli;
pub mod config;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::{load_or_default, CliConfig};
use std::sync::Arc;
use tokio::{signal, sync::broadcast::error::RecvError};
use waveportal_connector::{Record, WavePortal};

/// The main entry point for the `waveportal` binary.
/// This function handles CLI parsing, configuration, logging and dispatch.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch(args) => {
            let config = load_config_from_cli(args.config.as_deref())?;
            let portal = start(&config)?;
            let outcome = watch(&portal).await;
            portal.shutdown().await;
            outcome
        }
        Commands::Wave(cmd) => {
            let config = load_config_from_cli(cmd.config.config.as_deref())?;
            let portal = start(&config)?;
            let outcome = wave(&portal, &cmd.message).await;
            portal.shutdown().await;
            outcome
        }
    }
}

fn load_config_from_cli(path: Option<&str>) -> Result<CliConfig> {
    match path {
        Some(path) => println!("Loading configuration from '{}'", path),
        None => println!("No config file provided, using default settings."),
    }
    load_or_default(path)
}

fn start(config: &CliConfig) -> Result<WavePortal> {
    waveportal_logger::init(&config.log)?;
    tracing::debug!("Configuration loaded: {:#?}", config);
    Ok(WavePortal::from_config(Arc::new(config.connector.clone())))
}

fn print_record(index: usize, record: &Record) {
    println!(
        "#{:<4} {} {}: {}",
        index + 1,
        record.occurred_at.to_rfc3339(),
        record.author,
        record.message
    );
}

/// Connects, prints the current ledger and then every new wave until Ctrl+C.
async fn watch(portal: &WavePortal) -> Result<()> {
    let mut notices = portal.notices();
    let account = portal.connect().await.context("Failed to connect the wallet")?;
    println!("Connected as {}", account);

    let mut view_rx = portal.watch_ledger();
    let mut printed = 0;

    loop {
        let view = view_rx.borrow_and_update().clone();
        if view.len() < printed {
            // The view was replaced by a fresh read; print it from the top.
            printed = 0;
        }
        if printed == 0 {
            println!("{} wave(s) on the ledger", view.total);
        }
        for (index, record) in view.records.iter().enumerate().skip(printed) {
            print_record(index, record);
        }
        printed = view.len();

        tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(err) = result {
                    tracing::error!(error = %err, "Failed to listen for shutdown signal.");
                }
                tracing::info!("Received Ctrl+C, shutting down...");
                return Ok(());
            }
            changed = view_rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            notice = notices.recv() => match notice {
                Ok(notice) => eprintln!("{}", notice),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notice receiver lagged behind.");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

/// Connects, sends a single wave and waits for its confirmation.
async fn wave(portal: &WavePortal, message: &str) -> Result<()> {
    let account = portal.connect().await.context("Failed to connect the wallet")?;
    println!("Connected as {}", account);

    let confirmation = portal
        .submit_message(message)
        .await
        .context("Failed to send the wave")?;
    println!(
        "Wave confirmed in {} at {}",
        confirmation.handle,
        confirmation.confirmed_at.to_rfc3339()
    );
    Ok(())
}
