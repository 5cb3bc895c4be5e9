#![doc = include_str!("../README.md")]

mod cli;

use clap::Parser;
use cli::config::{CliArgs, Command, PopulateConfig, SweepConfig};
use cli::redis::RedisStore;
use cli::telemetry::init_telemetry;
use resp_cost::{IdentGenerator, populate};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    let providers = init_telemetry()?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let res = match args.command {
        Command::Populate(args) => match PopulateConfig::try_from(args) {
            Ok(config) => run_populate(config, &cancel).await,
            Err(e) => Err(e),
        },
        Command::Sweep(args) => match SweepConfig::try_from(args) {
            Ok(config) => cli::sweep::run(config, &cancel).await,
            Err(e) => Err(e),
        },
    };

    providers.shutdown();
    res
}

async fn run_populate(config: PopulateConfig, cancel: &CancellationToken) -> anyhow::Result<()> {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Populating {} with {:#?} and {:#?}",
            config.connection,
            config.spec,
            config.run
        );
    } else {
        tracing::info!(
            "Populating {} with {} {} keys on {} workers",
            config.connection,
            config.spec.key_count,
            config.spec.kind,
            config.run.session.loader.num_workers
        );
    }

    let store = Arc::new(RedisStore::connect(&config.connection).await?);
    let idents = IdentGenerator::new(config.run.alphabet);

    let result = populate(store, &config.spec, &idents, &config.run.session, cancel).await;
    cli::record_run(&result);
    let report = result?;

    if let Some(walked) = report.walked_keys {
        tracing::info!("Key space walk saw {walked} distinct keys");
    }
    println!("{}", report.memory);
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Cancelling run...");
    cancel.cancel();
}
