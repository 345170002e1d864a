use std::sync::Arc;

use agent::config::AppConfig;
use agent::scraper::PageScraper;
use agent::worker::WorkerLoop;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::from_default_env()),
        )
        .init();

    let scraper = Arc::new(PageScraper::new());
    let cancellation = CancellationToken::new();

    let mut workers = Vec::new();
    for id in 1..=config.worker_count.get() {
        let worker = WorkerLoop {
            id,
            controller_address: config.controller_address,
            scraper: scraper.clone(),
            cancellation: cancellation.clone(),
        };
        workers.push(tokio::spawn(worker.run()));
    }

    tracing::info!(
        worker_count = config.worker_count.get(),
        controller = %config.controller_address,
        "agent started"
    );

    wait_for_shutdown_signal().await;
    tracing::info!("received shutdown signal, cancelling workers");
    cancellation.cancel();

    for worker in workers {
        let _ = worker.await;
    }
}

/// Resolves once SIGINT or SIGTERM is received, whichever comes first.
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).expect("failed to install sigterm handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl_c handler");
}
