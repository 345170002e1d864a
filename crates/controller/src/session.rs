//! Binds a single viewer socket to a crawl run: owns the frontier, the
//! graph emitter, and the in-process channels that connect the agent
//! server's dispatch loop to the feeder and the result-ingest loop.
//!
//! One `Session` per viewer connection; only one is active at a time (see
//! the "replacing global viewer binding" design note) -- `ControllerState`
//! holds the currently-active one behind a `watch` channel so agent
//! streams can observe a new session replacing the old.

use std::sync::Arc;
use std::time::Duration;

use common::frontier::Frontier;
use common::graph::{DeltaSink, GraphEmitter};
use common::protocol::{ScrapedData, SessionConfig};
use common::{host_root, hostname};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::viewer_socket::ViewerSocket;

/// Fixed per the source: the controller never tracks which worker
/// actually handles a given dispatch at the feeder/ingest layer, so every
/// notification claims worker 1. See DESIGN.md ("worker id in
/// notifications").
const FEEDER_WORKER_ID: u32 = 1;

pub struct Session<S: DeltaSink = Arc<ViewerSocket>> {
    frontier: Frontier,
    emitter: GraphEmitter<S>,
    urls_to_scrape_tx: mpsc::Sender<String>,
    urls_to_scrape_rx: Mutex<mpsc::Receiver<String>>,
    outputs_tx: mpsc::Sender<ScrapedData>,
    outputs_rx: Mutex<mpsc::Receiver<ScrapedData>>,
    pub cancellation: CancellationToken,
}

impl<S: DeltaSink + 'static> Session<S> {
    pub fn new(config: &SessionConfig, socket: S) -> Arc<Self> {
        let frontier = Frontier::new(config.random_crawl);
        for initial_url in &config.initial_urls {
            match host_root(initial_url) {
                Ok(root) => {
                    frontier.add_url(root);
                }
                Err(e) => tracing::warn!(url = %initial_url, error = %e, "bad initial url"),
            }
        }

        let (urls_to_scrape_tx, urls_to_scrape_rx) = mpsc::channel(1);
        let (outputs_tx, outputs_rx) = mpsc::channel(1);

        Arc::new(Self {
            frontier,
            emitter: GraphEmitter::new(socket),
            urls_to_scrape_tx,
            urls_to_scrape_rx: Mutex::new(urls_to_scrape_rx),
            outputs_tx,
            outputs_rx: Mutex::new(outputs_rx),
            cancellation: CancellationToken::new(),
        })
    }

    /// Called by an agent stream to obtain the next URL to scrape.
    pub async fn next_url(&self) -> Option<String> {
        self.urls_to_scrape_rx.lock().await.recv().await
    }

    /// Called by an agent stream once it has a result.
    pub async fn push_result(&self, data: ScrapedData) {
        let _ = self.outputs_tx.send(data).await;
    }

    /// Spawns the feeder task and runs the result-ingest loop until the
    /// session is cancelled or the output channel closes (all senders
    /// dropped).
    pub async fn run(self: Arc<Self>) {
        let feeder = tokio::spawn(self.clone().feed_workers());

        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => break,
                result = async { self.outputs_rx.lock().await.recv().await } => {
                    match result {
                        Some(data) => self.ingest(data).await,
                        None => break,
                    }
                }
            }
        }

        feeder.abort();
    }

    async fn feed_workers(self: Arc<Self>) {
        loop {
            if self.cancellation.is_cancelled() {
                return;
            }

            match self.frontier.pop_url() {
                Some(url) => {
                    if let Ok(host) = hostname(&url) {
                        self.emitter.notify_start_crawl(FEEDER_WORKER_ID, &host).await;
                    }
                    if self.urls_to_scrape_tx.send(url).await.is_err() {
                        return;
                    }
                }
                None => {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn ingest(&self, data: ScrapedData) {
        tracing::debug!(url = %data.scraped_url, found = data.found_urls.len(), "ingesting scrape result");

        let scraped_host = match hostname(&data.scraped_url) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(url = %data.scraped_url, error = %e, "could not get scraped url hostname");
                return;
            }
        };

        for found_url in &data.found_urls {
            let found_host = match hostname(found_url) {
                Ok(h) => h,
                Err(_) => continue,
            };
            if found_host == scraped_host {
                continue;
            }
            let root = match host_root(found_url) {
                Ok(r) => r,
                Err(_) => continue,
            };
            if self.frontier.add_url(root) {
                self.emitter.add_hostname_connection(&scraped_host, &found_host).await;
            }
        }

        let dead_end = data.found_urls.is_empty();
        self.emitter
            .notify_end_crawl(FEEDER_WORKER_ID, &scraped_host, dead_end)
            .await;
    }
}
