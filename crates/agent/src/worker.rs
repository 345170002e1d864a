//! One worker loop: connect, handshake, run the dispatch loop, reconnect
//! on failure. See SPEC_FULL.md §4.6 for the state machine this
//! implements.

use std::net::SocketAddr;
use std::sync::Arc;

use common::protocol::{ControllerMessage, Handshake, WorkerMessage, NOMAD_VERSION};
use net::retry_strategy::FixedInterval;
use net::FramedStream;
use tokio_util::sync::CancellationToken;

use crate::scraper::PageScraper;

const RECONNECT_SLEEP: std::time::Duration = std::time::Duration::from_secs(3);
const STREAM_ERR_COUNT_THRESHOLD: u32 = 5;

/// Outcome of a single connection attempt's dispatch loop.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Recv/send error threshold exceeded, or connect itself failed:
    /// reconnect after the backoff sleep.
    Reconnect,
    /// Shutdown received, protocol anomaly, or cancellation: stop for
    /// good, no reconnect.
    Fatal,
}

pub struct WorkerLoop {
    pub id: usize,
    pub controller_address: SocketAddr,
    pub scraper: Arc<PageScraper>,
    pub cancellation: CancellationToken,
}

impl WorkerLoop {
    pub async fn run(self) {
        let mut backoff = FixedInterval::new(RECONNECT_SLEEP);

        loop {
            if self.cancellation.is_cancelled() {
                return;
            }

            match self.run_once().await {
                Outcome::Fatal => return,
                Outcome::Reconnect => {
                    let delay = backoff.next().expect("FixedInterval is infinite");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.cancellation.cancelled() => return,
                    }
                }
            }
        }
    }

    async fn run_once(&self) -> Outcome {
        let mut stream = match FramedStream::connect(self.controller_address).await {
            Ok(s) => s,
            Err(e) => {
                tracing::info!(worker = self.id, error = %e, "connect failed, will retry");
                return Outcome::Reconnect;
            }
        };

        let handshake = WorkerMessage::Handshake(Handshake {
            nomad_version: NOMAD_VERSION,
        });
        if let Err(e) = stream.send(&handshake).await {
            tracing::error!(worker = self.id, error = %e, "handshake send failed, not reconnecting");
            return Outcome::Fatal;
        }

        let mut worker_id: i32 = self.id as i32;
        let mut single_scrape_timeout_ms: i32 = 100_000;
        let mut stream_err_count = 0u32;

        loop {
            if self.cancellation.is_cancelled() {
                return Outcome::Fatal;
            }

            let message: ControllerMessage = tokio::select! {
                _ = self.cancellation.cancelled() => return Outcome::Fatal,
                recv = stream.recv() => match recv {
                    Ok(m) => m,
                    Err(e) => {
                        stream_err_count += 1;
                        tracing::warn!(worker = self.id, error = %e, stream_err_count, "recv error");
                        if stream_err_count >= STREAM_ERR_COUNT_THRESHOLD {
                            return Outcome::Reconnect;
                        }
                        continue;
                    }
                },
            };

            match message {
                ControllerMessage::ConfigUpdate(cfg) => {
                    worker_id = cfg.worker_id;
                    single_scrape_timeout_ms = cfg.single_scrape_timeout_ms;
                    tracing::debug!(worker = self.id, worker_id, single_scrape_timeout_ms, "config updated");
                }
                ControllerMessage::ScrapeInstruction { urls } => {
                    for url in urls {
                        let data = self
                            .scraper
                            .scrape(worker_id, &url, single_scrape_timeout_ms)
                            .await;

                        if let Err(e) = stream.send(&WorkerMessage::Data(data)).await {
                            stream_err_count += 1;
                            tracing::warn!(worker = self.id, error = %e, stream_err_count, "send error");
                            break;
                        }
                    }
                }
                ControllerMessage::Shutdown => {
                    tracing::info!(worker = self.id, "received shutdown, not reconnecting");
                    return Outcome::Fatal;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net::FramedListener;

    fn worker_loop(addr: SocketAddr) -> WorkerLoop {
        WorkerLoop {
            id: 1,
            controller_address: addr,
            scraper: Arc::new(PageScraper::new()),
            cancellation: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn reconnect_after_stream_error_threshold() {
        let listener = FramedListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut stream = listener.accept().await.unwrap();
            let _handshake: WorkerMessage = stream.recv().await.unwrap();
            // Drop the connection without ever replying: every subsequent
            // recv on the client side errors until it gives up and
            // reconnects.
        });

        let outcome = worker_loop(addr).run_once().await;
        assert_eq!(outcome, Outcome::Reconnect);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_message_is_fatal() {
        let listener = FramedListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut stream = listener.accept().await.unwrap();
            let _handshake: WorkerMessage = stream.recv().await.unwrap();
            stream.send(&ControllerMessage::Shutdown).await.unwrap();
        });

        let outcome = worker_loop(addr).run_once().await;
        assert_eq!(outcome, Outcome::Fatal);

        server.await.unwrap();
    }
}
