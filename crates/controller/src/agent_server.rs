//! Accepts framed streams from agent workers: validates the handshake,
//! pushes configuration, then dispatches URLs from whichever session is
//! currently active and routes results back to it.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::protocol::{ControllerMessage, WorkerConfig, WorkerMessage, NOMAD_VERSION};
use net::FramedStream;

use crate::state::ControllerState;

/// Matches what's "currently shipped" per the source.
const DEFAULT_SCRAPE_TIMEOUT_MS: i32 = 100_000;

pub async fn run(listener: net::FramedListener, state: Arc<ControllerState>) {
    loop {
        match listener.accept().await {
            Ok(stream) => {
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_stream(stream, state).await {
                        tracing::warn!(error = %e, "agent stream ended with error");
                    }
                });
            }
            Err(e) => tracing::warn!(error = %e, "failed to accept agent connection"),
        }
    }
}

async fn handle_stream(mut stream: FramedStream, state: Arc<ControllerState>) -> net::Result<()> {
    let peer = stream.peer_addr().ok();

    let first: WorkerMessage = match stream.recv().await {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(?peer, error = %e, "received no handshake");
            return Ok(());
        }
    };

    let handshake = match first {
        WorkerMessage::Handshake(h) => h,
        other => {
            tracing::warn!(?peer, ?other, "first message was not a handshake");
            return Ok(());
        }
    };

    if handshake.nomad_version != NOMAD_VERSION {
        tracing::error!(
            ?peer,
            expected = NOMAD_VERSION,
            got = handshake.nomad_version,
            "worker version mismatch, closing stream"
        );
        return Ok(());
    }

    let worker_id = state.worker_count.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::info!(?peer, worker_id, "agent handshake ok");

    stream
        .send(&ControllerMessage::ConfigUpdate(WorkerConfig {
            worker_id,
            single_scrape_timeout_ms: DEFAULT_SCRAPE_TIMEOUT_MS,
        }))
        .await?;

    let mut session_rx = state.session.subscribe();

    'outer: loop {
        let session = {
            let current = session_rx.borrow().clone();
            match current {
                Some(s) => s,
                None => {
                    if session_rx.changed().await.is_err() {
                        break 'outer;
                    }
                    continue 'outer;
                }
            }
        };

        loop {
            tokio::select! {
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                    continue 'outer;
                }
                url = session.next_url() => {
                    let Some(url) = url else {
                        // Session ended; go back to waiting for a new one.
                        continue 'outer;
                    };

                    let instruction = ControllerMessage::ScrapeInstruction { urls: vec![url] };
                    if let Err(e) = stream.send(&instruction).await {
                        tracing::warn!(worker_id, error = %e, "failed to send scrape instruction");
                        continue;
                    }

                    match stream.recv::<WorkerMessage>().await {
                        Ok(WorkerMessage::Data(data)) => session.push_result(data).await,
                        Ok(other) => tracing::warn!(worker_id, ?other, "unexpected worker message"),
                        Err(e) => {
                            tracing::warn!(worker_id, error = %e, "agent stream recv failed");
                            break 'outer;
                        }
                    }
                }
            }
        }
    }

    let _ = stream.send(&ControllerMessage::Shutdown).await;
    tracing::debug!(worker_id, "agent stream closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::protocol::Handshake;
    use net::FramedListener;

    /// A handshake carrying the wrong protocol version gets the stream
    /// closed with no `ConfigUpdate` ever sent.
    #[tokio::test]
    async fn version_mismatch_closes_stream_without_config() {
        let listener = FramedListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ControllerState::new());

        let server = tokio::spawn(async move {
            let stream = listener.accept().await.unwrap();
            handle_stream(stream, state).await.unwrap();
        });

        let mut client = FramedStream::connect(addr).await.unwrap();
        client
            .send(&WorkerMessage::Handshake(Handshake {
                nomad_version: NOMAD_VERSION + 1,
            }))
            .await
            .unwrap();

        let res: net::Result<ControllerMessage> = client.recv().await;
        assert!(matches!(res, Err(net::Error::Closed) | Err(net::Error::Io(_))));

        server.await.unwrap();
    }
}
