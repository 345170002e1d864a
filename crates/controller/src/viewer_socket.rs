//! Wraps the viewer's websocket with independent read and write mutexes.
//!
//! Concurrent writers (many graph deltas from the session loop) are
//! serialized against each other; the background reader (watching for the
//! "stop this session" signal) is serialized against other readers, but
//! never blocks a writer or vice versa.

use axum::extract::ws::{Message, WebSocket};
use common::graph::{DeltaSink, GraphDelta};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;

pub struct ViewerSocket {
    write: Mutex<SplitSink<WebSocket, Message>>,
    read: Mutex<SplitStream<WebSocket>>,
}

impl ViewerSocket {
    pub fn new(socket: WebSocket) -> Self {
        let (write, read) = socket.split();
        Self {
            write: Mutex::new(write),
            read: Mutex::new(read),
        }
    }

    /// Reads the next text frame and decodes it as JSON. Returns `Ok(None)`
    /// once the client closes the socket.
    pub async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<Option<T>, ReadError> {
        let mut read = self.read.lock().await;
        loop {
            match read.next().await {
                None => return Ok(None),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(serde_json::from_str(&text)?));
                }
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/binary: not part of this protocol
                Some(Err(e)) => return Err(ReadError::Socket(e.to_string())),
            }
        }
    }

    async fn write_text(&self, text: String) {
        let mut write = self.write.lock().await;
        if let Err(e) = write.send(Message::Text(text)).await {
            tracing::warn!(error = %e, "failed to write to viewer socket");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("malformed json frame")]
    Json(#[from] serde_json::Error),
    #[error("socket error: {0}")]
    Socket(String),
}

#[async_trait::async_trait]
impl DeltaSink for ViewerSocket {
    async fn send_delta(&self, delta: GraphDelta) {
        match serde_json::to_string(&delta) {
            Ok(text) => self.write_text(text).await,
            Err(e) => tracing::warn!(error = %e, "failed to serialize graph delta"),
        }
    }
}
