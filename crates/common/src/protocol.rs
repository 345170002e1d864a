//! Wire types shared by the controller and the agent: the agent-stream
//! handshake/dispatch/result protocol (bincode, over `net::FramedStream`)
//! and the viewer-facing `SessionConfig` (JSON, over the websocket).

use serde::{Deserialize, Serialize};

use crate::duration::Duration;

/// Bumped whenever `WorkerMessage`/`ControllerMessage` change in an
/// incompatible way. The controller rejects any agent whose handshake
/// carries a different value.
pub const NOMAD_VERSION: u64 = 1;

/// Sent by the agent worker as the first frame on a new stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Handshake {
    pub nomad_version: u64,
}

/// Client -> server frames on the agent work stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WorkerMessage {
    Handshake(Handshake),
    Data(ScrapedData),
}

/// Server -> client frames on the agent work stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ControllerMessage {
    ConfigUpdate(WorkerConfig),
    ScrapeInstruction { urls: Vec<String> },
    Shutdown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerConfig {
    pub worker_id: i32,
    pub single_scrape_timeout_ms: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UrlRequestErrorCode {
    None,
    FetchFailed,
    NonOkStatus,
    ParseFailed,
    Timeout,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeMetrics {
    pub response_size_bytes: u64,
    pub http_status_code: u16,
    pub num_found_urls: u32,
    pub scrape_duration_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapedData {
    pub agent_id: i32,
    pub scraped_url: String,
    pub found_urls: Vec<String>,
    pub metrics: ScrapeMetrics,
    pub error: UrlRequestErrorCode,
}

/// The per-viewer-session config sent as the first JSON frame on the
/// websocket. `runtime` and `http_client_timeout` are carried for parity
/// with the wire format but are advisory only (unused by the core).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub runtime: Option<Duration>,
    #[serde(default)]
    pub http_client_timeout: Option<Duration>,
    #[serde(default)]
    pub worker_cooldown: Option<Duration>,
    pub worker_count: u32,
    pub initial_urls: Vec<String>,
    #[serde(default)]
    pub random_crawl: bool,
}
