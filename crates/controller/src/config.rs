use std::net::SocketAddr;

use common::config::{log_level, socket_addr, ConfigError};

/// Process-level configuration for the controller binary, loaded once at
/// startup. Distinct from `common::protocol::SessionConfig`, which arrives
/// per-viewer-connection and configures a crawl run, not the process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub agent_address: SocketAddr,
    pub http_address: SocketAddr,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            agent_address: socket_addr("NOMAD_CONTROLLER_GRPC_ADDRESS")?,
            http_address: socket_addr("NOMAD_CONTROLLER_HTTP_ADDRESS")?,
            log_level: log_level("NOMAD_LOG_LEVEL")?,
        })
    }
}
