use std::net::SocketAddr;
use std::num::NonZeroUsize;

use common::config::{log_level, socket_addr, worker_count, ConfigError};

/// Process-level configuration for the agent binary, loaded once at
/// startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub controller_address: SocketAddr,
    pub worker_count: NonZeroUsize,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            controller_address: socket_addr("NOMAD_CONTROLLER_GRPC_ADDRESS")?,
            worker_count: worker_count("NOMAD_AGENT_WORKER_COUNT")?,
            log_level: log_level("NOMAD_LOG_LEVEL")?,
        })
    }
}
