//! Shared environment-variable configuration helpers.
//!
//! Both binaries load a small `AppConfig` at startup from env vars; this
//! module holds the parsing helpers common to both so that a missing or
//! malformed variable always produces the same kind of `ConfigError`.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Reads a required env var and parses it with `FromStr`.
pub fn required<T: FromStr>(name: &'static str) -> Result<T, ConfigError> {
    let raw = std::env::var(name).map_err(|_| ConfigError::Missing(name))?;
    raw.parse()
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}

/// Reads an optional env var, falling back to `default` when unset.
/// A value that's set but fails to parse is still an error.
pub fn optional<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

pub fn socket_addr(name: &'static str) -> Result<SocketAddr, ConfigError> {
    required(name)
}

pub fn worker_count(name: &'static str) -> Result<NonZeroUsize, ConfigError> {
    optional(name, NonZeroUsize::new(1).unwrap())
}

/// `NOMAD_LOG_LEVEL`'s four accepted values, falling back to `info`.
pub fn log_level(name: &'static str) -> Result<String, ConfigError> {
    let level = optional::<String>(name, "info".to_string())?;
    match level.as_str() {
        "debug" | "info" | "warn" | "error" => Ok(level),
        _ => Err(ConfigError::Invalid {
            name,
            value: level,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_falls_back_to_default_when_unset() {
        std::env::remove_var("NOMAD_TEST_UNSET_VAR");
        let v = optional("NOMAD_TEST_UNSET_VAR", 7u32).unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        std::env::set_var("NOMAD_TEST_LOG_LEVEL", "verbose");
        assert!(log_level("NOMAD_TEST_LOG_LEVEL").is_err());
        std::env::remove_var("NOMAD_TEST_LOG_LEVEL");
    }

    #[test]
    fn valid_log_level_passes_through() {
        std::env::set_var("NOMAD_TEST_LOG_LEVEL_2", "debug");
        assert_eq!(log_level("NOMAD_TEST_LOG_LEVEL_2").unwrap(), "debug");
        std::env::remove_var("NOMAD_TEST_LOG_LEVEL_2");
    }
}
