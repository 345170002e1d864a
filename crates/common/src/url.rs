//! URL normalization helpers.
//!
//! The frontier only ever stores host roots (`scheme://host`, no path);
//! the graph only ever tracks bare hostnames. These two projections are
//! used throughout the controller and the agent.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("could not parse url: {0}")]
    Parse(#[from] ::url::ParseError),

    #[error("url has no host")]
    NoHost,
}

/// The bare hostname of a URL, e.g. `https://example.com/a/b` -> `example.com`.
pub fn hostname(raw: &str) -> Result<String, UrlError> {
    let parsed = ::url::Url::parse(raw)?;
    parsed.host_str().map(str::to_owned).ok_or(UrlError::NoHost)
}

/// The `scheme://host` prefix of a URL, dropping path/query/fragment/port.
///
/// e.g. `https://example.com/a/b?c=1#d` -> `https://example.com`.
pub fn host_root(raw: &str) -> Result<String, UrlError> {
    let parsed = ::url::Url::parse(raw)?;
    let host = parsed.host_str().ok_or(UrlError::NoHost)?;
    Ok(format!("{}://{}", parsed.scheme(), host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_root_strips_path_query_fragment() {
        assert_eq!(
            host_root("https://x.com/a/b?c=1#d").unwrap(),
            "https://x.com"
        );
    }

    #[test]
    fn hostname_extracts_bare_host() {
        assert_eq!(hostname("https://x.com").unwrap(), "x.com");
    }

    #[test]
    fn host_root_is_idempotent() {
        let once = host_root("https://x.com/a/b?c=1#d").unwrap();
        let twice = host_root(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn hostname_of_host_root_matches_hostname_of_original() {
        let u = "https://x.com/a/b?c=1#d";
        assert_eq!(hostname(&host_root(u).unwrap()).unwrap(), hostname(u).unwrap());
    }

    #[test]
    fn rejects_unparsable_url() {
        assert!(host_root("not a url").is_err());
    }
}
