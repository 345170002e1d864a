//! The page scraper: fetches a URL over HTTP, extracts `<a href>` links as
//! absolute URLs, and reports byte/timing metrics. Stands in for a real
//! headless-browser renderer, which is out of scope -- JS-rendered links
//! are not discovered.

use std::time::{Duration, Instant};

use common::protocol::{ScrapeMetrics, ScrapedData, UrlRequestErrorCode};
use scraper::{Html, Selector};
use thiserror::Error;

/// A handful of realistic desktop user agents, rotated per-request so a
/// target site doesn't see every fetch come from the literal same UA
/// string.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
];

#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed")]
    FetchFailed,
    #[error("non-ok status")]
    NonOkStatus,
    #[error("could not parse url")]
    ParseFailed,
}

impl FetchError {
    fn code(&self) -> UrlRequestErrorCode {
        match self {
            FetchError::FetchFailed => UrlRequestErrorCode::FetchFailed,
            FetchError::NonOkStatus => UrlRequestErrorCode::NonOkStatus,
            FetchError::ParseFailed => UrlRequestErrorCode::ParseFailed,
        }
    }
}

pub struct PageScraper {
    client: reqwest::Client,
}

impl PageScraper {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetches `url`, bounded by `timeout_ms`, and returns a `ScrapedData`
    /// describing the outcome. Never returns an `Err` -- failures are
    /// encoded in `ScrapedData::error` per the page-scraper contract.
    pub async fn scrape(&self, agent_id: i32, url: &str, timeout_ms: i32) -> ScrapedData {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms.max(0) as u64);

        let outcome = tokio::time::timeout(timeout, self.fetch_and_extract(url)).await;
        let scrape_duration_ms = start.elapsed().as_millis() as u32;

        match outcome {
            Ok(Ok((found_urls, status, bytes))) => ScrapedData {
                agent_id,
                scraped_url: url.to_string(),
                metrics: ScrapeMetrics {
                    response_size_bytes: bytes,
                    http_status_code: status,
                    num_found_urls: found_urls.len() as u32,
                    scrape_duration_ms,
                },
                found_urls,
                error: UrlRequestErrorCode::None,
            },
            Ok(Err(e)) => ScrapedData {
                agent_id,
                scraped_url: url.to_string(),
                found_urls: Vec::new(),
                metrics: ScrapeMetrics {
                    scrape_duration_ms,
                    ..Default::default()
                },
                error: e.code(),
            },
            Err(_elapsed) => ScrapedData {
                agent_id,
                scraped_url: url.to_string(),
                found_urls: Vec::new(),
                metrics: ScrapeMetrics {
                    scrape_duration_ms,
                    ..Default::default()
                },
                error: UrlRequestErrorCode::Timeout,
            },
        }
    }

    async fn fetch_and_extract(&self, url: &str) -> Result<(Vec<String>, u16, u64), FetchError> {
        let ua = USER_AGENTS[rand::random::<usize>() % USER_AGENTS.len()];

        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, ua)
            .send()
            .await
            .map_err(|_| FetchError::FetchFailed)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::NonOkStatus);
        }
        let status_code = status.as_u16();

        let body = resp.bytes().await.map_err(|_| FetchError::FetchFailed)?;
        let bytes_len = body.len() as u64;
        let text = String::from_utf8_lossy(&body).into_owned();

        let base = url::Url::parse(url).map_err(|_| FetchError::ParseFailed)?;
        let found = extract_links(&text, &base);

        Ok((found, status_code, bytes_len))
    }
}

impl Default for PageScraper {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts every `<a href>` whose resolved scheme is http(s), as absolute
/// URLs resolved against `base`. Relative hrefs, `mailto:`, `javascript:`,
/// and anything else that fails to resolve are silently skipped.
fn extract_links(html: &str, base: &url::Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector is valid");

    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|resolved| resolved.scheme() == "http" || resolved.scheme() == "https")
        .map(|resolved| resolved.to_string())
        .collect()
}
