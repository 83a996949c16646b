//! The HTTP fetcher: a single `reqwest` client configured once at startup,
//! wrapped in the retry/classification policy `spec.md` §4.3 requires.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crawler_core::{CanonicalUrl, FetchResponse};

const MAX_ATTEMPTS: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);
const USER_AGENT: &str = "crawler";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Transient(String),
    #[error("{0}")]
    Fatal(String),
}

pub struct FetcherConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        FetcherConfig {
            connect_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(20),
            write_timeout: Duration::from_secs(5),
            max_redirects: 5,
        }
    }
}

/// Wraps one `reqwest::Client`. `reqwest` has no separate read/write
/// timeout knobs, so the request-level budget is `read_timeout +
/// write_timeout`; `connect_timeout` covers the TCP/TLS handshake alone.
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(config: &FetcherConfig) -> anyhow::Result<Fetcher> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout + config.write_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        Ok(Fetcher { client })
    }

    /// Fetches `url` with the given extra headers, retrying transient
    /// failures up to `MAX_ATTEMPTS` total attempts with a fixed backoff.
    /// Fatal failures never retry.
    pub async fn fetch(&self, url: &CanonicalUrl, extra_headers: &[(&str, &str)]) -> Result<FetchResponse, FetchError> {
        let mut last_err = FetchError::Transient("exhausted retries without a response".to_string());
        for attempt in 1..=MAX_ATTEMPTS {
            match self.fetch_once(url, extra_headers).await {
                Ok(resp) => return Ok(resp),
                Err(FetchError::Fatal(msg)) => {
                    warn!(url = %url, error = %msg, "fatal fetch error");
                    return Err(FetchError::Fatal(msg));
                }
                Err(transient) => {
                    debug!(url = %url, attempt, "retrying after transient error");
                    last_err = transient;
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_BACKOFF).await;
                    }
                }
            }
        }
        Err(last_err)
    }

    async fn fetch_once(&self, url: &CanonicalUrl, extra_headers: &[(&str, &str)]) -> Result<FetchResponse, FetchError> {
        let mut builder = self.client.get(url.to_string());
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }

        let response = builder.send().await.map_err(classify_error)?;

        let status = response.status().as_u16();
        let final_url = CanonicalUrl::parse(response.url().as_str()).unwrap_or_else(|_| url.clone());

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), v.to_string());
            }
        }

        let body = response.bytes().await.map_err(classify_error)?;

        Ok(FetchResponse {
            requested_url: url.clone(),
            final_url,
            status,
            headers,
            body: body.to_vec(),
            fetched_at: chrono::Utc::now(),
        })
    }
}

/// Transient: connect/timeout/network errors, retried. Fatal: TLS,
/// response decoding, and redirect-budget errors, never retried.
fn classify_error(err: reqwest::Error) -> FetchError {
    if err.is_decode() {
        return FetchError::Fatal(format!("decode error: {err}"));
    }
    if err.is_redirect() {
        return FetchError::Fatal(format!("redirect budget exceeded: {err}"));
    }
    if err.is_builder() {
        return FetchError::Fatal(format!("request build error: {err}"));
    }
    let msg = err.to_string().to_ascii_lowercase();
    if msg.contains("tls") || msg.contains("certificate") || msg.contains("ssl") {
        return FetchError::Fatal(format!("tls error: {err}"));
    }
    FetchError::Transient(err.to_string())
}
