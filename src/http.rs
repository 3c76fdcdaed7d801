//! Outbound HTTP transport.
//!
//! Adapters never talk to `reqwest` directly; they go through [`PageFetcher`]
//! so listing and article parsing can be exercised against canned HTML.
//!
//! Requests carry a fixed browser-like header set, are bounded by the
//! configured timeout and are never retried.

use crate::config::HttpConfig;
use crate::errors::{IngestError, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Fetches a page body as text.
pub trait PageFetcher {
    /// GET `url` and return the body; non-2xx statuses are errors.
    async fn get_text(&self, url: &str) -> Result<String>;
}

/// [`PageFetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, header_value(&config.accept)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|e| IngestError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn header_value(v: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(v).map_err(|e| IngestError::Config(format!("invalid header value '{v}': {e}")))
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn get_text(&self, url: &str) -> Result<String> {
        let t0 = Instant::now();
        let res = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IngestError::transport(url, e))?;
        let body = res.text().await.map_err(|e| IngestError::transport(url, e))?;
        let dt = t0.elapsed();

        if body.is_empty() {
            warn!(elapsed_ms = dt.as_millis() as u64, "Empty response body");
        } else {
            debug!(bytes = body.len(), elapsed_ms = dt.as_millis() as u64, "Fetched page");
        }
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned bodies by URL and records every request.
    #[derive(Debug, Default)]
    pub struct CannedFetcher {
        pages: HashMap<String, String>,
        pub requests: RefCell<Vec<String>>,
    }

    impl CannedFetcher {
        pub fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }
    }

    impl PageFetcher for CannedFetcher {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| IngestError::transport(url, "404 Not Found"))
        }
    }
}
