use std::time::Duration;

use pagescope_core::error::AppError;
use pagescope_core::traits::Fetcher;
use reqwest::Client;

/// Desktop Chrome user agent. Many listing sites serve a stripped page to
/// unknown agents, which would skew the raw-versus-rendered comparison.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Pages are cut to this many bytes before any parsing.
pub const DEFAULT_MAX_PAGE_BYTES: usize = 3 * 1024 * 1024;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Direct (non-rendering) HTTP fetcher using reqwest.
///
/// Follows redirects and reports the final URL through
/// [`fetch_resolved`](Self::fetch_resolved). Bodies are streamed and cut at
/// `max_page_bytes`; the rest of an oversized page is never downloaded.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
    max_page_bytes: usize,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
        })
    }

    pub fn with_max_page_bytes(mut self, max_page_bytes: usize) -> Self {
        self.max_page_bytes = max_page_bytes;
        self
    }

    /// Body and final URL after redirects.
    pub async fn fetch_resolved(&self, url: &str) -> Result<(String, String), AppError> {
        let mut response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::timeout(self.timeout)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {url}",
                status.as_u16()
            )));
        }

        let resolved = response.url().to_string();
        let mut bytes = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?
        {
            let room = self.max_page_bytes - bytes.len();
            if chunk.len() > room {
                bytes.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        if truncated {
            tracing::warn!(%url, max_bytes = self.max_page_bytes, "Page exceeds size cap, truncated");
        }
        let body = cap_markup(String::from_utf8_lossy(&bytes).into_owned(), self.max_page_bytes);

        tracing::debug!(%url, %resolved, bytes = body.len(), "Fetched page");
        Ok((body, resolved))
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.fetch_resolved(url).await.map(|(body, _)| body)
    }
}

/// Cut `html` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn cap_markup(mut html: String, max_bytes: usize) -> String {
    if html.len() > max_bytes {
        let mut end = max_bytes;
        while !html.is_char_boundary(end) {
            end -= 1;
        }
        html.truncate(end);
    }
    html
}
