use std::time::Duration;

use pagescope_core::error::AppError;
use pagescope_core::traits::{PageRenderer, RenderSession, RenderedPage};

use crate::fetcher::ReqwestFetcher;

/// Renderer that performs no script execution: "rendering" is a plain
/// fetch that follows redirects.
///
/// Useful where no browser is available. Redirect-based auth-wall detection
/// still works, while script-only signals (scroll growth) degrade to
/// negative because [`RenderSession::evaluate`] is unsupported.
#[derive(Clone)]
pub struct HttpRenderer {
    fetcher: ReqwestFetcher,
}

impl HttpRenderer {
    pub fn new(fetcher: ReqwestFetcher) -> Self {
        Self { fetcher }
    }
}

impl PageRenderer for HttpRenderer {
    type Session = HttpSession;

    async fn open(&self) -> Result<HttpSession, AppError> {
        Ok(HttpSession {
            fetcher: self.fetcher.clone(),
        })
    }
}

pub struct HttpSession {
    fetcher: ReqwestFetcher,
}

impl RenderSession for HttpSession {
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, AppError> {
        let (html, resolved_url) = tokio::time::timeout(timeout, self.fetcher.fetch_resolved(url))
            .await
            .map_err(|_| AppError::timeout(timeout))??;
        Ok(RenderedPage { html, resolved_url })
    }

    async fn evaluate(&self, query: &str) -> Result<serde_json::Value, AppError> {
        Err(AppError::RendererError(format!(
            "cannot evaluate '{query}' without a browser"
        )))
    }

    async fn scroll_to_bottom(&self) -> Result<(), AppError> {
        Err(AppError::RendererError(
            "scrolling requires a browser".to_string(),
        ))
    }

    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }
}
