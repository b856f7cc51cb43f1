use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Fetches raw HTML with a direct, non-rendering request.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Markup returned by a renderer after navigation settled.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub html: String,
    /// Final URL after redirects.
    pub resolved_url: String,
}

/// Source of page-renderer sessions (typically a headless browser).
pub trait PageRenderer: Send + Sync + Clone {
    type Session: RenderSession;

    /// Open a fresh session. Each classification request owns exactly one.
    fn open(&self) -> impl Future<Output = Result<Self::Session, AppError>> + Send;
}

/// One live page inside a renderer. Calls act on the page loaded by the
/// most recent [`render`](RenderSession::render).
pub trait RenderSession: Send + Sync {
    /// Navigate and wait for network activity to settle.
    fn render(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<RenderedPage, AppError>> + Send;

    /// Evaluate a script-like query against the loaded page.
    fn evaluate(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<serde_json::Value, AppError>> + Send;

    fn scroll_to_bottom(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Fixed settling delay.
    fn wait(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Release the page. Must be called on every exit path.
    fn close(&self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Remote service that turns a prompt into a proposed extraction schema.
pub trait SchemaInferrer: Send + Sync + Clone {
    /// Sends the prompt and returns the raw model output.
    fn infer(&self, prompt: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}
