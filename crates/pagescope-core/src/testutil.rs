//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::traits::{Fetcher, PageRenderer, RenderSession, RenderedPage, SchemaInferrer};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    /// The first `times` calls return `html`; later calls fall back to the
    /// default body.
    pub fn repeating(html: &str, times: usize) -> Self {
        Self::with_responses((0..times).map(|_| Ok(html.to_string())).collect())
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// Scripted behaviour of the single page a [`MockRenderer`] serves.
#[derive(Default)]
pub struct MockPage {
    pub open_error: Option<AppError>,
    pub render: Option<Result<RenderedPage, AppError>>,
    /// Queue of `evaluate` results, popped front first.
    pub evaluations: Vec<Result<serde_json::Value, AppError>>,
    pub scroll_error: Option<AppError>,
    /// Make `evaluate` hang so step timeouts fire.
    pub hang_on_evaluate: bool,
    pub calls: Vec<String>,
    pub closed: usize,
}

/// Mock renderer whose sessions all share one scripted [`MockPage`].
#[derive(Clone, Default)]
pub struct MockRenderer {
    state: Arc<Mutex<MockPage>>,
}

impl MockRenderer {
    /// A page that renders `html` at `resolved_url` and reports no scroll growth.
    pub fn page(html: &str, resolved_url: &str) -> Self {
        let page = MockPage {
            render: Some(Ok(RenderedPage {
                html: html.to_string(),
                resolved_url: resolved_url.to_string(),
            })),
            evaluations: vec![Ok(serde_json::json!(800)), Ok(serde_json::json!(800))],
            ..Default::default()
        };
        Self::from_page(page)
    }

    pub fn from_page(page: MockPage) -> Self {
        Self {
            state: Arc::new(Mutex::new(page)),
        }
    }

    pub fn failing_open(error: AppError) -> Self {
        Self::from_page(MockPage {
            open_error: Some(error),
            ..Default::default()
        })
    }

    pub fn failing_render(error: AppError) -> Self {
        Self::from_page(MockPage {
            render: Some(Err(error)),
            ..Default::default()
        })
    }

    /// Heights reported before and after the scroll.
    pub fn with_heights(self, before: f64, after: f64) -> Self {
        self.state.lock().unwrap().evaluations =
            vec![Ok(serde_json::json!(before)), Ok(serde_json::json!(after))];
        self
    }

    pub fn hanging_evaluate(self) -> Self {
        self.state.lock().unwrap().hang_on_evaluate = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }
}

impl PageRenderer for MockRenderer {
    type Session = MockSession;

    async fn open(&self) -> Result<MockSession, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("open".to_string());
        if let Some(err) = state.open_error.take() {
            return Err(err);
        }
        Ok(MockSession {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MockSession {
    state: Arc<Mutex<MockPage>>,
}

impl RenderSession for MockSession {
    async fn render(&self, url: &str, _timeout: Duration) -> Result<RenderedPage, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("render:{url}"));
        state
            .render
            .take()
            .unwrap_or_else(|| Err(AppError::RendererError("no page scripted".into())))
    }

    async fn evaluate(&self, query: &str) -> Result<serde_json::Value, AppError> {
        let hang = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!("evaluate:{query}"));
            state.hang_on_evaluate
        };
        if hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let mut state = self.state.lock().unwrap();
        if state.evaluations.is_empty() {
            Err(AppError::RendererError("evaluation not scripted".into()))
        } else {
            state.evaluations.remove(0)
        }
    }

    async fn scroll_to_bottom(&self) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("scroll".to_string());
        match state.scroll_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn wait(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("wait:{}", duration.as_millis()));
    }

    async fn close(&self) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("close".to_string());
        state.closed += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockInferrer
// ---------------------------------------------------------------------------

/// Mock inference service returning queued raw outputs.
#[derive(Clone)]
pub struct MockInferrer {
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl MockInferrer {
    pub fn new(output: &str) -> Self {
        Self::with_responses(vec![Ok(output.to_string())])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl SchemaInferrer for MockInferrer {
    async fn infer(&self, prompt: &str) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(AppError::InferenceError {
                message: "no response scripted".into(),
                status_code: 500,
                retryable: true,
            })
        } else {
            responses.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeating_fetcher_falls_back_after_its_budget() {
        let fetcher = MockFetcher::repeating("<p>same</p>", 2);
        assert_eq!(fetcher.fetch("u").await.unwrap(), "<p>same</p>");
        assert_eq!(fetcher.fetch("u").await.unwrap(), "<p>same</p>");
        assert_eq!(fetcher.fetch("u").await.unwrap(), "<html><body>default</body></html>");
        assert_eq!(fetcher.calls().len(), 3);
    }
}
