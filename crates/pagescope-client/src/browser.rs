use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use pagescope_core::error::AppError;
use pagescope_core::traits::{PageRenderer, RenderSession, RenderedPage};

use crate::fetcher::{DEFAULT_MAX_PAGE_BYTES, DESKTOP_USER_AGENT, cap_markup};
use crate::settle::SettlePolicy;

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Headless Chromium renderer driven over the Chrome DevTools Protocol.
///
/// One Chromium process is shared by all clones; every
/// [`PageRenderer::open`] call opens a fresh tab that lives until
/// [`RenderSession::close`]. After the load event the tab is given time to
/// settle (see [`SettlePolicy`]) so client-rendered content and auth
/// overlays are in the captured markup, which is then cut to
/// `max_page_bytes`.
///
/// # Example
///
/// ```rust,no_run
/// use pagescope_client::ChromiumRenderer;
/// use pagescope_core::traits::{PageRenderer, RenderSession};
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let renderer = ChromiumRenderer::launch().await?;
/// let session = renderer.open().await?;
/// let page = session.render("https://example.com", Duration::from_secs(30)).await?;
/// println!("{} -> {} bytes", page.resolved_url, page.html.len());
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChromiumRenderer {
    browser: Arc<Browser>,
    settle: SettlePolicy,
    max_page_bytes: usize,
}

impl ChromiumRenderer {
    /// Launch headless Chromium with a desktop viewport and user agent.
    ///
    /// Honours `CHROME_BIN`, then a list of well-known install paths, then
    /// `chromiumoxide`'s own lookup.
    pub async fn launch() -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .window_size(1280, 1024);

        if let Some(bin) = find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .arg(format!("--user-agent={DESKTOP_USER_AGENT}"))
            .build()
            .map_err(|e| AppError::RendererError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled for the connection to make progress.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            settle: SettlePolicy::default(),
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
        })
    }

    pub fn with_settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_max_page_bytes(mut self, max_page_bytes: usize) -> Self {
        self.max_page_bytes = max_page_bytes;
        self
    }
}

/// Snap-packaged Chromium ships a wrapper that drops unknown flags and
/// breaks headless mode, so the real binary inside the snap comes first.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    [
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

impl PageRenderer for ChromiumRenderer {
    type Session = ChromiumSession;

    async fn open(&self) -> Result<ChromiumSession, AppError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to open tab: {e}")))?;
        Ok(ChromiumSession {
            page,
            settle: self.settle,
            max_page_bytes: self.max_page_bytes,
        })
    }
}

/// One browser tab.
pub struct ChromiumSession {
    page: Page,
    settle: SettlePolicy,
    max_page_bytes: usize,
}

impl ChromiumSession {
    async fn navigate(&self, url: &str, budget: Duration) -> Result<RenderedPage, AppError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to navigate to {url}: {e}")))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| AppError::RendererError(format!("Navigation did not settle: {e}")))?;

        // Half the navigation budget at most, so a slow page still renders.
        let page = &self.page;
        let html = self
            .settle
            .settle(budget / 2, || async move {
                page.content().await.map_err(|e| {
                    AppError::RendererError(format!("Failed to read page content: {e}"))
                })
            })
            .await?;
        let html = cap_markup(html, self.max_page_bytes);
        let resolved_url = self
            .page
            .url()
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to read page URL: {e}")))?
            .unwrap_or_else(|| url.to_string());

        Ok(RenderedPage { html, resolved_url })
    }
}

impl RenderSession for ChromiumSession {
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, AppError> {
        tokio::time::timeout(timeout, self.navigate(url, timeout))
            .await
            .map_err(|_| AppError::timeout(timeout))?
    }

    async fn evaluate(&self, query: &str) -> Result<serde_json::Value, AppError> {
        let result = self
            .page
            .evaluate(query)
            .await
            .map_err(|e| AppError::RendererError(format!("Evaluation of '{query}' failed: {e}")))?;
        result
            .into_value()
            .map_err(|e| AppError::RendererError(format!("Evaluation of '{query}' returned no value: {e}")))
    }

    async fn scroll_to_bottom(&self) -> Result<(), AppError> {
        self.page
            .evaluate(SCROLL_SCRIPT)
            .await
            .map(|_| ())
            .map_err(|e| AppError::RendererError(format!("Scroll failed: {e}")))
    }

    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn close(&self) -> Result<(), AppError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to close tab: {e}")))
    }
}
