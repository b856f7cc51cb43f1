use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pagescope_core::config::{PagescopeConfig, ProbeConfig};
use pagescope_core::{AppError, EndpointClassifier, Fetcher, PageRenderer, RenderSession, RenderedPage};

/// Serves queued bodies in order, then repeats the last one.
#[derive(Clone)]
pub struct CannedFetcher {
    bodies: Arc<Mutex<VecDeque<String>>>,
    last: Arc<Mutex<String>>,
}

impl CannedFetcher {
    pub fn same(html: &str) -> Self {
        Self::sequence(&[html])
    }

    pub fn sequence(bodies: &[&str]) -> Self {
        Self {
            bodies: Arc::new(Mutex::new(bodies.iter().map(|b| b.to_string()).collect())),
            last: Arc::new(Mutex::new(String::new())),
        }
    }
}

impl Fetcher for CannedFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, AppError> {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.bodies.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

/// Renders fixed markup and reports scripted page heights.
#[derive(Clone)]
pub struct CannedRenderer {
    html: String,
    heights: (f64, f64),
}

impl CannedRenderer {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            heights: (900.0, 900.0),
        }
    }

    pub fn growing(html: &str, before: f64, after: f64) -> Self {
        Self {
            html: html.to_string(),
            heights: (before, after),
        }
    }
}

impl PageRenderer for CannedRenderer {
    type Session = CannedSession;

    async fn open(&self) -> Result<CannedSession, AppError> {
        Ok(CannedSession {
            page: self.clone(),
            scrolled: Arc::new(Mutex::new(false)),
        })
    }
}

pub struct CannedSession {
    page: CannedRenderer,
    scrolled: Arc<Mutex<bool>>,
}

impl RenderSession for CannedSession {
    async fn render(&self, url: &str, _timeout: Duration) -> Result<RenderedPage, AppError> {
        Ok(RenderedPage {
            html: self.page.html.clone(),
            resolved_url: url.to_string(),
        })
    }

    async fn evaluate(&self, _query: &str) -> Result<serde_json::Value, AppError> {
        let (before, after) = self.page.heights;
        let height = if *self.scrolled.lock().unwrap() { after } else { before };
        Ok(serde_json::json!(height))
    }

    async fn scroll_to_bottom(&self) -> Result<(), AppError> {
        *self.scrolled.lock().unwrap() = true;
        Ok(())
    }

    async fn wait(&self, _duration: Duration) {}

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn classifier(
    fetcher: CannedFetcher,
    renderer: CannedRenderer,
) -> EndpointClassifier<CannedFetcher, CannedRenderer> {
    let config = PagescopeConfig {
        probe: ProbeConfig::default().with_scroll_dwell(Duration::ZERO),
        ..Default::default()
    };
    EndpointClassifier::new(fetcher, renderer, config)
}

/// Three byte-identical product cards followed by a boilerplate footer.
pub fn shop_page() -> String {
    let item = r#"<div class="item"><h2>Walnut desk lamp</h2><p>Hand-finished walnut base with a linen shade and a warm dimmable bulb.</p></div>"#;
    with_footer(&format!("{item}{item}{item}"))
}

/// Three cards sharing one structure but carrying different products.
pub fn catalogue_page() -> String {
    let items: String = [
        ("Walnut desk lamp", "Hand-finished walnut base with a linen shade and a warm dimmable bulb."),
        ("Oak bookshelf", "Five solid oak shelves with hidden wall anchors and a matte oil finish."),
        ("Wool floor rug", "Flat-woven undyed wool rug, two by three metres, made on a hand loom."),
    ]
    .iter()
    .map(|(name, blurb)| format!(r#"<div class="item"><h2>{name}</h2><p>{blurb}</p></div>"#))
    .collect();
    with_footer(&items)
}

fn with_footer(items: &str) -> String {
    format!(
        r#"<html><head><title>Shop</title></head><body>
        <h1>New arrivals</h1>
        {items}
        <footer><ul>
            <li><a href="/about">About</a></li>
            <li><a href="/contact">Contact</a></li>
            <li><a href="/privacy">Privacy policy</a></li>
            <li><a href="/terms">Terms of use</a></li>
            <li><a href="/jobs">Jobs</a></li>
        </ul></footer>
        </body></html>"#
    )
}
