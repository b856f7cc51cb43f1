//! Dynamic feature extraction: drives a [`PageRenderer`] through a fixed,
//! ordered probe sequence and re-fetches the page to detect randomness.
//!
//! Every probe is isolated. A failing or timed-out renderer call only leaves
//! the signals it would have produced at their negative default; the
//! sequence itself always completes and never returns an error.

use std::future::Future;
use std::time::Duration;

use scraper::{Html, Selector};
use url::Url;

use crate::config::ProbeConfig;
use crate::error::AppError;
use crate::models::DynamicFeatures;
use crate::text::{normalized_prefix, visible_text};
use crate::traits::{Fetcher, PageRenderer, RenderSession};

/// Dynamic signals plus what the renderer saw, for reuse downstream.
#[derive(Debug, Clone, Default)]
pub struct ProbeOutcome {
    pub features: DynamicFeatures,
    pub resolved_url: Option<String>,
    /// Markup captured right after navigation settled.
    pub rendered_html: Option<String>,
}

/// Signals computed from one rendered page.
struct RenderedSignals {
    rendered_text_length: usize,
    requires_script_rendering: bool,
    login_required: bool,
    has_auth_wall: bool,
}

pub struct DynamicExtractor<F, R> {
    fetcher: F,
    renderer: R,
    config: ProbeConfig,
}

impl<F, R> DynamicExtractor<F, R>
where
    F: Fetcher,
    R: PageRenderer,
{
    pub fn new(fetcher: F, renderer: R, config: ProbeConfig) -> Self {
        Self {
            fetcher,
            renderer,
            config,
        }
    }

    /// Run the probe sequence for `url`, given the raw markup already fetched.
    ///
    /// The renderer probes and the repeat-fetch determinism check run
    /// concurrently; the renderer probes themselves are strictly sequential.
    pub async fn extract(&self, url: &str, raw_html: &str) -> ProbeOutcome {
        let raw_text_length = visible_len(raw_html);

        let (mut outcome, is_nondeterministic) = tokio::join!(
            self.run_renderer_probes(url, raw_text_length),
            self.probe_determinism(url),
        );

        outcome.features.raw_text_length = raw_text_length;
        outcome.features.is_nondeterministic = is_nondeterministic;

        tracing::debug!(%url, features = ?outcome.features, "Dynamic probes finished");
        outcome
    }

    async fn run_renderer_probes(&self, url: &str, raw_text_length: usize) -> ProbeOutcome {
        let mut outcome = ProbeOutcome::default();

        let session = match with_timeout(self.config.navigation_timeout, self.renderer.open()).await
        {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(%url, error = %e, "Could not open renderer session, skipping render probes");
                return outcome;
            }
        };

        self.probe_page(&session, url, raw_text_length, &mut outcome)
            .await;

        if let Err(e) = with_timeout(self.config.step_timeout, session.close()).await {
            tracing::warn!(%url, error = %e, "Failed to close renderer session");
        }

        outcome
    }

    async fn probe_page(
        &self,
        session: &R::Session,
        url: &str,
        raw_text_length: usize,
        outcome: &mut ProbeOutcome,
    ) {
        // 1. Navigate and let the network settle.
        let nav = self.config.navigation_timeout;
        let page = match with_timeout(nav, session.render(url, nav)).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(%url, error = %e, "Render probe failed");
                return;
            }
        };

        // 2. Redirect-based walls, before any text heuristics.
        let redirected = is_auth_redirect(url, &page.resolved_url, &self.config.auth_redirect_markers);
        if redirected {
            tracing::debug!(%url, resolved = %page.resolved_url, "Redirected to an auth wall");
            outcome.features.has_auth_wall = true;
        }

        // 3 + 4. Render delta and text-based auth detectors.
        let signals = self.analyze_rendered(&page.html, raw_text_length, redirected);
        outcome.features.rendered_text_length = signals.rendered_text_length;
        outcome.features.requires_script_rendering = signals.requires_script_rendering;
        outcome.features.login_required = signals.login_required;
        outcome.features.has_auth_wall |= signals.has_auth_wall;
        outcome.resolved_url = Some(page.resolved_url);
        outcome.rendered_html = Some(page.html);

        // 5. Scroll growth on the same loaded page.
        match self.probe_scroll(session).await {
            Ok((initial, growth)) => {
                outcome.features.initial_height = initial;
                outcome.features.scroll_growth = growth;
                outcome.features.has_infinite_scroll = self.is_infinite_scroll(initial, growth);
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "Scroll probe failed");
            }
        }
    }

    fn analyze_rendered(&self, html: &str, raw_text_length: usize, redirected: bool) -> RenderedSignals {
        let document = Html::parse_document(html);
        let text = visible_text(document.root_element());
        let rendered_text_length = text.chars().count();

        let requires_script_rendering = raw_text_length < self.config.min_raw_text_chars
            || rendered_text_length as f64 > self.config.script_growth_factor * raw_text_length as f64;

        let (login_required, has_auth_wall) = if redirected {
            (false, false)
        } else {
            let lowered = text.to_lowercase();
            (
                self.detect_login_required(&lowered, rendered_text_length),
                self.detect_auth_wall(&document, &lowered, rendered_text_length),
            )
        };

        RenderedSignals {
            rendered_text_length,
            requires_script_rendering,
            login_required,
            has_auth_wall,
        }
    }

    /// A login prompt on a page with little else on it.
    fn detect_login_required(&self, lowered: &str, text_length: usize) -> bool {
        text_length < self.config.login_page_max_chars
            && self
                .config
                .login_phrases
                .iter()
                .any(|phrase| lowered.contains(phrase.as_str()))
    }

    /// Login/signup controls, or a content-free landing page dense with
    /// authentication vocabulary.
    fn detect_auth_wall(&self, document: &Html, lowered: &str, text_length: usize) -> bool {
        let has_marker = self.config.auth_markers.iter().any(|marker| {
            Selector::parse(marker)
                .map(|sel| document.select(&sel).next().is_some())
                .unwrap_or(false)
        });
        if has_marker {
            return true;
        }

        let hits: usize = self
            .config
            .auth_keywords
            .iter()
            .map(|kw| lowered.matches(kw.as_str()).count())
            .sum();
        hits >= self.config.auth_keyword_min_hits && text_length < self.config.auth_page_max_chars
    }

    /// Returns `(initial height, growth)`.
    async fn probe_scroll(&self, session: &R::Session) -> Result<(f64, f64), AppError> {
        let before = self.measure_height(session).await?;
        with_timeout(self.config.step_timeout, session.scroll_to_bottom()).await?;

        let dwell = self.config.scroll_dwell;
        if tokio::time::timeout(dwell + self.config.step_timeout, session.wait(dwell))
            .await
            .is_err()
        {
            tracing::debug!("Scroll dwell overran its budget");
        }

        let after = self.measure_height(session).await?;
        Ok((before, after - before))
    }

    async fn measure_height(&self, session: &R::Session) -> Result<f64, AppError> {
        let value = with_timeout(
            self.config.step_timeout,
            session.evaluate(&self.config.height_query),
        )
        .await?;
        value.as_f64().ok_or_else(|| {
            AppError::RendererError(format!("Height query returned non-numeric value: {value}"))
        })
    }

    fn is_infinite_scroll(&self, initial: f64, growth: f64) -> bool {
        if growth > self.config.scroll_growth_px {
            return true;
        }
        initial > 0.0 && growth / initial > self.config.scroll_growth_ratio
    }

    /// Two direct fetches whose normalized text prefixes differ mean the
    /// endpoint serves different content per request.
    async fn probe_determinism(&self, url: &str) -> bool {
        let first = self.fetcher.fetch(url).await;
        let second = self.fetcher.fetch(url).await;

        match (first, second) {
            (Ok(a), Ok(b)) => {
                let n = self.config.determinism_prefix_chars;
                normalized_prefix(&a, n) != normalized_prefix(&b, n)
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(%url, error = %e, "Determinism probe fetch failed");
                false
            }
        }
    }
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, AppError>>,
) -> Result<T, AppError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| AppError::timeout(limit))?
}

fn visible_len(html: &str) -> usize {
    if html.trim().is_empty() {
        return 0;
    }
    let document = Html::parse_document(html);
    visible_text(document.root_element()).chars().count()
}

/// True when the renderer ended up somewhere other than `requested`, on a
/// path segment that looks like a login or checkpoint page.
fn is_auth_redirect(requested: &str, resolved: &str, markers: &[String]) -> bool {
    if resolved.is_empty() || resolved.trim_end_matches('/') == requested.trim_end_matches('/') {
        return false;
    }
    let Ok(resolved_url) = Url::parse(resolved) else {
        return false;
    };
    let requested_segments = Url::parse(requested)
        .map(|u| path_segments(&u))
        .unwrap_or_default();

    path_segments(&resolved_url).iter().any(|segment| {
        !requested_segments.contains(segment)
            && markers.iter().any(|m| segment.contains(m.as_str()))
    })
}

fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| s.to_ascii_lowercase())
                .collect()
        })
        .unwrap_or_default()
}
