//! Heuristic thresholds and keyword lists.
//!
//! Every component takes its config at construction so tests (and callers)
//! can tune thresholds without touching component logic.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::EndpointCategory;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Static (pre-render) markup inspection.
#[derive(Debug, Clone)]
pub struct StaticConfig {
    /// Substrings of hidden input names left by server-side view-state frameworks.
    pub view_state_markers: Vec<String>,
    /// Minimum occurrences of one (tag, classes) signature to count as repeating.
    pub min_repeat: usize,
    /// Only group elements that carry at least one class. Off by default:
    /// unclassed card grids (`<article>`, `<li>`) must still count.
    pub classed_only: bool,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            view_state_markers: strings(&["__VIEWSTATE", "__EVENTVALIDATION"]),
            min_repeat: 3,
            classed_only: false,
        }
    }
}

/// Dynamic probe sequence against the page renderer.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Navigation budget handed to the renderer.
    pub navigation_timeout: Duration,
    /// Budget for every other renderer call (evaluate, scroll, close).
    pub step_timeout: Duration,
    /// Pre-render text shorter than this means the page was empty before rendering.
    pub min_raw_text_chars: usize,
    /// Rendered text longer than `factor * raw text` means client-side rendering.
    pub script_growth_factor: f64,
    /// Path-segment markers of login/checkpoint redirects.
    pub auth_redirect_markers: Vec<String>,
    pub login_phrases: Vec<String>,
    /// Login phrases only count on pages with less visible text than this.
    pub login_page_max_chars: usize,
    /// Selectors of login/signup controls that mark a gated page.
    pub auth_markers: Vec<String>,
    pub auth_keywords: Vec<String>,
    pub auth_keyword_min_hits: usize,
    /// Keyword density only counts on pages with less visible text than this.
    pub auth_page_max_chars: usize,
    /// Script-like query returning the scrollable height.
    pub height_query: String,
    pub scroll_dwell: Duration,
    /// Absolute growth (px) that marks infinite scroll.
    pub scroll_growth_px: f64,
    /// Growth relative to the initial height that marks infinite scroll.
    pub scroll_growth_ratio: f64,
    /// Characters of normalized text compared between repeat fetches.
    pub determinism_prefix_chars: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            step_timeout: Duration::from_secs(10),
            min_raw_text_chars: 100,
            script_growth_factor: 2.0,
            auth_redirect_markers: strings(&[
                "login",
                "signin",
                "sign-in",
                "sign_in",
                "checkpoint",
                "authwall",
            ]),
            login_phrases: strings(&[
                "log in to continue",
                "sign in to",
                "login required",
                "please login",
            ]),
            login_page_max_chars: 1500,
            auth_markers: strings(&[
                "form[action*='login'] input[type='password']",
                "form[action*='signin'] input[type='password']",
                "form[action*='signup']",
                "form[action*='register']",
                "[data-testid*='login']",
                "[data-testid*='signup']",
            ]),
            auth_keywords: strings(&[
                "sign up",
                "log in",
                "create account",
                "forgot password",
                "policy",
            ]),
            auth_keyword_min_hits: 4,
            auth_page_max_chars: 3000,
            height_query: "document.body.scrollHeight".to_string(),
            scroll_dwell: Duration::from_secs(2),
            scroll_growth_px: 1000.0,
            scroll_growth_ratio: 0.25,
            determinism_prefix_chars: 1000,
        }
    }
}

impl ProbeConfig {
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_scroll_dwell(mut self, dwell: Duration) -> Self {
        self.scroll_dwell = dwell;
        self
    }
}

/// Content block scoring.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Subtrees detached before scoring.
    pub strip_tags: Vec<String>,
    /// Container-like tags considered as candidates.
    pub candidate_tags: Vec<String>,
    /// Boilerplate landmark tags rejected outright.
    pub landmark_tags: Vec<String>,
    /// Boilerplate ARIA roles rejected outright.
    pub landmark_roles: Vec<String>,
    pub nav_keywords: Vec<String>,
    pub nav_keyword_min_hits: usize,
    /// Blocks with more images than this are never treated as navigation.
    pub nav_image_exemption: usize,
    pub nav_min_links: usize,
    pub nav_max_text_chars: usize,
    pub min_text_chars: usize,
    /// Text length that earns one point.
    pub text_unit: f64,
    pub text_score_cap: f64,
    pub image_bonus: f64,
    /// Child-tag repetitions above this earn the structure bonus.
    pub repeat_threshold: usize,
    pub repeat_bonus: f64,
    pub link_density_limit: f64,
    pub link_farm_penalty: f64,
    /// Serialized size above which the score is multiplied by `oversize_factor`.
    pub oversize_bytes: usize,
    pub oversize_factor: f64,
    /// Characters of the serialized fragment hashed into the fingerprint.
    pub fingerprint_prefix_chars: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            strip_tags: strings(&[
                "script", "style", "noscript", "template", "iframe", "svg", "canvas",
            ]),
            candidate_tags: strings(&[
                "article", "section", "div", "table", "tbody", "ul", "ol", "li", "main",
            ]),
            landmark_tags: strings(&["nav", "footer"]),
            landmark_roles: strings(&["navigation", "contentinfo"]),
            nav_keywords: strings(&[
                "login",
                "register",
                "my account",
                "sign in",
                "sign up",
                "logout",
                "terms of use",
                "privacy policy",
                "copyright",
                "sitemap",
                "facebook",
                "twitter",
                "instagram",
                "linkedin",
                "follow us",
                "account",
                "profile",
                "wishlist",
                "favorite",
                "cart",
                "basket",
                "checkout",
                "sipariş",
                "alışveriş",
                "favori",
            ]),
            nav_keyword_min_hits: 2,
            nav_image_exemption: 2,
            nav_min_links: 3,
            nav_max_text_chars: 200,
            min_text_chars: 30,
            text_unit: 200.0,
            text_score_cap: 5.0,
            image_bonus: 2.0,
            repeat_threshold: 3,
            repeat_bonus: 1.5,
            link_density_limit: 0.7,
            link_farm_penalty: 5.0,
            oversize_bytes: 100_000,
            oversize_factor: 0.5,
            fingerprint_prefix_chars: 500,
        }
    }
}

/// Schema coverage validation.
#[derive(Debug, Clone)]
pub struct CoverageConfig {
    pub min_containers: usize,
    /// Minimum mean coverage per category; missing categories use `default_threshold`.
    pub thresholds: BTreeMap<EndpointCategory, f64>,
    pub default_threshold: f64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        let thresholds = BTreeMap::from([
            (EndpointCategory::Random, 0.1),
            (EndpointCategory::Tableful, 0.1),
            (EndpointCategory::Scroll, 0.3),
        ]);
        Self {
            min_containers: 2,
            thresholds,
            default_threshold: 0.5,
        }
    }
}

impl CoverageConfig {
    pub fn threshold_for(&self, category: EndpointCategory) -> f64 {
        self.thresholds
            .get(&category)
            .copied()
            .unwrap_or(self.default_threshold)
    }
}

/// Everything the analysis pipeline needs, grouped.
#[derive(Debug, Clone, Default)]
pub struct PagescopeConfig {
    pub static_features: StaticConfig,
    pub probe: ProbeConfig,
    pub scorer: ScorerConfig,
    pub coverage: CoverageConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_thresholds() {
        let config = CoverageConfig::default();
        assert_eq!(config.threshold_for(EndpointCategory::Random), 0.1);
        assert_eq!(config.threshold_for(EndpointCategory::Tableful), 0.1);
        assert_eq!(config.threshold_for(EndpointCategory::Scroll), 0.3);
        assert_eq!(config.threshold_for(EndpointCategory::Default), 0.5);
        assert_eq!(config.threshold_for(EndpointCategory::Javascript), 0.5);
    }

    #[test]
    fn test_probe_builders() {
        let config = ProbeConfig::default()
            .with_navigation_timeout(Duration::from_secs(5))
            .with_scroll_dwell(Duration::ZERO);
        assert_eq!(config.navigation_timeout, Duration::from_secs(5));
        assert!(config.scroll_dwell.is_zero());
    }
}
