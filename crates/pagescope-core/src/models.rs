use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Behavioural class of an endpoint, which decides the downstream scraping
/// strategy.
///
/// Declaration order is priority order: when several rules could apply, the
/// earlier variant wins (see [`crate::classifier::RULES`]).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EndpointCategory {
    /// Blocked behind a login/signup wall or legacy server-side view state.
    Unsupported,
    /// Returns different content on every request.
    Random,
    /// Starts (nearly) empty and grows as the user scrolls.
    Scroll,
    /// Content only appears after client-side rendering.
    Javascript,
    /// Data lives in a `<table>`.
    Tableful,
    /// Page carries microdata (`itemscope` / `itemprop`).
    Microdata,
    /// Plain server-rendered HTML.
    #[default]
    Default,
}

impl EndpointCategory {
    /// All categories, in priority order.
    pub const ALL: [EndpointCategory; 7] = [
        EndpointCategory::Unsupported,
        EndpointCategory::Random,
        EndpointCategory::Scroll,
        EndpointCategory::Javascript,
        EndpointCategory::Tableful,
        EndpointCategory::Microdata,
        EndpointCategory::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointCategory::Unsupported => "unsupported",
            EndpointCategory::Random => "random",
            EndpointCategory::Scroll => "scroll",
            EndpointCategory::Javascript => "javascript",
            EndpointCategory::Tableful => "tableful",
            EndpointCategory::Microdata => "microdata",
            EndpointCategory::Default => "default",
        }
    }
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| AppError::Generic(format!("Unknown endpoint category: {s}")))
    }
}

/// Signals derived from the raw (pre-render) markup alone.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StaticFeatures {
    pub has_structured_markup: bool,
    pub has_legacy_form_state: bool,
    pub has_tabular_structure: bool,
    pub has_login_form: bool,
    pub has_repeating_containers: bool,
    /// Occurrences of the most frequent (tag, classes) signature.
    pub repeat_count: usize,
}

/// Signals derived by driving the page renderer and re-fetching the page.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DynamicFeatures {
    pub requires_script_rendering: bool,
    pub has_infinite_scroll: bool,
    pub is_nondeterministic: bool,
    pub has_auth_wall: bool,
    pub login_required: bool,
    pub raw_text_length: usize,
    pub rendered_text_length: usize,
    pub initial_height: f64,
    pub scroll_growth: f64,
}

/// Flat record of every signal used to classify an endpoint.
///
/// Produced once per request by [`FeatureVector::assemble`] and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureVector {
    pub has_structured_markup: bool,
    pub has_legacy_form_state: bool,
    pub has_tabular_structure: bool,
    pub has_login_form: bool,
    pub has_repeating_containers: bool,
    pub repeat_count: usize,
    pub requires_script_rendering: bool,
    pub has_infinite_scroll: bool,
    pub is_nondeterministic: bool,
    pub has_auth_wall: bool,
    pub login_required: bool,
    pub raw_text_length: usize,
    pub rendered_text_length: usize,
    pub initial_height: f64,
    pub scroll_growth: f64,
}

impl FeatureVector {
    /// Combine the two extraction stages.
    ///
    /// Each stage owns its own fields. The only cross-stage signal is the
    /// auth wall: a static login form seeds it and the dynamic stage can
    /// widen it, but nothing can clear it.
    pub fn assemble(stat: StaticFeatures, dynamic: DynamicFeatures) -> Self {
        Self {
            has_structured_markup: stat.has_structured_markup,
            has_legacy_form_state: stat.has_legacy_form_state,
            has_tabular_structure: stat.has_tabular_structure,
            has_login_form: stat.has_login_form,
            has_repeating_containers: stat.has_repeating_containers,
            repeat_count: stat.repeat_count,
            requires_script_rendering: dynamic.requires_script_rendering,
            has_infinite_scroll: dynamic.has_infinite_scroll,
            is_nondeterministic: dynamic.is_nondeterministic,
            has_auth_wall: stat.has_login_form || dynamic.has_auth_wall,
            login_required: dynamic.login_required,
            raw_text_length: dynamic.raw_text_length,
            rendered_text_length: dynamic.rendered_text_length,
            initial_height: dynamic.initial_height,
            scroll_growth: dynamic.scroll_growth,
        }
    }
}

/// Result of classifying one URL.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Classification {
    pub url: String,
    pub category: EndpointCategory,
    pub features: FeatureVector,
    /// Final URL after redirects, when the renderer reported one.
    pub resolved_url: Option<String>,
    pub classified_at: DateTime<Utc>,
}

/// A candidate fragment hypothesised to hold one instance of the page's
/// repeating data entity.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContentBlock {
    pub html: String,
    pub score: f64,
    pub fingerprint: String,
}

/// Classification plus the ranked blocks scored from the same rendered page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Analysis {
    pub classification: Classification,
    pub blocks: Vec<ContentBlock>,
    /// Markup the blocks were scored from.
    #[serde(skip)]
    pub markup: String,
}

impl Analysis {
    /// Serialized fragments, in rank order.
    pub fn fragments(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.html.clone()).collect()
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
