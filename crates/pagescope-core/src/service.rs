//! End-to-end endpoint classification for one URL.

use chrono::Utc;
use url::Url;

use crate::blocks::BlockScorer;
use crate::classifier::matching_rule;
use crate::config::PagescopeConfig;
use crate::error::AppError;
use crate::models::{Analysis, Classification, FeatureVector};
use crate::probe::{DynamicExtractor, ProbeOutcome};
use crate::static_features::StaticExtractor;
use crate::traits::{Fetcher, PageRenderer};

/// Default number of content blocks returned by [`EndpointClassifier::analyze`].
pub const DEFAULT_BLOCK_LIMIT: usize = 15;

/// Wires the fetcher, static extractor, dynamic prober, rule table and block
/// scorer together. Holds no per-request state; concurrent calls for
/// different URLs are independent.
pub struct EndpointClassifier<F, R> {
    fetcher: F,
    static_extractor: StaticExtractor,
    prober: DynamicExtractor<F, R>,
    scorer: BlockScorer,
}

/// Intermediate result shared by `classify` and `analyze`.
struct Observation {
    classification: Classification,
    raw_html: String,
    rendered_html: Option<String>,
}

impl<F, R> EndpointClassifier<F, R>
where
    F: Fetcher,
    R: PageRenderer,
{
    pub fn new(fetcher: F, renderer: R, config: PagescopeConfig) -> Self {
        Self {
            static_extractor: StaticExtractor::new(config.static_features),
            prober: DynamicExtractor::new(fetcher.clone(), renderer, config.probe),
            scorer: BlockScorer::new(config.scorer),
            fetcher,
        }
    }

    /// Classify the endpoint at `url`.
    ///
    /// Only a malformed URL is an error. Fetch and renderer failures degrade
    /// the affected signals and classification still completes.
    pub async fn classify(&self, url: &str) -> Result<Classification, AppError> {
        Ok(self.observe(url).await?.classification)
    }

    /// Classification plus up to `limit` ranked content blocks from the
    /// rendered markup, or the raw markup when rendering failed.
    pub async fn analyze(&self, url: &str, limit: usize) -> Result<Analysis, AppError> {
        let observation = self.observe(url).await?;
        let markup = observation.rendered_html.unwrap_or(observation.raw_html);
        let blocks = self.scorer.rank(&markup, limit);

        tracing::info!(%url, blocks = blocks.len(), "Content blocks ranked");
        Ok(Analysis {
            classification: observation.classification,
            blocks,
            markup,
        })
    }

    async fn observe(&self, url: &str) -> Result<Observation, AppError> {
        let url = validate_target_url(url)?;
        tracing::info!(%url, "Classifying endpoint");

        let raw_html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(%url, error = %e, "Raw fetch failed, continuing with empty markup");
                String::new()
            }
        };

        let static_features = self.static_extractor.extract(&raw_html);
        tracing::debug!(%url, features = ?static_features, "Static features extracted");

        let ProbeOutcome {
            features: dynamic_features,
            resolved_url,
            rendered_html,
        } = self.prober.extract(&url, &raw_html).await;

        let features = FeatureVector::assemble(static_features, dynamic_features);
        let rule = matching_rule(&features);
        tracing::info!(%url, category = %rule.category, rule = rule.name, "Endpoint classified");

        Ok(Observation {
            classification: Classification {
                url,
                category: rule.category,
                features,
                resolved_url,
                classified_at: Utc::now(),
            },
            raw_html,
            rendered_html,
        })
    }
}

/// Accepts absolute http(s) URLs with a host. Returns the trimmed input.
pub fn validate_target_url(url: &str) -> Result<String, AppError> {
    let trimmed = url.trim();
    let parsed =
        Url::parse(trimmed).map_err(|e| AppError::InvalidUrl(format!("{trimmed}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::InvalidUrl(format!(
            "{trimmed}: unsupported scheme '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::InvalidUrl(format!("{trimmed}: missing host")));
    }
    Ok(trimmed.to_string())
}
