pub mod blocks;
pub mod classifier;
pub mod config;
pub mod coverage;
pub mod error;
pub mod extract;
pub mod inference;
pub mod models;
pub mod probe;
pub mod schema;
pub mod service;
pub mod static_features;
pub mod text;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use blocks::BlockScorer;
pub use classifier::{RULES, classify, matching_rule};
pub use config::{CoverageConfig, PagescopeConfig, ProbeConfig, ScorerConfig, StaticConfig};
pub use coverage::{CoverageValidator, FieldCoverage, ValidationVerdict};
pub use error::AppError;
pub use extract::{Record, extract_records};
pub use inference::{InferredSchema, build_schema_prompt, extract_json, infer_schema};
pub use models::{
    Analysis, Classification, ContentBlock, DynamicFeatures, EndpointCategory, FeatureVector,
    StaticFeatures, compute_hash,
};
pub use probe::DynamicExtractor;
pub use schema::{FieldKind, FieldSpec, FieldType, Schema};
pub use service::{EndpointClassifier, validate_target_url};
pub use static_features::StaticExtractor;
pub use traits::{Fetcher, PageRenderer, RenderSession, RenderedPage, SchemaInferrer};
