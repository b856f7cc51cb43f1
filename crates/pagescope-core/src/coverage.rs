//! Measures how well a proposed extraction schema fits the page.
//!
//! The verdict is advisory: callers decide whether to retry inference or to
//! proceed with a failing schema.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};

use crate::config::CoverageConfig;
use crate::error::AppError;
use crate::models::EndpointCategory;
use crate::schema::{FieldSpec, Schema};
use crate::text::visible_text;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FieldCoverage {
    pub ok: bool,
    /// Fraction of containers where the field resolves to a non-empty value.
    pub coverage: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidationVerdict {
    pub valid: bool,
    /// Mean field coverage, 0..=1.
    pub confidence: f64,
    pub containers_found: usize,
    pub per_field: BTreeMap<String, FieldCoverage>,
    pub errors: Vec<String>,
}

impl ValidationVerdict {
    fn rejected(containers_found: usize, error: String) -> Self {
        Self {
            valid: false,
            confidence: 0.0,
            containers_found,
            per_field: BTreeMap::new(),
            errors: vec![error],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoverageValidator {
    config: CoverageConfig,
}

impl CoverageValidator {
    pub fn new(config: CoverageConfig) -> Self {
        Self { config }
    }

    /// Check `schema` against `html` for an endpoint of `category`.
    ///
    /// Only an empty schema is an error; everything else, including
    /// unparsable selectors, is reported in the verdict.
    pub fn validate(
        &self,
        schema: &Schema,
        html: &str,
        category: EndpointCategory,
    ) -> Result<ValidationVerdict, AppError> {
        schema.check()?;

        let container_sel = match Selector::parse(&schema.container_selector) {
            Ok(sel) => sel,
            Err(e) => {
                return Ok(ValidationVerdict::rejected(
                    0,
                    format!(
                        "invalid container selector '{}': {e}",
                        schema.container_selector
                    ),
                ));
            }
        };

        let document = Html::parse_document(html);
        let containers: Vec<ElementRef<'_>> = document.select(&container_sel).collect();
        if containers.len() < self.config.min_containers {
            return Ok(ValidationVerdict::rejected(
                containers.len(),
                format!(
                    "insufficient containers: found {}, need at least {}",
                    containers.len(),
                    self.config.min_containers
                ),
            ));
        }

        let threshold = self.config.threshold_for(category);
        let mut per_field = BTreeMap::new();
        let mut errors = Vec::new();

        for (name, spec) in &schema.fields {
            let coverage = match Selector::parse(&spec.selector) {
                Ok(sel) => {
                    let hits = containers
                        .iter()
                        .filter(|c| resolves(**c, &sel, spec))
                        .count();
                    hits as f64 / containers.len() as f64
                }
                Err(e) => {
                    errors.push(format!(
                        "field '{name}': invalid selector '{}': {e}",
                        spec.selector
                    ));
                    0.0
                }
            };

            let ok = coverage >= threshold;
            if !ok {
                errors.push(format!(
                    "field '{name}': coverage {coverage:.2} below {threshold:.2}"
                ));
            }
            per_field.insert(name.clone(), FieldCoverage { ok, coverage });
        }

        let confidence =
            per_field.values().map(|f| f.coverage).sum::<f64>() / per_field.len() as f64;
        let valid = confidence >= threshold;

        tracing::debug!(
            containers = containers.len(),
            confidence,
            threshold,
            valid,
            "Schema coverage measured"
        );

        Ok(ValidationVerdict {
            valid,
            confidence,
            containers_found: containers.len(),
            per_field,
            errors,
        })
    }
}

/// True when any element matched by `sel` inside `container` yields a
/// non-empty value.
fn resolves(container: ElementRef<'_>, sel: &Selector, spec: &FieldSpec) -> bool {
    container.select(sel).any(|el| match &spec.attribute {
        Some(attr) => el
            .value()
            .attr(attr)
            .is_some_and(|v| !v.trim().is_empty()),
        None => !visible_text(el).is_empty(),
    })
}
