//! Schema inference: prompt construction, JSON recovery from free-form model
//! output, and the bounded validate-and-retry loop.

use crate::coverage::{CoverageValidator, ValidationVerdict};
use crate::error::AppError;
use crate::models::EndpointCategory;
use crate::schema::Schema;
use crate::traits::SchemaInferrer;

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

const SCHEMA_PROMPT: &str = r#"ROLE:
You are a web data analyst reverse-engineering the structure of a website.

TASK:
Given HTML snippets from one page, identify:
1. The main repeating data entity, if any
2. The fields inside each entity
3. A robust CSS selector for each field, relative to the entity container
4. The expected data type of each field

RULES:
- Do not generate scraping code
- Prefer stable selectors; avoid generated ids and utility classes
- Assume the site structure may change slightly
- Use the endpoint category to avoid fields that cannot exist
  (for example pagination fields on a random endpoint)

OUTPUT FORMAT (JSON ONLY):
{
  "entity": "...",
  "container_selector": "...",
  "fields": {
    "field_name": {
      "selector": "...",
      "attribute": null | "href" | "src",
      "type": "string | number | date | url"
    }
  }
}"#;

/// Accepted (or best available) schema and how it measured up.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InferredSchema {
    pub schema: Schema,
    pub verdict: ValidationVerdict,
    pub attempts: usize,
}

/// Full analyst prompt for `blocks` taken from an endpoint of `category`.
pub fn build_schema_prompt(category: EndpointCategory, blocks: &[String]) -> String {
    let snippets = blocks
        .iter()
        .enumerate()
        .map(|(i, block)| format!("### BLOCK {}\n{block}", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{SCHEMA_PROMPT}\n\nENDPOINT CATEGORY: {category}\n\nHTML SNIPPETS:\n{snippets}\n")
}

/// First JSON object found in model output.
///
/// Fenced ```json blocks are tried in order; if none parses, the first
/// brace-balanced span is used.
pub fn extract_json(text: &str) -> Result<serde_json::Value, AppError> {
    let mut rest = text;
    while let Some(start) = rest.find("```json") {
        let body = &rest[start + "```json".len()..];
        let Some(end) = body.find("```") else {
            break;
        };
        let candidate = body[..end].trim();
        if candidate.starts_with('{') {
            if let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str(candidate) {
                return Ok(value);
            }
        }
        rest = &body[end + 3..];
    }

    let start = text
        .find('{')
        .ok_or_else(|| AppError::ParseError("No JSON object found in model output".into()))?;
    let end = balanced_end(&text[start..])
        .ok_or_else(|| AppError::ParseError("Unbalanced JSON braces in model output".into()))?;

    Ok(serde_json::from_str(&text[start..start + end])?)
}

/// Byte length of the brace-balanced object at the start of `s`. Braces
/// inside string literals are ignored.
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Ask `inferrer` for a schema up to `max_attempts` times, validating each
/// proposal against `html`.
///
/// Returns the first valid schema. When none validates, the proposal with
/// the highest confidence is returned together with its failing verdict.
/// Only when no attempt produced a schema at all is the last error returned.
pub async fn infer_schema<I: SchemaInferrer>(
    inferrer: &I,
    validator: &CoverageValidator,
    category: EndpointCategory,
    blocks: &[String],
    html: &str,
    max_attempts: usize,
) -> Result<InferredSchema, AppError> {
    let base_prompt = build_schema_prompt(category, blocks);
    let mut best: Option<InferredSchema> = None;
    let mut last_error = AppError::Generic("no inference attempts were made".into());

    for attempt in 1..=max_attempts.max(1) {
        let prompt = match &best {
            Some(previous) if !previous.verdict.errors.is_empty() => format!(
                "{base_prompt}\nA PREVIOUS ANSWER FAILED VALIDATION:\n- {}\n",
                previous.verdict.errors.join("\n- ")
            ),
            _ => base_prompt.clone(),
        };

        let proposal = match propose(inferrer, &prompt).await {
            Ok(schema) => schema,
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Schema inference attempt failed");
                last_error = e;
                continue;
            }
        };

        let verdict = match validator.validate(&proposal, html, category) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Proposed schema rejected");
                last_error = e;
                continue;
            }
        };

        tracing::info!(
            attempt,
            valid = verdict.valid,
            confidence = verdict.confidence,
            containers = verdict.containers_found,
            "Schema proposal validated"
        );

        let candidate = InferredSchema {
            schema: proposal,
            verdict,
            attempts: attempt,
        };
        if candidate.verdict.valid {
            return Ok(candidate);
        }

        let better = best
            .as_ref()
            .is_none_or(|b| candidate.verdict.confidence > b.verdict.confidence);
        if better {
            best = Some(candidate);
        }
    }

    match best {
        Some(mut fallback) => {
            fallback.attempts = max_attempts.max(1);
            tracing::warn!(
                confidence = fallback.verdict.confidence,
                "No schema passed validation, returning best proposal"
            );
            Ok(fallback)
        }
        None => Err(last_error),
    }
}

async fn propose<I: SchemaInferrer>(inferrer: &I, prompt: &str) -> Result<Schema, AppError> {
    let raw = inferrer.infer(prompt).await?;
    Schema::from_value(extract_json(&raw)?)
}
