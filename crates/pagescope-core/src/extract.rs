//! Applying a validated [`Schema`] to markup to pull out records.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use url::Url;

use crate::error::AppError;
use crate::schema::{FieldKind, FieldSpec, Schema};
use crate::text::visible_text;

/// One extracted entity, keyed by field name.
pub type Record = Map<String, Value>;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %B %Y", "%B %d, %Y"];

/// Extract one record per container matched by the schema.
///
/// Fields read the configured attribute or the element's visible text.
/// `url` fields are resolved against `base_url` when one is given, `number`
/// and `date` fields are cast when the value parses and kept as text
/// otherwise. Multi-valued fields yield arrays, missing fields `null`, and
/// containers where every field is missing are dropped.
pub fn extract_records(
    schema: &Schema,
    html: &str,
    base_url: Option<&str>,
) -> Result<Vec<Record>, AppError> {
    schema.check()?;

    let container_sel = parse_selector(&schema.container_selector)?;
    let fields = schema
        .fields
        .iter()
        .map(|(name, spec)| parse_selector(&spec.selector).map(|sel| (name.as_str(), spec, sel)))
        .collect::<Result<Vec<_>, AppError>>()?;
    let base = base_url.and_then(|b| Url::parse(b).ok());

    let document = Html::parse_document(html);
    let records: Vec<Record> = document
        .select(&container_sel)
        .map(|container| {
            fields
                .iter()
                .map(|(name, spec, sel)| {
                    (name.to_string(), field_value(container, sel, spec, base.as_ref()))
                })
                .collect::<Record>()
        })
        .filter(|record| record.values().any(|v| !v.is_null()))
        .collect();

    tracing::debug!(
        entity = %schema.entity,
        records = records.len(),
        "Records extracted"
    );
    Ok(records)
}

fn parse_selector(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::InvalidSchema(format!("invalid selector '{selector}': {e}")))
}

fn field_value(
    container: ElementRef<'_>,
    sel: &Selector,
    spec: &FieldSpec,
    base: Option<&Url>,
) -> Value {
    let mut values = container
        .select(sel)
        .filter_map(|el| raw_value(el, spec))
        .map(|raw| cast(raw, spec.field_type.kind, base));

    if spec.field_type.multiple {
        let all: Vec<Value> = values.collect();
        if all.is_empty() { Value::Null } else { Value::Array(all) }
    } else {
        values.next().unwrap_or(Value::Null)
    }
}

fn raw_value(el: ElementRef<'_>, spec: &FieldSpec) -> Option<String> {
    let raw = match &spec.attribute {
        Some(attr) => el.value().attr(attr)?.trim().to_string(),
        None => visible_text(el),
    };
    (!raw.is_empty()).then_some(raw)
}

fn cast(raw: String, kind: FieldKind, base: Option<&Url>) -> Value {
    match kind {
        FieldKind::String => Value::String(raw),
        FieldKind::Url => match base.and_then(|b| b.join(&raw).ok()) {
            Some(resolved) => Value::String(resolved.to_string()),
            None => Value::String(raw),
        },
        FieldKind::Number => parse_number(&raw)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(raw)),
        FieldKind::Date => Value::String(parse_date(&raw).unwrap_or(raw)),
    }
}

/// Accepts plain numbers and prices such as `£51.77` or `1,299.00`.
fn parse_number(raw: &str) -> Option<f64> {
    if let Ok(n) = raw.trim().parse::<f64>() {
        return Some(n);
    }
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}

/// ISO 8601 rendering of the recognised date formats.
fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.to_rfc3339());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
}
