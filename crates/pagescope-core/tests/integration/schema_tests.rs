use std::io::Write;

use pagescope_core::{
    AppError, CoverageValidator, EndpointCategory, Schema, SchemaInferrer, extract_records,
    infer_schema,
};

use crate::integration::common::{catalogue_page, shop_page};

const LAMP_SCHEMA: &str = r#"{
    "entity": "product",
    "container_selector": "div.item",
    "fields": {
        "name": {"selector": "h2", "type": "string"},
        "description": {"selector": "p", "type": "string"},
        "price": {"selector": "span.price", "type": "number"}
    }
}"#;

#[derive(Clone)]
struct FixedInferrer(&'static str);

impl SchemaInferrer for FixedInferrer {
    async fn infer(&self, _prompt: &str) -> Result<String, AppError> {
        Ok(format!("Here is the schema:\n```json\n{}\n```", self.0))
    }
}

#[test]
fn schema_file_validates_against_page() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(LAMP_SCHEMA.as_bytes()).unwrap();

    let schema = Schema::load(file.path()).unwrap();
    let verdict = CoverageValidator::default()
        .validate(&schema, &shop_page(), EndpointCategory::Default)
        .unwrap();

    assert_eq!(verdict.containers_found, 3);
    assert!(verdict.per_field["name"].ok);
    assert!(!verdict.per_field["price"].ok);
    assert!((verdict.confidence - 2.0 / 3.0).abs() < 1e-9);
    assert!(verdict.valid);
}

#[test]
fn validated_schema_extracts_one_record_per_item() {
    let schema: Schema = serde_json::from_str(LAMP_SCHEMA).unwrap();
    let records = extract_records(&schema, &catalogue_page(), Some("https://shop.example.com/")).unwrap();

    assert_eq!(records.len(), 3);
    let names: Vec<_> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Walnut desk lamp", "Oak bookshelf", "Wool floor rug"]);
    assert!(records.iter().all(|r| r["price"].is_null()));
}

#[test]
fn schema_file_without_fields_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"entity": "x", "container_selector": "div", "fields": {}}"#)
        .unwrap();

    let err = Schema::load(file.path()).unwrap_err();
    assert!(err.is_input_error());
}

#[tokio::test]
async fn inferred_schema_is_validated_on_the_page() {
    let blocks = pagescope_core::BlockScorer::default().extract_fragments(&shop_page(), 3);
    let result = infer_schema(
        &FixedInferrer(LAMP_SCHEMA),
        &CoverageValidator::default(),
        EndpointCategory::Default,
        &blocks,
        &shop_page(),
        3,
    )
    .await
    .unwrap();

    assert_eq!(result.attempts, 1);
    assert_eq!(result.schema.entity, "product");
    assert!(result.verdict.valid);
}
