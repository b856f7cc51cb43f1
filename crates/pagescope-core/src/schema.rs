use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::AppError;

/// Extraction schema proposed by the inference service.
///
/// ```json
/// {
///   "entity": "quote",
///   "container_selector": "div.quote",
///   "fields": {
///     "text":   { "selector": "span.text", "type": "string" },
///     "author": { "selector": "small.author", "type": "string" },
///     "tags":   { "selector": "a.tag", "type": "string[]" },
///     "link":   { "selector": "a", "attribute": "href", "type": "url" }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub entity: String,
    pub container_selector: String,
    pub fields: BTreeMap<String, FieldSpec>,
}

/// How to pull one field out of a container.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldSpec {
    pub selector: String,
    /// Read this attribute instead of the element text.
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
}

/// Declared value type of a field. A trailing `[]` marks multi-valued fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldType {
    pub kind: FieldKind,
    pub multiple: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    String,
    Number,
    Date,
    Url,
}

impl FieldKind {
    fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Url => "url",
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = AppError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let lowered = raw.trim().to_ascii_lowercase();
        let (base, multiple) = match lowered.strip_suffix("[]") {
            Some(base) => (base.trim(), true),
            None => (lowered.as_str(), false),
        };

        // Models drift from the requested vocabulary; accept the usual synonyms.
        let kind = match base {
            "string" | "text" | "str" => FieldKind::String,
            "number" | "integer" | "int" | "float" | "price" => FieldKind::Number,
            "date" | "datetime" => FieldKind::Date,
            "url" | "link" | "href" | "image" | "src" => FieldKind::Url,
            other => {
                return Err(AppError::InvalidSchema(format!(
                    "Unknown field type '{other}'"
                )));
            }
        };

        Ok(Self { kind, multiple })
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if self.multiple {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

impl Schema {
    /// Load a schema from a JSON file and check it is usable.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::InvalidSchema(format!("Failed to read schema file {}: {e}", path.display()))
        })?;
        let schema: Schema = serde_json::from_str(&raw).map_err(|e| {
            AppError::InvalidSchema(format!("Invalid JSON in schema file {}: {e}", path.display()))
        })?;
        schema.check()?;
        Ok(schema)
    }

    /// Parse and check a schema from a JSON value (e.g. model output).
    pub fn from_value(value: serde_json::Value) -> Result<Self, AppError> {
        let schema: Schema = serde_json::from_value(value)
            .map_err(|e| AppError::InvalidSchema(format!("Schema does not match format: {e}")))?;
        schema.check()?;
        Ok(schema)
    }

    /// Reject schemas that cannot be evaluated at all.
    pub fn check(&self) -> Result<(), AppError> {
        if self.container_selector.trim().is_empty() {
            return Err(AppError::InvalidSchema(
                "container_selector is empty".to_string(),
            ));
        }
        if self.fields.is_empty() {
            return Err(AppError::InvalidSchema("schema declares no fields".to_string()));
        }
        if let Some((name, _)) = self
            .fields
            .iter()
            .find(|(_, spec)| spec.selector.trim().is_empty())
        {
            return Err(AppError::InvalidSchema(format!(
                "field '{name}' has an empty selector"
            )));
        }
        Ok(())
    }
}
