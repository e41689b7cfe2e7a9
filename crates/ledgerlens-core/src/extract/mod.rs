//! Turn a model's free-form answer into receipt fields.
//!
//! JSON is tried first. The pattern scan only runs when JSON yields nothing, and the two
//! strategies never contribute to the same result.

pub(crate) mod aliases;
mod fallback;
pub(crate) mod json;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Fields read off a receipt. `None` means "not detected".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LineItem>,
}

impl ExtractedFields {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.populated_count() == 0
    }

    #[must_use]
    pub fn populated_count(&self) -> usize {
        [
            self.date.is_some(),
            self.cost.is_some(),
            self.currency.is_some(),
            self.vendor.is_some(),
            self.location.is_some(),
            self.kind.is_some(),
            self.description.is_some(),
            self.payment_method.is_some(),
            !self.items.is_empty(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

/// Which strategy produced the fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Json,
    Pattern,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub fields: ExtractedFields,
    pub strategy: Strategy,
}

/// Neither strategy found anything. Advisory only, never a failed extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionAmbiguity {
    #[error("response contained no JSON object and no recognizable receipt text")]
    Unstructured,
    #[error("response JSON contained none of the expected receipt fields")]
    UnrecognizedJson,
}

/// Extract fields, reporting which strategy succeeded.
///
/// # Errors
///
/// Returns [`ExtractionAmbiguity`] when neither JSON nor the pattern scan populated a field.
pub fn try_extract(raw: &str) -> Result<Extraction, ExtractionAmbiguity> {
    let object = json::parse_object(raw);
    let had_json = object.is_some();

    if let Some(map) = object {
        let fields = json::fields_from_object(&map);
        if !fields.is_empty() {
            return Ok(Extraction {
                fields,
                strategy: Strategy::Json,
            });
        }
    }

    let fields = fallback::scan(raw);
    if !fields.is_empty() {
        tracing::debug!(
            populated = fields.populated_count(),
            "fields recovered by pattern scan"
        );
        return Ok(Extraction {
            fields,
            strategy: Strategy::Pattern,
        });
    }

    Err(if had_json {
        ExtractionAmbiguity::UnrecognizedJson
    } else {
        ExtractionAmbiguity::Unstructured
    })
}

/// Extract fields; ambiguity collapses into an empty field set.
#[must_use]
pub fn extract_fields(raw: &str) -> ExtractedFields {
    try_extract(raw).map(|e| e.fields).unwrap_or_default()
}
