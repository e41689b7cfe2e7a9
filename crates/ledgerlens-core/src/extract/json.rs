use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::aliases::{FIELD_ALIASES, Field, ITEM_NAME_KEYS, ITEM_PRICE_KEYS};
use super::{ExtractedFields, LineItem};

static FENCED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(\{.*?\})\s*```").unwrap());

/// Locate the JSON object a model answer most likely carries.
///
/// A fenced code block wins; otherwise the span from the first `{` to the last `}`.
pub(crate) fn candidate(raw: &str) -> Option<&str> {
    if let Some(caps) = FENCED_OBJECT.captures(raw)
        && let Some(m) = caps.get(1)
    {
        return Some(m.as_str());
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse the candidate object, `None` when there is no object to read.
pub(crate) fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    let text = candidate(raw)?;
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("response candidate is not valid JSON: {e}");
            None
        }
    }
}

/// First alias in `keys` with a non-null value.
pub(crate) fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

pub(crate) fn fields_from_object(map: &Map<String, Value>) -> ExtractedFields {
    let mut fields = ExtractedFields::default();
    for (field, keys) in FIELD_ALIASES {
        let Some(value) = lookup(map, keys) else {
            continue;
        };
        match field {
            Field::Date => fields.date = as_text(value),
            Field::Cost => fields.cost = as_number(value),
            Field::Currency => fields.currency = as_text(value).map(|c| c.to_uppercase()),
            Field::Vendor => fields.vendor = as_text(value),
            Field::Location => fields.location = as_text(value),
            Field::Type => fields.kind = as_text(value),
            Field::Description => fields.description = as_text(value),
            Field::PaymentMethod => fields.payment_method = as_text(value),
            Field::Items => fields.items = as_items(value),
        }
    }
    fields
}

/// Non-empty trimmed text; numbers are rendered as written.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers pass through; strings lose currency symbols, codes and separators first.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

pub(crate) fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn as_items(value: &Value) -> Vec<LineItem> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(obj) => {
                let name = lookup(obj, ITEM_NAME_KEYS).and_then(as_text)?;
                let price = lookup(obj, ITEM_PRICE_KEYS).and_then(as_number);
                Some(LineItem { name, price })
            }
            Value::String(_) => as_text(entry).map(|name| LineItem { name, price: None }),
            _ => None,
        })
        .collect()
}
