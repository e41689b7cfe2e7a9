//! Numeric cleanup of odometer answers.

use serde::Serialize;
use serde_json::Value;

use crate::extract::aliases::ODOMETER_ALIASES;
use crate::extract::json::{lookup, parse_object};

pub const INVALID_READING: &str = "could not extract a valid reading";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OdometerResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OdometerResult {
    #[must_use]
    pub fn failure(error: impl Into<String>, raw_text: Option<String>) -> Self {
        Self {
            success: false,
            reading: None,
            raw_text,
            error: Some(error.into()),
        }
    }
}

/// Normalize a raw model answer into an odometer reading.
///
/// The result always carries `raw_text`; an unreadable answer fails instead of reading zero.
#[must_use]
pub fn normalize_reading(raw: &str) -> OdometerResult {
    match parse_reading(raw) {
        Some(reading) => OdometerResult {
            success: true,
            reading: Some(reading),
            raw_text: Some(raw.to_owned()),
            error: None,
        },
        None => OdometerResult::failure(INVALID_READING, Some(raw.to_owned())),
    }
}

/// JSON `reading`-style keys first, else the whole text.
#[must_use]
pub fn parse_reading(raw: &str) -> Option<f64> {
    let source = reading_source(raw);
    let digits = clean_digits(&source)?;
    digits.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn reading_source(raw: &str) -> String {
    parse_object(raw)
        .and_then(|map| match lookup(&map, ODOMETER_ALIASES) {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| raw.to_owned())
}

/// Keep digits and dots. With several dots the last group becomes the fraction and the
/// earlier groups are joined: `1.234.5` -> `1234.5`.
fn clean_digits(text: &str) -> Option<String> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let Some((whole, fraction)) = kept.rsplit_once('.') else {
        return Some(kept);
    };
    let whole: String = whole.chars().filter(char::is_ascii_digit).collect();
    Some(match (whole.is_empty(), fraction.is_empty()) {
        (_, true) => whole,
        (true, false) => format!("0.{fraction}"),
        (false, false) => format!("{whole}.{fraction}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_separators_and_units() {
        assert_eq!(parse_reading("123,456.7 km"), Some(123_456.7));
        assert_eq!(parse_reading("Odometer shows 45 210 mi"), Some(45_210.0));
    }

    #[test]
    fn multiple_dots_collapse_to_one_decimal() {
        assert_eq!(parse_reading("1.234.5"), Some(1234.5));
        assert_eq!(parse_reading("12.345.678.9"), Some(12_345_678.9));
    }

    #[test]
    fn trailing_and_leading_dots() {
        assert_eq!(parse_reading("98765."), Some(98765.0));
        assert_eq!(parse_reading(".5"), Some(0.5));
    }

    #[test]
    fn no_digits_is_a_failure_not_zero() {
        let result = normalize_reading("no digits here");
        assert!(!result.success);
        assert!(result.reading.is_none());
        assert_eq!(result.error.as_deref(), Some(INVALID_READING));
        assert_eq!(result.raw_text.as_deref(), Some("no digits here"));
        assert!(parse_reading("...").is_none());
        assert!(parse_reading("").is_none());
    }

    #[test]
    fn json_reading_keys_take_precedence() {
        assert_eq!(
            parse_reading("```json\n{\"reading\": \"87,001\", \"trip\": 12.4}\n```"),
            Some(87_001.0)
        );
        assert_eq!(parse_reading("{\"odometer\": 4321.5}"), Some(4321.5));
        assert_eq!(parse_reading("{\"text\": \"000123\"}"), Some(123.0));
    }

    #[test]
    fn json_without_reading_keys_uses_whole_text() {
        // Every digit in the text is kept, including the key's value.
        assert_eq!(parse_reading("{\"km\": 500}"), Some(500.0));
    }

    #[test]
    fn successful_result_keeps_raw_text() {
        let result = normalize_reading("  54321 ");
        assert!(result.success);
        assert_eq!(result.reading, Some(54321.0));
        assert_eq!(result.raw_text.as_deref(), Some("  54321 "));
        assert!(result.error.is_none());
    }

    proptest! {
        #[test]
        fn never_panics_and_never_negative(raw in ".{0,64}") {
            if let Some(reading) = parse_reading(&raw) {
                prop_assert!(reading.is_finite());
                prop_assert!(reading >= 0.0);
            }
        }

        #[test]
        fn grouped_integers_round_trip(n in 0u32..100_000_000) {
            let grouped = n
                .to_string()
                .as_bytes()
                .rchunks(3)
                .rev()
                .map(|c| std::str::from_utf8(c).unwrap())
                .collect::<Vec<_>>()
                .join(",");
            prop_assert_eq!(parse_reading(&format!("{grouped} km")), Some(f64::from(n)));
        }
    }
}
