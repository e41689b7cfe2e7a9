//! Instruction text sent alongside each document.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Extraction template declared by the caller.
///
/// Deserializes leniently through [`Template::from_name`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Template {
    #[default]
    General,
    Travel,
    Odometer,
}

impl Template {
    pub const ALL: [Self; 3] = [Self::General, Self::Travel, Self::Odometer];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Travel => "travel",
            Self::Odometer => "odometer",
        }
    }

    /// Case-insensitive lookup; anything unrecognized maps to [`Template::General`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }
}

impl From<String> for Template {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ODOMETER_PROMPT: &str = "\
You are reading a vehicle odometer from a photo.
Extract ONLY the total distance reading shown on the odometer as a single number.
Ignore units (km, mi, miles), trip meters, the clock and any other gauges.
Respond with just the number and nothing else.
Example output: 123456.7";

const TRAVEL_PROMPT: &str = "\
You are extracting data from a travel expense receipt for a travel report.
Return a single JSON object with exactly these keys:
{
  \"date\": \"transaction date as YYYY-MM-DD\",
  \"cost\": total amount paid as a number,
  \"currency\": \"ISO 4217 currency code, e.g. USD\",
  \"description\": \"short description of what was purchased\",
  \"vendor\": \"merchant or company name\",
  \"location\": \"city or address of the merchant\",
  \"type\": \"one of: Airfare, Lodging, Meals, Taxi, Car Rental, Mileage, Parking, Other\"
}
The date, cost, vendor and type fields are REQUIRED for the travel report; make your best
reading of them even if the print is faint.
Use null for any other field you cannot find. Respond with JSON only.";

const GENERAL_PROMPT: &str = "\
You are extracting data from a purchase receipt.
Return a single JSON object with these keys:
{
  \"date\": \"transaction date as YYYY-MM-DD\",
  \"vendor\": \"merchant or store name\",
  \"location\": \"store address or city\",
  \"items\": [{\"name\": \"item description\", \"price\": item price as a number}],
  \"total\": total amount paid as a number,
  \"paymentMethod\": \"cash, card type or other payment method\"
}
Use null for any field you cannot find. Respond with JSON only.";

/// Instruction text for `template`.
#[must_use]
pub fn build_prompt(template: Template) -> &'static str {
    match template {
        Template::General => GENERAL_PROMPT,
        Template::Travel => TRAVEL_PROMPT,
        Template::Odometer => ODOMETER_PROMPT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fall_back_to_general() {
        assert_eq!(Template::from_name("invoice"), Template::General);
        assert_eq!(Template::from_name(""), Template::General);
        assert_eq!(Template::from_name("TRAVEL"), Template::Travel);
        assert_eq!(Template::from_name(" odometer "), Template::Odometer);
    }

    #[test]
    fn deserializes_leniently_and_serializes_lowercase() {
        let travel: Template = serde_json::from_str("\"Travel\"").unwrap();
        assert_eq!(travel, Template::Travel);
        let unknown: Template = serde_json::from_str("\"invoice\"").unwrap();
        assert_eq!(unknown, Template::General);
        assert_eq!(serde_json::to_string(&Template::Odometer).unwrap(), "\"odometer\"");
    }

    #[test]
    fn odometer_prompt_asks_for_a_single_number() {
        let prompt = build_prompt(Template::Odometer);
        assert!(prompt.contains("single number"));
        assert!(prompt.contains("Ignore units"));
        assert!(prompt.contains("Example output"));
    }

    #[test]
    fn travel_prompt_lists_report_fields() {
        let prompt = build_prompt(Template::Travel);
        for key in [
            "date",
            "cost",
            "currency",
            "description",
            "vendor",
            "location",
            "type",
        ] {
            assert!(prompt.contains(&format!("\"{key}\"")), "missing {key}");
        }
        assert!(prompt.contains("REQUIRED"));
    }

    #[test]
    fn general_prompt_lists_receipt_fields() {
        let prompt = build_prompt(Template::General);
        for key in ["date", "vendor", "location", "items", "total", "paymentMethod"] {
            assert!(prompt.contains(&format!("\"{key}\"")), "missing {key}");
        }
    }

    #[test]
    fn templates_produce_distinct_prompts() {
        assert_ne!(
            build_prompt(Template::General),
            build_prompt(Template::Travel)
        );
        assert_ne!(
            build_prompt(Template::Travel),
            build_prompt(Template::Odometer)
        );
    }
}
