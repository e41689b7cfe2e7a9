//! Pattern scan for answers that carry no usable JSON.

use std::sync::LazyLock;

use regex::Regex;

use super::ExtractedFields;
use super::json::parse_amount;

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}\b").unwrap());

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([$€£])\s?(\d[\d,]*\.\d{2})").unwrap());

static CURRENCY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(USD|EUR|CAD|GBP|JPY)\b").unwrap());

pub(crate) fn scan(raw: &str) -> ExtractedFields {
    let amount = total_amount(raw);
    let currency = CURRENCY_CODE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
        .or_else(|| amount.map(|(symbol, _)| symbol_currency(symbol).to_owned()));

    ExtractedFields {
        date: DATE.find(raw).map(|m| m.as_str().to_owned()),
        cost: amount.map(|(_, value)| value),
        currency,
        ..ExtractedFields::default()
    }
}

/// The last amount on the last line mentioning "total", else the first amount anywhere.
fn total_amount(raw: &str) -> Option<(char, f64)> {
    let on_total_lines = raw
        .lines()
        .filter(|line| line.to_lowercase().contains("total"))
        .filter_map(|line| AMOUNT.captures_iter(line).last())
        .last();
    let caps = on_total_lines.or_else(|| AMOUNT.captures(raw))?;
    let symbol = caps.get(1)?.as_str().chars().next()?;
    let value = parse_amount(caps.get(2)?.as_str())?;
    Some((symbol, value))
}

fn symbol_currency(symbol: char) -> &'static str {
    match symbol {
        '€' => "EUR",
        '£' => "GBP",
        _ => "USD",
    }
}
