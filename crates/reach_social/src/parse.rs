//! Helpers shared by the platform parsers.

use reach_error::{PlatformError, PlatformErrorKind};
use serde_json::Value;

/// Parse a JSON document.
pub(crate) fn parse_json(body: &str) -> Result<Value, PlatformError> {
    serde_json::from_str(body).map_err(|e| PlatformError::new(PlatformErrorKind::Parse(e.to_string())))
}

/// Count that upstreams send as either a number or a numeric string.
///
/// Missing, negative or non-numeric values read as zero.
pub(crate) fn json_u64(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// String field, empty when missing.
pub(crate) fn json_str(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

/// First of several field names present on an object.
pub(crate) fn first_present<'a>(value: &'a Value, fields: &[&str]) -> &'a Value {
    fields
        .iter()
        .map(|field| &value[*field])
        .find(|v| !v.is_null())
        .unwrap_or(&Value::Null)
}

/// Parse a human-formatted count such as `1.2M`, `15K` or `3,456`.
pub(crate) fn parse_abbreviated_count(text: &str) -> Option<u64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',' && *c != ' ').collect();
    let (number, multiplier) = match cleaned.chars().last()? {
        'K' | 'k' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'M' | 'm' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        'B' | 'b' => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    let value: f64 = number.parse().ok()?;
    if value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

/// Text of an HTML element with the given `id`, via a CSS selector.
pub(crate) fn script_by_id(html: &str, id: &str) -> Option<String> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse(&format!("script#{}", id)).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>())
}

/// Content of a `<meta property=...>` or `<meta name=...>` tag.
pub(crate) fn meta_content(document: &scraper::Html, key: &str) -> Option<String> {
    let selector =
        scraper::Selector::parse(&format!(r#"meta[property="{0}"], meta[name="{0}"]"#, key)).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}
