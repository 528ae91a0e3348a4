//! JSONPath extraction over JSON bodies

use jsonpath_rust::JsonPath;
use serde_json::Value as JsonValue;

/// Render a matched value as variable text; `null` means no value
pub fn stringify(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Array(_) | JsonValue::Object(_) => serde_json::to_string(value).ok(),
    }
}

/// First JSONPath match in `body`
///
/// Paths without a leading `$` are treated as rooted, so `data.token` and
/// `$.data.token` are equivalent.
pub fn extract_json(body: &str, path: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    let path = path.trim();
    let rooted;
    let path = if path.starts_with('$') {
        path
    } else {
        rooted = if path.starts_with('[') {
            format!("${}", path)
        } else {
            format!("$.{}", path)
        };
        rooted.as_str()
    };

    let results = value.query(path).ok()?;
    results.first().and_then(|v| stringify(v))
}
