//! Response value extraction
//!
//! Extraction is best-effort: malformed bodies and patterns yield `None` and
//! never abort request execution.

pub mod json;
pub mod xml;

use tracing::debug;

use crate::models::{Collection, Environment, RequestResponse, ResponseExtraction};
use crate::variables::set_variable_value;

pub use json::extract_json;
pub use xml::extract_xml;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Json,
    Xml,
}

fn detect_format(body: &str, content_type: Option<&str>) -> Option<BodyFormat> {
    if let Some(ct) = content_type.map(str::to_ascii_lowercase) {
        if ct.contains("json") || ct.contains("graphql") {
            return Some(BodyFormat::Json);
        }
        if ct.contains("xml") {
            return Some(BodyFormat::Xml);
        }
    }

    match body.trim_start().chars().next() {
        Some('{') | Some('[') => Some(BodyFormat::Json),
        Some('<') => Some(BodyFormat::Xml),
        _ => None,
    }
}

/// Pull a value out of `body` using a JSONPath or XPath `pattern`
pub fn extract(body: &str, pattern: &str, content_type: Option<&str>) -> Option<String> {
    match detect_format(body, content_type)? {
        BodyFormat::Json => extract_json(body, pattern),
        BodyFormat::Xml => extract_xml(body, pattern),
    }
}

/// Apply every enabled rule to a response, writing hits into the scopes
///
/// Each rule is independent: a rule that matches nothing leaves the target
/// variable untouched and does not affect the others. Returns the names of the
/// variables that were written.
pub fn apply_extractions(
    rules: &[ResponseExtraction],
    response: &RequestResponse,
    environment: &mut Environment,
    mut collection: Option<&mut Collection>,
) -> Vec<String> {
    let content_type = response.content_type();
    let mut written = Vec::new();

    for rule in rules.iter().filter(|r| r.enabled) {
        if rule.variable_name.trim().is_empty() || rule.pattern.trim().is_empty() {
            continue;
        }
        match extract(&response.body, &rule.pattern, content_type) {
            Some(value) => {
                debug!(
                    variable = %rule.variable_name,
                    pattern = %rule.pattern,
                    "extracted response value"
                );
                set_variable_value(
                    &rule.variable_name,
                    &value,
                    environment,
                    collection.as_deref_mut(),
                    rule.save_to_collection,
                );
                written.push(rule.variable_name.clone());
            }
            None => {
                debug!(
                    variable = %rule.variable_name,
                    pattern = %rule.pattern,
                    "extraction matched nothing"
                );
            }
        }
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VariableScope;

    fn rule(pattern: &str, variable: &str) -> ResponseExtraction {
        ResponseExtraction {
            pattern: pattern.to_string(),
            variable_name: variable.to_string(),
            save_to_collection: false,
            enabled: true,
        }
    }

    #[test]
    fn test_content_type_dispatch() {
        let json = r#"{"a":1}"#;
        assert_eq!(
            extract(json, "$.a", Some("application/json; charset=utf-8")),
            Some("1".into())
        );
        assert_eq!(
            extract(json, "$.a", Some("application/graphql-response+json")),
            Some("1".into())
        );
        assert_eq!(extract("<a>1</a>", "/a", Some("text/xml")), Some("1".into()));
    }

    #[test]
    fn test_sniffing_without_content_type() {
        assert_eq!(extract("  {\"a\":true}", "$.a", None), Some("true".into()));
        assert_eq!(extract("[1,2]", "$[1]", Some("text/plain")), Some("2".into()));
        assert_eq!(extract("\n<a><b>x</b></a>", "//b", None), Some("x".into()));
        assert_eq!(extract("plain text", "$.a", None), None);
        assert_eq!(extract("", "$.a", None), None);
    }

    #[test]
    fn test_declared_type_wins_over_body() {
        assert_eq!(extract("<a>1</a>", "$.a", Some("application/json")), None);
    }

    #[test]
    fn test_apply_extractions_independent_rules() {
        let response = RequestResponse {
            status_code: 200,
            body: r#"{"token":"t-1","user":{"id":9}}"#.to_string(),
            ..Default::default()
        };
        let mut env = Environment::new("e", "E").with_variable("keep", "old");
        let mut col = Collection::new("c", "C");

        let mut to_collection = rule("$.user.id", "userId");
        to_collection.save_to_collection = true;
        let mut disabled = rule("$.token", "disabled");
        disabled.enabled = false;

        let rules = vec![
            rule("$.[[[", "broken"),
            rule("$.token", "token"),
            rule("$.nothing", "keep"),
            to_collection,
            disabled,
        ];
        let written = apply_extractions(&rules, &response, &mut env, Some(&mut col));

        assert_eq!(written, vec!["token".to_string(), "userId".to_string()]);
        assert_eq!(env.get_variable("token"), Some("t-1"));
        assert_eq!(env.get_variable("keep"), Some("old"));
        assert_eq!(env.get_variable("disabled"), None);
        assert_eq!(col.get_variable("userId"), Some("9"));
    }
}
