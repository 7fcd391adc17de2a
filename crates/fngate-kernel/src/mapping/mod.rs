//! Request → invocation-event mapping.
//!
//! Two modes, picked per route from its `application/json` request template:
//!
//! * **Explicit**: every `(field, expression)` pair of the template is
//!   evaluated with the mapping language ([`expr`]); failures are logged and
//!   the field is skipped, falsy results are omitted.
//! * **Fallback**: no template, so body fields, then path parameters, then
//!   query parameters are merged into the event (later sources win).

pub mod expr;
pub mod jsonpath;

use crate::types::{InboundRequest, InvocationEvent, is_truthy};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

/// Content type whose request template drives explicit mapping.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Bare `$input.json(...)` calls embedded in a string template.
static BARE_JSON_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$input.json\(.+?\)").expect("json call pattern is valid")
});

/// A request template that cannot be turned into a [`MappingSpec`].
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("request template must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("malformed request template: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered table of target field → mapping expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingSpec {
    entries: Vec<(String, Value)>,
}

impl MappingSpec {
    /// Build a spec from `(field, expression)` pairs, keeping their order.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        }
    }

    /// Parse a template as declared: either a mapping object, or a JSON
    /// string in which bare `$input.json(...)` calls are quoted first.
    pub fn from_source(source: &Value) -> Result<Self, TemplateError> {
        match source {
            Value::Object(map) => Ok(Self::from_map(map)),
            Value::String(text) => {
                let quoted = BARE_JSON_CALL.replace_all(text, "\"$0\"");
                match serde_json::from_str::<Value>(&quoted)? {
                    Value::Object(map) => Ok(Self::from_map(&map)),
                    other => Err(TemplateError::NotAnObject(type_name(&other))),
                }
            }
            other => Err(TemplateError::NotAnObject(type_name(other))),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            entries: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Target field names in evaluation order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Evaluate every entry against `request`.
    pub fn apply(&self, request: &InboundRequest) -> InvocationEvent {
        let mut event = InvocationEvent::new();
        for (field, expression) in &self.entries {
            // Non-string template values never invoke the language.
            let Some(text) = expression.as_str() else {
                continue;
            };
            match expr::evaluate(text, request) {
                Ok(Some(value)) if is_truthy(&value) => {
                    event.insert(field.clone(), value);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        request_id = %request.id,
                        field = %field,
                        expression = %text,
                        error = %err,
                        "error processing input parameter"
                    );
                }
            }
        }
        event
    }
}

/// How a route turns requests into events, decided once at registration.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestMapping {
    /// Merge body, path parameters and query string.
    #[default]
    Fallback,
    /// Evaluate the route's mapping spec.
    Explicit(MappingSpec),
}

impl RequestMapping {
    /// Pick the mode from a route's content-type → template table.
    ///
    /// A missing or falsy `application/json` entry selects fallback mode.
    pub fn from_templates(templates: &Map<String, Value>) -> Result<Self, TemplateError> {
        match templates.get(JSON_CONTENT_TYPE) {
            Some(source) if is_truthy(source) => {
                MappingSpec::from_source(source).map(RequestMapping::Explicit)
            }
            _ => Ok(RequestMapping::Fallback),
        }
    }

    pub fn build_event(&self, request: &InboundRequest) -> InvocationEvent {
        match self {
            RequestMapping::Fallback => build_event(request, None),
            RequestMapping::Explicit(spec) => build_event(request, Some(spec)),
        }
    }
}

/// Build the invocation event for `request`.
///
/// `Some(spec)` selects explicit mode, `None` the fallback merge.
pub fn build_event(request: &InboundRequest, spec: Option<&MappingSpec>) -> InvocationEvent {
    match spec {
        Some(spec) => spec.apply(request),
        None => merge_sources(request),
    }
}

fn merge_sources(request: &InboundRequest) -> InvocationEvent {
    let mut event = InvocationEvent::new();

    match &request.body {
        Value::Object(fields) => {
            event.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Value::Array(items) => {
            event.extend(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v.clone())),
            );
        }
        _ => {}
    }

    for (key, value) in &request.path_params {
        event.insert(key.clone(), Value::String(value.clone()));
    }
    for (key, value) in &request.query {
        event.insert(key.clone(), Value::String(value.clone()));
    }

    event
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fallback_merge_order_is_body_then_path_then_query() {
        let request = InboundRequest::new("r", "/")
            .with_body(json!({ "a": 1 }))
            .with_path_param("a", "2")
            .with_path_param("b", "3")
            .with_query("b", "4")
            .with_query("c", "5");

        let event = build_event(&request, None);
        assert_eq!(Value::Object(event), json!({ "a": "2", "b": "4", "c": "5" }));
    }

    #[test]
    fn fallback_keeps_body_only_fields() {
        let request = InboundRequest::new("r", "/")
            .with_body(json!({ "nested": { "x": true }, "n": 7 }))
            .with_query("q", "1");
        let event = build_event(&request, None);
        assert_eq!(event["nested"], json!({ "x": true }));
        assert_eq!(event["n"], json!(7));
        assert_eq!(event["q"], json!("1"));
    }

    #[test]
    fn fallback_array_body_contributes_indices() {
        let request = InboundRequest::new("r", "/").with_body(json!(["x", "y"]));
        let event = build_event(&request, None);
        assert_eq!(Value::Object(event), json!({ "0": "x", "1": "y" }));
    }

    #[test]
    fn fallback_scalar_body_contributes_nothing() {
        let request = InboundRequest::new("r", "/").with_body(json!("text"));
        assert!(build_event(&request, None).is_empty());
    }

    #[test]
    fn explicit_mapping_contains_only_mapped_fields() {
        let request = InboundRequest::new("r", "/users/42")
            .with_body(json!({ "other": 1 }))
            .with_path_param("id", "42")
            .with_query("page", "1");
        let spec = MappingSpec::from_pairs([("userId", "$input.params('id')")]);

        let event = build_event(&request, Some(&spec));
        assert_eq!(Value::Object(event), json!({ "userId": "42" }));
    }

    #[test]
    fn explicit_mapping_omits_failures_and_empty_results() {
        let request = InboundRequest::new("r", "/")
            .with_body(json!({ "user": { "name": "a", "zero": 0 } }))
            .with_path_param("id", "7");
        let spec = MappingSpec::from_pairs([
            ("literal", "not an expression"),
            ("broken", "$input.path('$.x')"),
            ("unknown", "$input.nope('x')"),
            ("missing", "$input.json('user.email')"),
            ("zero", "$input.json('user.zero')"),
            ("name", "$input.json('user.name')"),
            ("id", "$input.params('id')"),
        ]);

        let event = build_event(&request, Some(&spec));
        assert_eq!(Value::Object(event), json!({ "name": "a", "id": "7" }));
    }

    #[test]
    fn explicit_mapping_keeps_spec_order() {
        let request = InboundRequest::new("r", "/")
            .with_path_param("b", "1")
            .with_path_param("a", "2");
        let spec = MappingSpec::from_pairs([
            ("second", "$input.params('b')"),
            ("first", "$input.params('a')"),
        ]);
        let event = build_event(&request, Some(&spec));
        let keys: Vec<&String> = event.keys().collect();
        assert_eq!(keys, vec!["second", "first"]);
    }

    #[test]
    fn string_template_with_bare_json_calls_is_prequoted() {
        let source = json!(r#"{ "name": $input.json('$.user.name'), "id": "$input.params('id')" }"#);
        let spec = MappingSpec::from_source(&source).unwrap();
        assert_eq!(spec.fields().collect::<Vec<_>>(), vec!["name", "id"]);

        let request = InboundRequest::new("r", "/")
            .with_body(json!({ "user": { "name": "bob" } }))
            .with_path_param("id", "9");
        let event = spec.apply(&request);
        assert_eq!(Value::Object(event), json!({ "name": "bob", "id": "9" }));
    }

    #[test]
    fn malformed_string_template_is_rejected() {
        assert!(matches!(
            MappingSpec::from_source(&json!("{ not json")),
            Err(TemplateError::Json(_))
        ));
        assert!(matches!(
            MappingSpec::from_source(&json!("[1, 2]")),
            Err(TemplateError::NotAnObject("array"))
        ));
        assert!(matches!(
            MappingSpec::from_source(&json!(5)),
            Err(TemplateError::NotAnObject("number"))
        ));
    }

    #[test]
    fn templates_without_json_entry_select_fallback() {
        let mut templates = Map::new();
        assert_eq!(
            RequestMapping::from_templates(&templates).unwrap(),
            RequestMapping::Fallback
        );

        templates.insert("text/plain".into(), json!({ "a": "$input.params('a')" }));
        templates.insert(JSON_CONTENT_TYPE.into(), json!(""));
        assert_eq!(
            RequestMapping::from_templates(&templates).unwrap(),
            RequestMapping::Fallback
        );

        templates.insert(JSON_CONTENT_TYPE.into(), json!({ "a": "$input.params('a')" }));
        assert!(matches!(
            RequestMapping::from_templates(&templates).unwrap(),
            RequestMapping::Explicit(spec) if spec.len() == 1
        ));
    }
}
