//! Relay payload validation
//!
//! Public relays answer 200 with whatever they got, including their own HTML
//! error pages, and some wrap the upstream body in a JSON envelope with the
//! original text under `contents`. A body is accepted only when it is JSON,
//! its envelope (if any) unwraps to JSON, and the result has a recognized
//! provider shape.

use super::FetchError;
use serde_json::{Map, Value};

/// Provider payload that passed shape validation
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    /// Object with a non-empty `response` field
    Response(Value),
    /// Object reporting `"status": "success"` without a `response` field
    Success(Map<String, Value>),
    /// Bare JSON array
    List(Vec<Value>),
}

impl ProviderPayload {
    /// Classify an unwrapped payload
    pub fn classify(value: Value) -> Result<Self, FetchError> {
        match value {
            Value::Array(items) => Ok(ProviderPayload::List(items)),
            Value::Object(mut map) => {
                match map.remove("response") {
                    Some(response) if is_truthy(&response) => {
                        return Ok(ProviderPayload::Response(response))
                    }
                    Some(response) => {
                        map.insert("response".to_string(), response);
                    }
                    None => {}
                }
                if map.get("status").and_then(Value::as_str) == Some("success") {
                    Ok(ProviderPayload::Success(map))
                } else {
                    Err(FetchError::Malformed(
                        "object has neither a response nor a success status".to_string(),
                    ))
                }
            }
            other => Err(FetchError::Malformed(format!(
                "unexpected top-level {}",
                json_kind(&other)
            ))),
        }
    }

    /// Records carried by the payload
    ///
    /// A `response` array yields its items, a single `response` object yields
    /// itself, a bare list yields its items and a status-only payload yields
    /// nothing.
    pub fn into_records(self) -> Vec<Value> {
        match self {
            ProviderPayload::Response(Value::Array(items)) => items,
            ProviderPayload::Response(other) => vec![other],
            ProviderPayload::List(items) => items,
            ProviderPayload::Success(_) => Vec::new(),
        }
    }
}

/// True for bodies starting with `<!DOCTYPE` or `<html`
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(9).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Parse a response body as JSON
///
/// HTML is reported as [`FetchError::HtmlPayload`] so it is retried; an empty
/// or unparseable body is [`FetchError::Malformed`].
pub fn parse_json_body(body: &str) -> Result<Value, FetchError> {
    let trimmed = body.trim();
    if looks_like_html(trimmed) {
        return Err(FetchError::HtmlPayload);
    }
    if trimmed.is_empty() {
        return Err(FetchError::Malformed("empty body".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|e| FetchError::Malformed(format!("invalid JSON: {e}")))
}

/// Unwrap one level of relay envelope
///
/// A string `contents` field is parsed again as JSON; a structured one is
/// taken as is. Anything else passes through untouched.
pub fn unwrap_envelope(value: Value) -> Result<Value, FetchError> {
    let mut map = match value {
        Value::Object(map) => map,
        other => return Ok(other),
    };

    match map.remove("contents") {
        Some(Value::String(inner)) => {
            let inner = inner.trim();
            if looks_like_html(inner) {
                return Err(FetchError::HtmlPayload);
            }
            serde_json::from_str(inner)
                .map_err(|e| FetchError::Malformed(format!("envelope contents are not JSON: {e}")))
        }
        Some(Value::Null) | None => Ok(Value::Object(map)),
        Some(inner) => Ok(inner),
    }
}

/// Full validation of a relay response body
pub fn validate_body(body: &str) -> Result<ProviderPayload, FetchError> {
    let value = parse_json_body(body)?;
    let unwrapped = unwrap_envelope(value)?;
    ProviderPayload::classify(unwrapped)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
