// src/payload.rs
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::errors::{Result, RunnerError};

/// Data sent along with a request: either a JSON object or a raw string.
///
/// For GET and DELETE it becomes the query string, for POST and PUT the body.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Map(Map<String, Value>),
    Raw(String),
}

impl Data {
    /// Converts any serializable struct into `Data::Map`.
    /// Fails if the value does not serialize to a JSON object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Data::Map(map)),
            other => Err(RunnerError::Validation(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    /// JSON text used as the request body.
    pub fn to_body(&self) -> Result<String> {
        let body = match self {
            Data::Map(map) => serde_json::to_string(map)?,
            Data::Raw(raw) => serde_json::to_string(raw)?,
        };
        Ok(body)
    }

    fn query_pairs(&self) -> String {
        match self {
            Data::Map(map) => map
                .iter()
                .filter(|(k, v)| !k.is_empty() && !v.is_null())
                .map(|(k, v)| format!("{}={}", k, query_value(v)))
                .collect::<Vec<_>>()
                .join("&"),
            Data::Raw(raw) => raw.clone(),
        }
    }
}

impl From<Map<String, Value>> for Data {
    fn from(map: Map<String, Value>) -> Self {
        Data::Map(map)
    }
}

impl From<String> for Data {
    fn from(raw: String) -> Self {
        Data::Raw(raw)
    }
}

impl From<&str> for Data {
    fn from(raw: &str) -> Self {
        Data::Raw(raw.to_string())
    }
}

/// Renders a query value the way a browser stringifies it: arrays are
/// comma joined with nulls left empty. Objects stay as JSON text.
fn query_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(query_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Builds the query string appended to GET/DELETE endpoints.
///
/// Absent data gives an empty string; present data always gets the `?`
/// prefix, even when every entry was filtered out.
pub fn query_string(data: Option<&Data>) -> String {
    match data {
        Some(data) => format!("?{}", data.query_pairs()),
        None => String::new(),
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Blob(Vec<u8>),
    Text(String),
}

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const CSV_CONTENT_TYPE: &str = "text/csv";

impl Payload {
    /// Decodes a body according to its declared content type.
    /// A missing content type is treated as JSON.
    pub fn decode(content_type: Option<&str>, body: &[u8]) -> Result<Self> {
        // Matched on the media type alone, so `application/json; charset=utf-8`
        // is JSON. An exact string comparison would return it as text.
        match media_type(content_type.unwrap_or(JSON_CONTENT_TYPE)).as_str() {
            JSON_CONTENT_TYPE => Ok(Payload::Json(serde_json::from_slice(body)?)),
            CSV_CONTENT_TYPE => Ok(Payload::Blob(body.to_vec())),
            _ => Ok(Payload::Text(String::from_utf8_lossy(body).into_owned())),
        }
    }

    /// Like `decode`, but an unparseable JSON body falls back to text.
    /// Used for error responses so the status code is never lost.
    pub fn decode_lenient(content_type: Option<&str>, body: &[u8]) -> Self {
        Self::decode(content_type, body)
            .unwrap_or_else(|_| Payload::Text(String::from_utf8_lossy(body).into_owned()))
    }

    /// True for JSON objects, the only shape that counts as a structured reply.
    pub fn is_structured(&self) -> bool {
        matches!(self, Payload::Json(Value::Object(_)))
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Payload::Json(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// The payload as a plain string, for text bodies and JSON strings.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    /// A top-level object field rendered as text. Strings come back unquoted.
    pub fn field(&self, key: &str) -> Option<String> {
        match self.as_object()?.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Json(Value::String(s)) => write!(f, "{}", s),
            Payload::Json(value) => write!(f, "{}", value),
            Payload::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Payload::Text(text) => write!(f, "{}", text),
        }
    }
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
