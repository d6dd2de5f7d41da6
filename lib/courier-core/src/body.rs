//! Body serialization utilities.

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::Result;

/// Name of the member that wraps the payload of a successful response.
pub const RESULT_SECTION: &str = "result";

/// Content type for request and response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// HTML content type (`text/html`).
    Html,
    /// Plain text content type (`text/plain`).
    PlainText,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::Html => "text/html",
            Self::PlainText => "text/plain",
        }
    }

    /// Returns `true` if a header value names this content type, ignoring parameters.
    ///
    /// ```
    /// use courier_core::ContentType;
    ///
    /// assert!(ContentType::Json.matches("Application/JSON; charset=utf-8"));
    /// assert!(!ContentType::Json.matches("text/html"));
    /// ```
    #[must_use]
    pub fn matches(&self, header_value: &str) -> bool {
        header_value
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(self.as_str()))
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
///
/// Accepts anything `serde_html_form` does, including a slice of `(name, value)` pairs.
///
/// # Errors
///
/// Returns an error if form serialization fails.
///
/// # Example
///
/// ```
/// use courier_core::to_form;
///
/// let bytes = to_form(&[("username", "alice"), ("password", "s3cr&t")]).expect("serialize");
/// assert_eq!(bytes.as_ref(), b"username=alice&password=s3cr%26t");
/// ```
pub fn to_form<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

/// Deserialize an already decoded JSON value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if the value does not fit `T`.
pub fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

/// Flatten nested parameters into `(name, value)` pairs using bracket notation.
///
/// Objects nest as `outer[inner]`, arrays as `list[0]`. `null` leaves are skipped,
/// booleans become `1` / `0`, strings are used verbatim, numbers use their JSON text.
///
/// ```
/// use courier_core::flatten_params;
/// use serde_json::json;
///
/// let params = json!({"user": {"name": "Ann", "tags": ["a", "b"]}, "draft": false});
/// let pairs = flatten_params(params.as_object().unwrap());
/// assert_eq!(pairs, vec![
///     ("user[name]".to_string(), "Ann".to_string()),
///     ("user[tags][0]".to_string(), "a".to_string()),
///     ("user[tags][1]".to_string(), "b".to_string()),
///     ("draft".to_string(), "0".to_string()),
/// ]);
/// ```
#[must_use]
pub fn flatten_params(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (name, value) in params {
        flatten_into(&mut pairs, name.clone(), value);
    }
    pairs
}

fn flatten_into(pairs: &mut Vec<(String, String)>, prefix: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => pairs.push((prefix, if *flag { "1" } else { "0" }.to_string())),
        Value::Number(number) => pairs.push((prefix, number.to_string())),
        Value::String(text) => pairs.push((prefix, text.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(pairs, format!("{prefix}[{index}]"), item);
            }
        }
        Value::Object(members) => {
            for (key, member) in members {
                flatten_into(pairs, format!("{prefix}[{key}]"), member);
            }
        }
    }
}

/// Decode a response body leniently: empty or non-JSON bodies become `null`.
#[must_use]
pub fn decode_lenient(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// Unwrap the `result` member of an object, or return the value unchanged.
#[must_use]
pub fn result_section(value: Value) -> Value {
    match value {
        Value::Object(mut members) if members.contains_key(RESULT_SECTION) => members
            .remove(RESULT_SECTION)
            .unwrap_or(Value::Null),
        other => other,
    }
}
