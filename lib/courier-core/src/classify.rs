//! Status classification.
//!
//! [`classify`] turns a completed exchange into either success or one of the
//! classified error kinds. Error bodies are read as an envelope:
//!
//! ```json
//! {"message": "...", "error": "...", "errors": {...}, "result": 409}
//! ```
//!
//! `message` wins over `error`; `result` overrides the status code of an
//! [`Error::Http`]; `errors` carries structured validation details.

use serde_json::{Map, Value};

use crate::{Error, Response, Result};

const MESSAGE_KEY: &str = "message";
const ALTERNATE_MESSAGE_KEY: &str = "error";
const ERRORS_KEY: &str = "errors";
const CODE_KEY: &str = crate::body::RESULT_SECTION;

const UNPROCESSABLE_ENTITY: u16 = 422;

/// Returns `true` for statuses treated as success: `200 <= status < 400`.
#[must_use]
pub const fn is_success_status(status: u16) -> bool {
    status >= 200 && status < 400
}

/// Classify a completed exchange.
///
/// # Errors
///
/// - [`Error::ServiceUnavailable`] for `500..600`
/// - [`Error::Validation`] for `422`
/// - [`Error::Http`] for any other status outside `200..400`
pub fn classify(response: &Response) -> Result<()> {
    let status = response.status();
    if is_success_status(status) {
        return Ok(());
    }

    let decoded = crate::body::decode_lenient(response.body());
    let envelope = match &decoded {
        Value::Object(members) => Some(members),
        _ => None,
    };
    Err(classify_error(status, envelope))
}

/// Build the error for a non-success status from an optional decoded envelope.
#[must_use]
pub fn classify_error(status: u16, envelope: Option<&Map<String, Value>>) -> Error {
    let envelope = Envelope(envelope);
    match status {
        500..600 => Error::service_unavailable(
            envelope
                .text(MESSAGE_KEY)
                .unwrap_or_else(|| transport_message(status)),
        ),
        UNPROCESSABLE_ENTITY => Error::validation(
            envelope.message().unwrap_or_else(|| transport_message(status)),
            envelope
                .get(ERRORS_KEY)
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
        ),
        400..500 => Error::Http {
            code: envelope.code().unwrap_or(status),
            message: envelope.message().unwrap_or_else(|| transport_message(status)),
            errors: envelope.get(ERRORS_KEY).cloned(),
        },
        _ => Error::http(status, transport_message(status)),
    }
}

/// Text used when the body carries no message, e.g. `HTTP 503 Service Unavailable`.
#[must_use]
pub fn transport_message(status: u16) -> String {
    let reason = http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason());
    match reason {
        Some(reason) => format!("HTTP {status} {reason}"),
        None => format!("HTTP {status}"),
    }
}

struct Envelope<'a>(Option<&'a Map<String, Value>>);

impl Envelope<'_> {
    fn get(&self, key: &str) -> Option<&Value> {
        self.0
            .and_then(|members| members.get(key))
            .filter(|value| !value.is_null())
    }

    fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    fn message(&self) -> Option<String> {
        self.text(MESSAGE_KEY)
            .or_else(|| self.text(ALTERNATE_MESSAGE_KEY))
    }

    fn code(&self) -> Option<u16> {
        self.get(CODE_KEY)
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
    }
}
