//! HTTP response handling.
//!
//! - [`Response`] is the raw outcome of one exchange: status, headers, body bytes.
//! - [`RemoteResponse`] is what a successful, classified exchange hands back to the
//!   caller: the bound payload next to the status and headers.

use bytes::Bytes;

use crate::{Payload, ResponseHeaders};

// ============================================================================
// Raw Response
// ============================================================================

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: ResponseHeaders,
    body: Bytes,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: ResponseHeaders, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// First value of a header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, ResponseHeaders, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        crate::from_json(&self.body)
    }
}

// ============================================================================
// Remote Response
// ============================================================================

/// Result of a completed, successful exchange.
///
/// `T` is [`Payload`] for untyped sends, or the DTO type for typed sends.
#[derive(Debug, Clone)]
pub struct RemoteResponse<T = Payload> {
    result: T,
    status: u16,
    headers: ResponseHeaders,
    body: Bytes,
}

impl<T> RemoteResponse<T> {
    /// Assemble a remote response.
    #[must_use]
    pub fn new(result: T, status: u16, headers: ResponseHeaders, body: Bytes) -> Self {
        Self {
            result,
            status,
            headers,
            body,
        }
    }

    /// The bound result.
    #[must_use]
    pub const fn result(&self) -> &T {
        &self.result
    }

    /// Consume into the bound result.
    #[must_use]
    pub fn into_result(self) -> T {
        self.result
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// First value of a header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Raw body bytes as received.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }
}
