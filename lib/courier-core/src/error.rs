//! Error types for courier.
//!
//! Every failure of an outbound exchange is one [`Error`] variant. Variants are
//! grouped into a small taxonomy, exposed through [`Error::kind`]:
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | [`ErrorKind::Transport`] | no response could be obtained after retries |
//! | [`ErrorKind::ServiceUnavailable`] | the remote answered with a 5xx status |
//! | [`ErrorKind::Validation`] | status 422, or a bound DTO failed validation |
//! | [`ErrorKind::Http`] | any other non-success status |
//! | [`ErrorKind::Configuration`] | the request could not be built; no I/O happened |
//! | [`ErrorKind::Codec`] | a body could not be encoded or decoded |
//! | [`ErrorKind::Cancelled`] | a background exchange was aborted by its caller |

use derive_more::{Display, Error, From};

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// Connection refused, DNS failure, TLS failure, timeout, broken redirect.
    #[display("transport")]
    Transport,
    /// The remote service answered with a server error.
    #[display("service unavailable")]
    ServiceUnavailable,
    /// Structured validation failure (remote 422 or local DTO validation).
    #[display("validation")]
    Validation,
    /// Other non-success HTTP status.
    #[display("http")]
    Http,
    /// Invalid request configuration, raised before any network I/O.
    #[display("configuration")]
    Configuration,
    /// Body serialization or deserialization failure.
    #[display("codec")]
    Codec,
    /// The exchange was abandoned before it finished.
    #[display("cancelled")]
    Cancelled,
}

/// Main error type for courier operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Non-success status other than 422 and 5xx.
    #[display("HTTP error {code}: {message}")]
    #[from(skip)]
    Http {
        /// Status code, possibly overridden by the error body.
        code: u16,
        /// Error message.
        message: String,
        /// Structured errors from the error body, if any.
        errors: Option<serde_json::Value>,
    },

    /// The remote service answered with a 5xx status.
    #[display("remote service not available: {message}")]
    #[from(skip)]
    ServiceUnavailable {
        /// Error message.
        message: String,
    },

    /// Validation failure, either remote (status 422) or local (DTO rules).
    #[display("validation failed: {message}")]
    #[from(skip)]
    Validation {
        /// Error message.
        message: String,
        /// Structured errors, usually a field to message(s) map.
        errors: serde_json::Value,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Connect or exchange timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Too many redirects.
    #[display("too many redirects ({count} exceeded max of {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Number of redirects followed.
        count: usize,
        /// Maximum allowed redirects.
        max: usize,
    },

    /// Invalid redirect response.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),

    /// The URL is malformed, has no host, or uses an unsupported scheme.
    #[display("invalid URL {url:?}: {reason}")]
    #[from(skip)]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested target type is not a registered DTO.
    #[display("type {_0:?} is not a registered DTO type")]
    #[from(skip)]
    TypeConstraint(#[error(not(source))] String),

    /// An ambient configuration value is present but unusable.
    #[display("invalid value {value:?} for environment variable {name}")]
    #[from(skip)]
    InvalidEnvironment {
        /// Variable name.
        name: String,
        /// Raw value.
        value: String,
    },

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_html_form::ser::Error),

    /// A background exchange was aborted before it completed.
    #[display("exchange cancelled")]
    #[from(skip)]
    Cancelled,
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an HTTP error from status code and message.
    #[must_use]
    pub fn http(code: u16, message: impl Into<String>) -> Self {
        Self::Http {
            code,
            message: message.into(),
            errors: None,
        }
    }

    /// Create a service unavailable error.
    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>, errors: serde_json::Value) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Taxonomy bucket of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Http { .. } => ErrorKind::Http,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Connection(_)
            | Self::Tls(_)
            | Self::Timeout
            | Self::TooManyRedirects { .. }
            | Self::InvalidRedirect(_) => ErrorKind::Transport,
            Self::InvalidUrl { .. }
            | Self::TypeConstraint(_)
            | Self::InvalidEnvironment { .. }
            | Self::InvalidRequest(_) => ErrorKind::Configuration,
            Self::JsonSerialization(_)
            | Self::JsonDeserialization { .. }
            | Self::FormSerialization(_) => ErrorKind::Codec,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns `true` if no response could be obtained.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport)
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the remote answered with a server error.
    #[must_use]
    pub const fn is_service_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. })
    }

    /// Returns `true` if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns `true` if the exchange was aborted by its caller.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if the request was rejected before any I/O.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration)
    }

    /// Returns the code carried by an HTTP error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Message of a classified error (HTTP, service unavailable, validation).
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Http { message, .. }
            | Self::ServiceUnavailable { message }
            | Self::Validation { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Structured errors carried by an HTTP or validation error.
    #[must_use]
    pub const fn errors(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Http { errors, .. } => errors.as_ref(),
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }
}
