//! Ambient configuration and connection context.

use std::collections::HashMap;
use std::time::Duration;

use crate::{Error, Result};

/// Total per-attempt exchange timeout, in milliseconds.
pub const HTTP_TIMEOUT: &str = "SERVICES_HTTP_TIMEOUT";
/// Connect timeout, in milliseconds.
pub const HTTP_CONNECT_TIMEOUT: &str = "SERVICES_HTTP_CONNECT_TIMEOUT";
/// Number of retries after the first attempt.
pub const HTTP_RETRY_COUNT: &str = "SERVICES_HTTP_RETRY_COUNT";
/// Pause before each retry, in milliseconds.
pub const HTTP_RETRY_PAUSE: &str = "SERVICES_HTTP_RETRY_PAUSE";
/// Default basic-auth user.
pub const HTTP_AUTH_USER: &str = "SERVICES_HTTP_AUTH_USER";
/// Default basic-auth password.
pub const HTTP_AUTH_PASSWORD: &str = "SERVICES_HTTP_AUTH_PASSWORD";

/// Source of ambient configuration values.
pub trait Environment: Send + Sync {
    /// Raw value of a variable, if set.
    fn get(&self, name: &str) -> Option<String>;

    /// A variable parsed as a number of milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnvironment`] if the variable is set but is not
    /// a non-negative integer.
    fn millis(&self, name: &str) -> Result<Option<Duration>> {
        self.number(name).map(|value| value.map(Duration::from_millis))
    }

    /// A variable parsed as a non-negative integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnvironment`] if the variable is set but unparsable.
    fn number(&self, name: &str) -> Result<Option<u64>> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidEnvironment {
                name: name.to_string(),
                value,
            })
    }

    /// Basic-auth credentials, when both user and password are set.
    fn credentials(&self) -> Option<(String, String)> {
        Some((self.get(HTTP_AUTH_USER)?, self.get(HTTP_AUTH_PASSWORD)?))
    }
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|value| !value.is_empty())
    }
}

impl Environment for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Where relative URLs are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    host: String,
    secure: bool,
}

impl ConnectionContext {
    /// Context for `host` (may carry a port).
    #[must_use]
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
        }
    }

    /// Host, possibly with port.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether the connection is secure.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// `https` when secure, else `http`.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }
}
