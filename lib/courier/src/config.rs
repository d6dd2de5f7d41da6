//! Client configuration types.

use std::time::Duration;

use courier_core::{
    Environment, HTTP_CONNECT_TIMEOUT, HTTP_RETRY_COUNT, HTTP_RETRY_PAUSE, HTTP_TIMEOUT, Result,
};

/// Configuration for outbound exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Total timeout of one attempt, from sending to the last body byte.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Retries after the first attempt on transport failure or 5xx.
    pub retry_count: u32,
    /// Pause before each retry.
    pub retry_pause: Duration,
    /// Whether 3xx responses with a `Location` are followed.
    pub follow_redirects: bool,
    /// Maximum number of redirects followed for one attempt.
    pub max_redirects: usize,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            connect_timeout: Duration::from_millis(500),
            retry_count: 1,
            retry_pause: Duration::from_millis(10),
            follow_redirects: true,
            max_redirects: 10,
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Defaults overridden by the `SERVICES_HTTP_*` variables found in `env`.
    ///
    /// # Errors
    ///
    /// Returns [`courier_core::Error::InvalidEnvironment`] if a variable is set
    /// but is not a non-negative integer.
    pub fn from_environment(env: &dyn Environment) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(timeout) = env.millis(HTTP_TIMEOUT)? {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = env.millis(HTTP_CONNECT_TIMEOUT)? {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(count) = env.number(HTTP_RETRY_COUNT)? {
            builder = builder.retry_count(u32::try_from(count).unwrap_or(u32::MAX));
        }
        if let Some(pause) = env.millis(HTTP_RETRY_PAUSE)? {
            builder = builder.retry_pause(pause);
        }
        Ok(builder.build())
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry_count: Option<u32>,
    retry_pause: Option<Duration>,
    follow_redirects: Option<bool>,
    max_redirects: Option<usize>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the number of retries after the first attempt.
    #[must_use]
    pub const fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Set the pause before each retry.
    #[must_use]
    pub const fn retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = Some(pause);
        self
    }

    /// Set whether redirects are followed.
    #[must_use]
    pub const fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    /// Set the maximum number of redirects.
    #[must_use]
    pub const fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = Some(max);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            retry_count: self.retry_count.unwrap_or(defaults.retry_count),
            retry_pause: self.retry_pause.unwrap_or(defaults.retry_pause),
            follow_redirects: self.follow_redirects.unwrap_or(defaults.follow_redirects),
            max_redirects: self.max_redirects.unwrap_or(defaults.max_redirects),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
        }
    }
}
