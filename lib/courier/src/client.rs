//! Transport executor built on hyper-util.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use courier_core::{Parts, ResponseHeaders};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::timeout::{TimeoutLayer, error::Elapsed};
use tower::util::BoxCloneService;
use tower::{BoxError, Layer, ServiceExt};
use tower_service::Service;

use crate::{
    Error, Request, Response, Result,
    config::ClientConfig,
    connector::https_connector,
    middleware::{FollowRedirectLayer, LogLevel, LoggingLayer, RetryLayer, RetryPolicy},
};

// ============================================================================
// Type-Erased Service for Middleware Composition
// ============================================================================

/// Type-erased service for middleware composition.
pub type BoxedService = BoxCloneService<Request, Response, Error>;

/// Future type for Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// `BoxCloneService` is not `Sync`; the mutex only guards cloning it.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: Request) -> ServiceFuture {
        let service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.oneshot(request).await })
    }
}

// ============================================================================
// Raw Client
// ============================================================================

/// One round trip on the wire.
#[derive(Clone)]
struct RawHyperClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl RawHyperClient {
    fn new(config: &ClientConfig) -> Self {
        let connector = https_connector(config.connect_timeout);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self { inner }
    }

    fn build_hyper_request(request: Request) -> Result<http::Request<Full<Bytes>>> {
        let Parts {
            method,
            url,
            headers,
            body,
            ..
        } = request.into_parts();

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder
            .body(body.map_or_else(Full::default, Full::new))
            .map_err(|e| Error::invalid_request(e.to_string()))
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        let hyper_request = Self::build_hyper_request(request)?;

        let response = self
            .inner
            .request(hyper_request)
            .await
            .map_err(map_hyper_error)?;

        let status = response.status().as_u16();
        let headers = ResponseHeaders::from(response.headers());
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        Ok(Response::new(status, headers, body))
    }
}

impl Service<Request> for RawHyperClient {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.execute(request).await })
    }
}

/// Map a hyper-util failure onto the transport error variants.
#[allow(clippy::needless_pass_by_value)]
fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
    let mut message = err.to_string();
    let mut source: Option<&(dyn StdError + 'static)> = err.source();

    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return Error::Timeout;
            }
            if io
                .get_ref()
                .is_some_and(|inner| inner.is::<rustls::Error>())
            {
                return Error::tls(format!("{message}: {io}"));
            }
        }
        if cause.is::<rustls::Error>() {
            return Error::tls(format!("{message}: {cause}"));
        }
        message = format!("{message}: {cause}");
        source = cause.source();
    }

    let lower = message.to_ascii_lowercase();
    if lower.contains("certificate") || lower.contains("tls") {
        return Error::tls(message);
    }
    Error::connection(message)
}

/// Bring an error from the timeout layer back into [`Error`].
fn map_timeout_error(err: BoxError) -> Error {
    match err.downcast::<Error>() {
        Ok(err) => *err,
        Err(err) if err.is::<Elapsed>() => Error::Timeout,
        Err(err) => Error::connection(err.to_string()),
    }
}

// ============================================================================
// Public Client
// ============================================================================

/// Transport executor: hyper with rustls, wrapped in logging, retry and
/// redirect layers according to its [`ClientConfig`].
///
/// # Example
///
/// ```ignore
/// use courier::{ClientConfig, HyperClient};
///
/// let client = HyperClient::new(ClientConfig::default());
/// let response = client.execute(request).await?;
/// ```
#[derive(Clone)]
pub struct HyperClient {
    service: SyncService,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Client with the default layer stack for `config`.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> HyperClientBuilder {
        HyperClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one exchange, retries and redirects included.
    ///
    /// Any status is returned as a [`Response`]; only transport failures are errors.
    ///
    /// # Errors
    ///
    /// Returns a transport error once retries are exhausted, or
    /// [`Error::InvalidRequest`] if the request cannot be put on the wire.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.service.call(request).await
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Service<Request> for HyperClient {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.service.call(request)
    }
}

/// Builder for [`HyperClient`].
#[derive(Debug, Default)]
pub struct HyperClientBuilder {
    config: ClientConfig,
    log_level: LogLevel,
}

impl HyperClientBuilder {
    /// Use this configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Log at debug level, including request headers (credentials redacted).
    #[must_use]
    pub const fn debug_logging(mut self) -> Self {
        self.log_level = LogLevel::Debug;
        self
    }

    /// Build the client: logging, then retry, then the attempt timeout, then
    /// redirects, then hyper.
    ///
    /// The timeout bounds one whole attempt, redirect hops included.
    #[must_use]
    pub fn build(self) -> HyperClient {
        let config = self.config;
        let mut service: BoxedService = BoxCloneService::new(RawHyperClient::new(&config));

        if config.follow_redirects {
            service = BoxCloneService::new(
                FollowRedirectLayer::with_max_redirects(config.max_redirects).layer(service),
            );
        }

        service = BoxCloneService::new(
            TimeoutLayer::new(config.timeout)
                .layer(service)
                .map_err(map_timeout_error),
        );

        service = BoxCloneService::new(
            RetryLayer::new(RetryPolicy::new(config.retry_count, config.retry_pause))
                .layer(service),
        );

        let logging = match self.log_level {
            LogLevel::Debug => LoggingLayer::debug(),
            LogLevel::Info => LoggingLayer::new(),
        };
        service = BoxCloneService::new(logging.layer(service));

        HyperClient {
            service: SyncService::new(service),
            config,
        }
    }
}
