//! The outbound request builder.
//!
//! [`OutboundRequest`] collects everything about one outgoing call, then
//! [`OutboundRequest::send`] runs the exchange, classifies the status and binds
//! the body:
//!
//! ```ignore
//! use courier::{Method, OutboundRequest};
//! use serde_json::json;
//!
//! let mut request = OutboundRequest::new("https://billing.internal/invoices")?;
//! request
//!     .set_method(Method::Post)
//!     .add_header("Content-Type", "application/json")
//!     .add_param("customer", json!({"id": 42}))
//!     .add_cookie("session", "abc");
//!
//! let response = request.send_as::<Invoice>().await?;
//! println!("{} -> {:?}", response.status(), response.result());
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use courier_core::{
    ConnectionContext, ContentType, Dto, DtoRegistry, Environment, Payload, ProcessEnvironment,
    RemoteResponse, TargetType, bind, bind_optional, classify, decode_lenient, find_header,
    flatten_params, remove_header, result_section, set_header, to_json,
};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use url::Url;

use crate::{ClientConfig, Error, HyperClient, Method, Request, Response, Result};

const COOKIE: &str = "Cookie";
const CONTENT_TYPE: &str = "Content-Type";
const AUTHORIZATION: &str = "Authorization";
const REQUESTED_WITH: &str = "X-Requested-With";
const XML_HTTP_REQUEST: &str = "XMLHttpRequest";

/// Resolve user input into an absolute `http`/`https` URL.
///
/// - `scheme://host/path` is used as is
/// - `//host/path` takes the scheme of the context (`http` without one)
/// - `/path` takes scheme and host from the context, which is then required
/// - `host/path` takes the scheme of the context (`http` without one)
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if the result is malformed, has no host, or
/// uses another scheme.
pub fn resolve_url(input: &str, context: Option<&ConnectionContext>) -> Result<Url> {
    let input = input.trim();
    let scheme = context.map_or("http", ConnectionContext::scheme);

    let candidate = if input.is_empty() {
        return Err(Error::invalid_url(input, "empty URL"));
    } else if input.contains("://") {
        input.to_string()
    } else if let Some(rest) = input.strip_prefix("//") {
        format!("{scheme}://{rest}")
    } else if input.starts_with('/') {
        let context = context.ok_or_else(|| {
            Error::invalid_url(input, "relative path without a connection context")
        })?;
        format!("{}://{}{input}", context.scheme(), context.host())
    } else {
        format!("{scheme}://{input}")
    };

    let url = Url::parse(&candidate).map_err(|err| Error::invalid_url(input, err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_url(
            input,
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::invalid_url(input, "missing host"));
    }
    Ok(url)
}

/// A configurable outgoing HTTP call.
///
/// Setters only mutate the builder; nothing touches the network until one of
/// the `send` methods runs. A failed send leaves the builder reusable.
#[derive(Clone)]
pub struct OutboundRequest {
    url: Url,
    context: Option<ConnectionContext>,
    method: Method,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    params: Map<String, Value>,
    target: Option<TargetType>,
    validate: bool,
    keep_auth_header: bool,
    credentials: Option<(String, String)>,
    config: Option<ClientConfig>,
    environment: Arc<dyn Environment>,
}

impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("cookies", &self.cookies.len())
            .field("params", &self.params)
            .field("target", &self.target)
            .field("validate", &self.validate)
            .field("keep_auth_header", &self.keep_auth_header)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OutboundRequest {
    /// Request to an absolute URL (or `host/path`, sent over `http`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] on malformed or host-less input.
    pub fn new(url: &str) -> Result<Self> {
        Self::build(url, None)
    }

    /// Request with initial parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] on malformed or host-less input.
    pub fn with_params(url: &str, params: Map<String, Value>) -> Result<Self> {
        let mut request = Self::new(url)?;
        request.params = params;
        Ok(request)
    }

    /// Request whose relative URLs resolve against `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] on malformed or host-less input.
    pub fn with_context(url: &str, context: &ConnectionContext) -> Result<Self> {
        Self::build(url, Some(context.clone()))
    }

    fn build(url: &str, context: Option<ConnectionContext>) -> Result<Self> {
        Ok(Self {
            url: resolve_url(url, context.as_ref())?,
            context,
            method: Method::default(),
            headers: Vec::new(),
            cookies: Vec::new(),
            params: Map::new(),
            target: None,
            validate: false,
            keep_auth_header: true,
            credentials: None,
            config: None,
            environment: Arc::new(ProcessEnvironment),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Resolved target URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Value of a header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Cookies in insertion order.
    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Request parameters.
    #[must_use]
    pub const fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Requested bind target, if any.
    #[must_use]
    pub const fn target_type(&self) -> Option<TargetType> {
        self.target
    }

    /// Whether bound results are validated.
    #[must_use]
    pub const fn is_validation_enabled(&self) -> bool {
        self.validate
    }

    // ========================================================================
    // Setters
    // ========================================================================

    /// Point the request at another URL, resolved against the connection context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] and leaves the current URL unchanged.
    pub fn set_url(&mut self, url: &str) -> Result<&mut Self> {
        self.url = resolve_url(url, self.context.as_ref())?;
        Ok(self)
    }

    /// Set the HTTP method.
    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    /// Set a header, replacing any header with the same name whatever its case.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Remove a header, ignoring case.
    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        remove_header(&mut self.headers, name);
        self
    }

    /// Remove every header.
    pub fn clear_headers(&mut self) -> &mut Self {
        self.headers.clear();
        self
    }

    /// Replace every header.
    pub fn set_headers<N, V>(&mut self, headers: impl IntoIterator<Item = (N, V)>) -> &mut Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.headers.clear();
        for (name, value) in headers {
            self.add_header(name, value);
        }
        self
    }

    /// Replace every cookie.
    pub fn set_cookies<N, V>(&mut self, cookies: impl IntoIterator<Item = (N, V)>) -> &mut Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.cookies.clear();
        for (name, value) in cookies {
            self.add_cookie(name, value);
        }
        self
    }

    /// Add a cookie; an existing cookie with that name keeps its position.
    pub fn add_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.cookies.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.cookies.push((name, value)),
        }
        self
    }

    /// Remove a cookie.
    pub fn remove_cookie(&mut self, name: &str) -> &mut Self {
        self.cookies.retain(|(key, _)| key != name);
        self
    }

    /// Replace every parameter.
    pub fn set_params(&mut self, params: Map<String, Value>) -> &mut Self {
        self.params = params;
        self
    }

    /// Add or replace one parameter. Nested objects and arrays are allowed.
    pub fn add_param(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Send `Authorization: Basic` with these credentials.
    ///
    /// Without explicit credentials, `SERVICES_HTTP_AUTH_USER` and
    /// `SERVICES_HTTP_AUTH_PASSWORD` are used when both are set.
    pub fn set_basic_auth(
        &mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    /// Whether `Authorization` survives a redirect to another host (default `true`).
    pub fn set_keep_auth_header(&mut self, keep: bool) -> &mut Self {
        self.keep_auth_header = keep;
        self
    }

    /// Run DTO validation on bound results (default `false`).
    pub fn set_validation_enabled(&mut self, enabled: bool) -> &mut Self {
        self.validate = enabled;
        self
    }

    /// Use this configuration instead of the ambient one.
    pub fn set_config(&mut self, config: ClientConfig) -> &mut Self {
        self.config = Some(config);
        self
    }

    /// Read ambient configuration from `environment` instead of the process.
    pub fn set_environment(&mut self, environment: impl Environment + 'static) -> &mut Self {
        self.environment = Arc::new(environment);
        self
    }

    /// Bind successful bodies into `target`.
    pub fn set_target_type(&mut self, target: TargetType) -> &mut Self {
        self.target = Some(target);
        self
    }

    /// Bind successful bodies into the type registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeConstraint`] if `name` is not registered; the
    /// current target is left unchanged.
    pub fn set_target_type_name(&mut self, registry: &DtoRegistry, name: &str) -> Result<&mut Self> {
        self.target = Some(registry.resolve(name)?);
        Ok(self)
    }

    /// Pass successful bodies through as JSON values.
    pub fn clear_target_type(&mut self) -> &mut Self {
        self.target = None;
        self
    }

    /// Mark the request as an XHR with `X-Requested-With: XMLHttpRequest`.
    pub fn set_ajax(&mut self, ajax: bool) -> &mut Self {
        if ajax {
            self.add_header(REQUESTED_WITH, XML_HTTP_REQUEST)
        } else {
            self.remove_header(REQUESTED_WITH)
        }
    }

    // ========================================================================
    // Send
    // ========================================================================

    /// Run the exchange and bind the body into the target type, if any.
    ///
    /// Only a JSON object is bound; any other success body (empty, `null`,
    /// array, non-JSON) is passed through as [`Payload::Value`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any I/O, a transport error once
    /// retries are exhausted, a classified error for non-success statuses, or
    /// a codec/validation error if the body cannot be bound.
    pub async fn send(&self) -> Result<RemoteResponse> {
        let response = self.exchange().await?;
        classify(&response)?;

        let (status, headers, body) = response.into_parts();
        let value = decode_success(&body);
        let payload: Payload = bind(value, self.target, self.validate)?;
        Ok(RemoteResponse::new(payload, status, headers, body))
    }

    /// Run the exchange and bind the body into `T`.
    ///
    /// The result is `None` when the success body holds no JSON object, e.g. a
    /// `204` or `{"result": null}`.
    ///
    /// # Errors
    ///
    /// See [`OutboundRequest::send`].
    pub async fn send_as<T: Dto>(&self) -> Result<RemoteResponse<Option<T>>> {
        let response = self.exchange().await?;
        classify(&response)?;

        let (status, headers, body) = response.into_parts();
        let value = decode_success(&body);
        let result = bind_optional::<T>(value, self.validate)?;
        Ok(RemoteResponse::new(result, status, headers, body))
    }

    /// Start the exchange in the background and return at once.
    ///
    /// The request is built now, so configuration errors surface here. The
    /// [`Dispatch`] only reports transport failures: the status is neither
    /// classified nor the body decoded.
    ///
    /// # Errors
    ///
    /// Returns a configuration error, or [`Error::InvalidRequest`] outside a
    /// tokio runtime.
    pub fn send_async(&self) -> Result<Dispatch> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|err| Error::invalid_request(format!("no async runtime: {err}")))?;
        let (client, request) = self.prepare()?;
        let task = handle.spawn(async move { client.execute(request).await.map(|r| r.status()) });
        Ok(Dispatch { task })
    }

    async fn exchange(&self) -> Result<Response> {
        let (client, request) = self.prepare()?;
        client.execute(request).await
    }

    fn prepare(&self) -> Result<(HyperClient, Request)> {
        let config = match &self.config {
            Some(config) => config.clone(),
            None => ClientConfig::from_environment(self.environment.as_ref())?,
        };
        Ok((HyperClient::new(config), self.build_request()?))
    }

    fn build_request(&self) -> Result<Request> {
        let mut builder = Request::builder(self.method, self.url.clone())
            .headers(self.headers.iter().cloned())
            .keep_auth_on_redirect(self.keep_auth_header);

        if let Some(cookie) = self.cookie_header() {
            builder = builder.header(COOKIE, cookie);
        }

        let credentials = self.credentials.clone().or_else(|| {
            self.header(AUTHORIZATION)
                .is_none()
                .then(|| self.environment.credentials())
                .flatten()
        });
        if let Some((user, password)) = credentials {
            builder = builder.basic_auth(user, password);
        }

        if !self.params.is_empty() {
            let pairs = flatten_params(&self.params);
            builder = if !self.method.carries_body() {
                builder.query_pairs(pairs)
            } else if self
                .header(CONTENT_TYPE)
                .is_some_and(|value| ContentType::Json.matches(value))
            {
                builder.body(to_json(&self.params)?)
            } else {
                builder.form(&pairs)?
            };
        }

        Ok(builder.build())
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let cookie = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        Some(cookie)
    }
}

/// Decode a success body: empty or non-JSON bodies are `null`, and a `result`
/// member is unwrapped.
fn decode_success(body: &Bytes) -> Value {
    result_section(decode_lenient(body))
}

/// Handle on an exchange started by [`OutboundRequest::send_async`].
#[derive(Debug)]
pub struct Dispatch {
    task: JoinHandle<Result<u16>>,
}

impl Dispatch {
    /// Wait for the exchange and return the raw status code.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the exchange, if any.
    pub async fn wait(self) -> Result<u16> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(Error::Cancelled),
        }
    }

    /// Returns `true` once the exchange has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abandon the exchange; a later [`Dispatch::wait`] returns [`Error::Cancelled`].
    pub fn abort(&self) {
        self.task.abort();
    }
}
