//! Follow redirect middleware.
//!
//! 3xx responses with a `Location` header are followed, up to a maximum count.
//! Relative locations resolve against the current URL. A redirect status
//! without `Location` is handed back as the final response.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use courier_core::{Parts, remove_header};
use tower::{Layer, Service, ServiceExt};
use tracing::debug;
use url::Url;

use crate::{Error, Method, Request, Response, Result};

/// Default maximum number of redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Layer that follows HTTP redirects.
#[derive(Debug, Clone)]
pub struct FollowRedirectLayer {
    max_redirects: usize,
}

impl Default for FollowRedirectLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowRedirectLayer {
    /// Create a new follow redirect layer with default max redirects (10).
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_redirects(DEFAULT_MAX_REDIRECTS)
    }

    /// Create a new follow redirect layer with a custom max redirects.
    #[must_use]
    pub const fn with_max_redirects(max_redirects: usize) -> Self {
        Self { max_redirects }
    }
}

impl<S> Layer<S> for FollowRedirectLayer {
    type Service = FollowRedirect<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FollowRedirect {
            inner,
            max_redirects: self.max_redirects,
        }
    }
}

/// Service that follows HTTP redirects.
#[derive(Debug, Clone)]
pub struct FollowRedirect<S> {
    inner: S,
    max_redirects: usize,
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// 301, 302 and 303 switch to GET; 307 and 308 keep the method.
fn redirect_method(status: u16, original: Method) -> Method {
    match status {
        307 | 308 => original,
        _ => Method::Get,
    }
}

fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    base_url
        .join(location)
        .map_err(|err| Error::InvalidRedirect(format!("bad Location {location:?}: {err}")))
}

fn same_origin_host(from: &Url, to: &Url) -> bool {
    from.host_str() == to.host_str() && from.port_or_known_default() == to.port_or_known_default()
}

/// Build the follow-up request for a redirect response.
fn next_request(current: Request, status: u16, location: Url) -> Request {
    let Parts {
        method,
        url,
        mut headers,
        body,
        keep_auth_on_redirect,
    } = current.into_parts();

    let method = redirect_method(status, method);
    let body = if method == Method::Get || method == Method::Head {
        remove_header(&mut headers, "Content-Type");
        remove_header(&mut headers, "Content-Length");
        None
    } else {
        body
    };
    if !keep_auth_on_redirect && !same_origin_host(&url, &location) {
        remove_header(&mut headers, "Authorization");
    }

    Request::from_parts(Parts {
        method,
        url: location,
        headers,
        body: body.filter(|bytes: &Bytes| !bytes.is_empty()),
        keep_auth_on_redirect,
    })
}

impl<S> Service<Request> for FollowRedirect<S>
where
    S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let max_redirects = self.max_redirects;

        Box::pin(async move {
            let mut current = request;
            let mut redirects = 0;

            loop {
                let response = inner.ready().await?.call(current.clone()).await?;
                let status = response.status();
                if !is_redirect(status) {
                    return Ok(response);
                }

                let Some(location) = response.header("location") else {
                    debug!(status, url = %current.url(), "redirect without Location, not followed");
                    return Ok(response);
                };

                if redirects >= max_redirects {
                    return Err(Error::TooManyRedirects {
                        count: redirects,
                        max: max_redirects,
                    });
                }

                let location = resolve_redirect_url(current.url(), location)?;
                debug!(status, from = %current.url(), to = %location, "following redirect");

                current = next_request(current, status, location);
                redirects += 1;
            }
        })
    }
}
