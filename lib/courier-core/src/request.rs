//! HTTP request building.
//!
//! Use [`Request::builder`] to construct requests with headers, query parameters, and bodies.
//! Header names are case-insensitive: setting a header replaces any previous value
//! whatever its case, and lookups ignore case.
//!
//! # Example
//!
//! ```
//! use courier_core::{Request, Method};
//!
//! let request = Request::builder(Method::Get, "https://api.example.com".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .query("page", "1")
//!     .build();
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

use base64::Engine;
use bytes::Bytes;

use crate::Method;

/// An HTTP request with method, URL, headers, and optional body.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: url::Url,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
    keep_auth_on_redirect: bool,
}

/// Owned pieces of a [`Request`].
#[derive(Debug, Clone)]
pub struct Parts {
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: url::Url,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Optional body.
    pub body: Option<Bytes>,
    /// Whether `Authorization` survives a redirect to another host.
    pub keep_auth_on_redirect: bool,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Rebuild a request from its parts.
    #[must_use]
    pub fn from_parts(parts: Parts) -> Self {
        Self {
            method: parts.method,
            url: parts.url,
            headers: parts.headers,
            body: parts.body,
            keep_auth_on_redirect: parts.keep_auth_on_redirect,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Single header value by name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Whether `Authorization` survives a redirect to another host.
    #[must_use]
    pub const fn keep_auth_on_redirect(&self) -> bool {
        self.keep_auth_on_redirect
    }

    /// Consume into owned parts.
    #[must_use]
    pub fn into_parts(self) -> Parts {
        Parts {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            keep_auth_on_redirect: self.keep_auth_on_redirect,
        }
    }
}

/// Case-insensitive header lookup over an ordered header list.
#[must_use]
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Insert or replace a header, ignoring the case of its name.
///
/// A replaced header keeps its position and takes the new name's spelling.
pub fn set_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    if let Some(slot) = headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(&name))
    {
        *slot = (name, value);
    } else {
        headers.push((name, value));
    }
}

/// Remove a header, ignoring the case of its name.
pub fn remove_header(headers: &mut Vec<(String, String)>, name: &str) {
    headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: url::Url,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
    keep_auth_on_redirect: bool,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            keep_auth_on_redirect: true,
        }
    }

    /// Sets a header, replacing any header with the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, value) in headers {
            set_header(&mut self.headers, name, value);
        }
        self
    }

    /// Sets an `Authorization: Basic <base64(user:pass)>` header.
    #[must_use]
    pub fn basic_auth(self, username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        self.header("Authorization", format!("Basic {encoded}"))
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Appends multiple query parameters to the URL.
    #[must_use]
    pub fn query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut pairs = pairs.into_iter().peekable();
        if pairs.peek().is_none() {
            return self;
        }
        {
            let mut query = self.url.query_pairs_mut();
            for (name, value) in pairs {
                query.append_pair(&name, &value);
            }
        }
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Whether `Authorization` survives a redirect to another host (default `true`).
    #[must_use]
    pub const fn keep_auth_on_redirect(mut self, keep: bool) -> Self {
        self.keep_auth_on_redirect = keep;
        self
    }

    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        let body = crate::to_json(value)?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }

    /// Set a form-urlencoded body, keeping an explicit `Content-Type` if one is set.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn form<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        let body = crate::to_form(value)?;
        let builder = if find_header(&self.headers, "Content-Type").is_some() {
            self
        } else {
            self.header("Content-Type", crate::ContentType::FormUrlEncoded.as_str())
        };
        Ok(builder.body(body))
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            keep_auth_on_redirect: self.keep_auth_on_redirect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> url::Url {
        url::Url::parse(s).expect("valid URL")
    }

    #[test]
    fn request_builder_basic() {
        let request = Request::builder(Method::Get, url("https://api.example.com/users"))
            .header("Accept", "application/json")
            .build();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.url().as_str(), "https://api.example.com/users");
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.header("accept"), Some("application/json"));
        assert!(request.body().is_none());
        assert!(request.keep_auth_on_redirect());
    }

    #[test]
    fn header_replacement_ignores_case() {
        let request = Request::builder(Method::Get, url("https://api.example.com"))
            .header("X-Trace", "1")
            .header("Accept", "text/html")
            .header("x-trace", "2")
            .build();

        assert_eq!(
            request.headers(),
            &[
                ("x-trace".to_string(), "2".to_string()),
                ("Accept".to_string(), "text/html".to_string()),
            ]
        );
    }

    #[test]
    fn remove_header_ignores_case() {
        let mut headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
        remove_header(&mut headers, "content-type");
        assert!(headers.is_empty());
    }

    #[test]
    fn request_builder_with_query() {
        let request = Request::builder(Method::Get, url("https://api.example.com/users"))
            .query("page", "1")
            .query("limit", "10")
            .build();

        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/users?page=1&limit=10"
        );
    }

    #[test]
    fn empty_query_pairs_leave_url_untouched() {
        let request = Request::builder(Method::Get, url("https://api.example.com/users"))
            .query_pairs(Vec::new())
            .build();

        assert_eq!(request.url().as_str(), "https://api.example.com/users");
    }

    #[test]
    fn request_builder_basic_auth() {
        // "user:pass" -> "dXNlcjpwYXNz"
        let request = Request::builder(Method::Get, url("https://api.example.com"))
            .basic_auth("user", "pass")
            .build();

        assert_eq!(request.header("authorization"), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn request_builder_json() {
        #[derive(serde::Serialize)]
        struct User {
            name: String,
        }

        let request = Request::builder(Method::Post, url("https://api.example.com/users"))
            .json(&User {
                name: "test".to_string(),
            })
            .expect("json")
            .build();

        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(
            request.body().map(Bytes::as_ref),
            Some(br#"{"name":"test"}"#.as_ref())
        );
    }

    #[test]
    fn request_builder_form_keeps_explicit_content_type() {
        let request = Request::builder(Method::Post, url("https://api.example.com/login"))
            .header("Content-Type", "application/x-www-form-urlencoded; charset=utf-8")
            .form(&[("user", "alice")])
            .expect("form")
            .build();

        assert_eq!(
            request.header("content-type"),
            Some("application/x-www-form-urlencoded; charset=utf-8")
        );
        assert_eq!(
            request.body().map(Bytes::as_ref),
            Some(b"user=alice".as_ref())
        );
    }

    #[test]
    fn parts_round_trip() {
        let request = Request::builder(Method::Put, url("https://api.example.com/a"))
            .keep_auth_on_redirect(false)
            .body(Bytes::from_static(b"x"))
            .build();

        let parts = request.into_parts();
        assert!(!parts.keep_auth_on_redirect);
        let rebuilt = Request::from_parts(parts);
        assert_eq!(rebuilt.method(), Method::Put);
        assert_eq!(rebuilt.body(), Some(&Bytes::from_static(b"x")));
    }
}
