//! Outbound HTTP requests with bounded retry, status classification and
//! typed results.
//!
//! Build an [`OutboundRequest`], send it, and get back either a
//! [`RemoteResponse`] or a classified [`Error`]:
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! impl Dto for User {}
//!
//! let mut request = OutboundRequest::new("https://users.internal/v1/users/42")?;
//! request.set_validation_enabled(true);
//!
//! match request.send_as::<User>().await {
//!     Ok(response) => match response.result() {
//!         Some(user) => println!("{}", user.name),
//!         None => println!("empty body"),
//!     },
//!     Err(err) if err.is_service_unavailable() => println!("try later"),
//!     Err(err) => return Err(err),
//! }
//! ```
//!
//! Timeouts, retries and credentials default to the `SERVICES_HTTP_*`
//! environment variables; see [`ClientConfig::from_environment`].

mod client;
mod config;
mod connector;
pub mod middleware;
mod outbound;
pub mod prelude;

pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use outbound::{Dispatch, OutboundRequest, resolve_url};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use courier_core::{
    BoundDto, ConnectionContext, ContentType, Dto, DtoRegistry, Environment, Error, ErrorKind,
    FieldErrors, Method, Payload, ProcessEnvironment, RemoteResponse, Request, RequestBuilder,
    Response, ResponseHeaders, Result, TargetType, ValidationPhase, bind, bind_as, bind_optional,
    classify, is_success_status,
};

// Re-export http types for status codes and headers
pub use courier_core::{StatusCode, header};
