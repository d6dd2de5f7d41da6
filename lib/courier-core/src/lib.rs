//! Core types for the courier outbound HTTP client.
//!
//! This crate holds everything that does not touch the network:
//! - [`Method`], [`Request`] and [`RequestBuilder`] - the outgoing request
//! - [`Response`], [`ResponseHeaders`] and [`RemoteResponse`] - what comes back
//! - [`classify`] - status classification into success or an [`Error`]
//! - [`Dto`], [`TargetType`], [`DtoRegistry`] and [`bind`] - typed result binding
//! - [`Environment`] and [`ConnectionContext`] - ambient configuration
//! - [`Error`], [`ErrorKind`] and [`Result`] - error handling

mod body;
mod classify;
mod dto;
mod env;
mod error;
mod headers;
mod method;
pub mod prelude;
mod request;
mod response;

pub use body::{
    ContentType, RESULT_SECTION, decode_lenient, flatten_params, from_json, from_value,
    result_section, to_form, to_json,
};
pub use classify::{classify, classify_error, is_success_status, transport_message};
pub use dto::{
    BoundDto, Dto, DtoRegistry, FieldErrors, Payload, TargetType, ValidationPhase, bind, bind_as,
    bind_optional,
};
pub use env::{
    ConnectionContext, Environment, HTTP_AUTH_PASSWORD, HTTP_AUTH_USER, HTTP_CONNECT_TIMEOUT,
    HTTP_RETRY_COUNT, HTTP_RETRY_PAUSE, HTTP_TIMEOUT, ProcessEnvironment,
};
pub use error::{Error, ErrorKind, Result};
pub use headers::ResponseHeaders;
pub use method::Method;
pub use request::{Parts, Request, RequestBuilder, find_header, remove_header, set_header};
pub use response::{RemoteResponse, Response};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
