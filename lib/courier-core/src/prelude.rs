//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    ConnectionContext, ContentType, Dto, DtoRegistry, Environment, Error, ErrorKind, FieldErrors,
    Method, Payload, RemoteResponse, Request, RequestBuilder, Response, ResponseHeaders, Result,
    TargetType, ValidationPhase,
};
