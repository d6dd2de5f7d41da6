//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    ClientConfig, ConnectionContext, ContentType, Dto, DtoRegistry, Error, FieldErrors, Method,
    OutboundRequest, Payload, RemoteResponse, Result, TargetType, ValidationPhase,
};
pub use serde::{Deserialize, Serialize};
