//! Tower middleware layers for the courier transport.
//!
//! [`crate::HyperClient`] stacks these layers around the raw hyper service,
//! outermost first:
//!
//! 1. [`LoggingLayer`] - one `outbound_exchange` span per exchange
//! 2. [`RetryLayer`] with [`RetryPolicy`] - bounded retry with a pause
//! 3. [`TimeoutLayer`] - one time budget per attempt, redirect hops included
//! 4. [`FollowRedirectLayer`] - follows 3xx responses within one attempt
//!
//! A retry always starts with a fresh time budget.

mod follow_redirect;
mod logging;
mod retry;

pub use follow_redirect::{DEFAULT_MAX_REDIRECTS, FollowRedirect, FollowRedirectLayer};
pub use logging::{LogLevel, Logging, LoggingLayer};
pub use retry::RetryPolicy;

pub use tower::Layer;
pub use tower::retry::RetryLayer;
pub use tower::timeout::TimeoutLayer;
