//! Immutable request and response descriptors.

mod options;
mod request;

pub use options::{RequestOptions, Timeouts};
pub use request::{Method, Request, Response};
