//! JSON-over-HTTP surface of the tracker.
//!
//! Handlers are thin: they decode camelCase input, call one service operation
//! and wrap the result in the `{success, data}` envelope.

#![forbid(unsafe_code)]

pub mod dto;
pub mod error;
mod routes;
mod server;

pub use error::ApiError;
pub use routes::router;
pub use server::ApiServer;
