//! REST API implementation for the remix player
//!
//! Axum router, request handlers, and the SSE event stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::AppContext;
