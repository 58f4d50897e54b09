//! Middleware stack for the clip server.
//!
//! Layer order: Request → Tracing → (clip routes only) HmacAuth → Handler

pub mod auth;
pub mod tracing;

pub use auth::{unauthorized_response, HmacAuthLayer};
pub use tracing::TracingLayer;
