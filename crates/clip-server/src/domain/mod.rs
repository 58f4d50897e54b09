//! Server domain: configuration and error types.

pub mod config;
pub mod error;

pub use config::{ConfigError, ServerConfig};
pub use error::{ServerError, StoreError};
