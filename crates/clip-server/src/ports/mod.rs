//! Outbound ports.

pub mod storage;

pub use storage::{ClipBody, ClipReader, ClipStore};
