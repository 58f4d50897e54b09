//! Adapters for the outbound ports.

pub mod fs_store;

pub use fs_store::FsClipStore;
