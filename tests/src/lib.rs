//! # ClipShare Test Suite
//!
//! End-to-end tests that run a real TLS server on loopback and drive it
//! with the client library and the CLI commands.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # Certificates, servers, stand-in endpoints
//! └── integration/
//!     ├── discovery.rs   # Secure probe, TOFU fallback, failure modes
//!     ├── transfer.rs    # Signed copy / paste over pinned TLS
//!     └── cli.rs         # setup → serve → join → copy → paste
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p clip-tests
//! cargo test -p clip-tests integration::discovery::
//! ```

pub mod fixtures;
pub mod integration;
