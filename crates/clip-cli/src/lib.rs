//! # ClipShare CLI
//!
//! Library half of the `clipshare` binary. `main` parses [`args::Cli`],
//! sets up logging and hands off to [`commands`].

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod args;
pub mod commands;
pub mod passphrase;
pub mod paths;

pub use args::{Cli, Command};
pub use paths::ConfigPaths;
