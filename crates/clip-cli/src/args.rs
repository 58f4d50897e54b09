//! Command line definition.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// ClipShare: a network clipboard over TLS with signed requests
#[derive(Parser, Debug)]
#[command(name = "clipshare", version)]
#[command(about = "Copy and paste between machines through a ClipShare server")]
pub struct Cli {
    /// Directory holding server and client configuration
    #[arg(long, global = true, env = "CLIPSHARE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate key, salt and certificate for a new server
    Setup {
        /// Passphrase clients will join with; prompted for when absent
        #[arg(long, env = "CLIPSHARE_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,

        /// Address clients reach this server at, `host[:port]`
        #[arg(long)]
        server_addr: Option<String>,

        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:2586")]
        listen: SocketAddr,
    },

    /// Run the server
    Serve,

    /// Discover a server, pin its certificate if needed and store the key
    Join {
        /// Server `host[:port]`
        addr: String,

        #[arg(long, env = "CLIPSHARE_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,

        /// Extra PEM root to trust when checking the server certificate
        #[arg(long)]
        ca_cert: Option<PathBuf>,
    },

    /// Upload stdin to a clip
    Copy {
        #[arg(default_value = "default")]
        id: String,
    },

    /// Write a clip to stdout
    Paste {
        #[arg(default_value = "default")]
        id: String,
    },

    /// Check that the stored key is accepted by the server
    Verify,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_copy_defaults_to_default_clip() {
        let cli = Cli::try_parse_from(["clipshare", "copy"]).unwrap();
        assert!(matches!(cli.command, Command::Copy { id } if id == "default"));
    }

    #[test]
    fn test_join_flags() {
        let cli = Cli::try_parse_from([
            "clipshare",
            "--config-dir",
            "/tmp/cs",
            "join",
            "clip.lan",
            "--ca-cert",
            "ca.pem",
        ])
        .unwrap();

        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/cs")));
        match cli.command {
            Command::Join { addr, ca_cert, .. } => {
                assert_eq!(addr, "clip.lan");
                assert_eq!(ca_cert, Some(PathBuf::from("ca.pem")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
