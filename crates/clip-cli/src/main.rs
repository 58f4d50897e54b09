//! `clipshare` executable.

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use clip_cli::commands::{self, SetupOptions};
use clip_cli::{passphrase, Cli, Command, ConfigPaths};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries pasted clips.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let paths = ConfigPaths::new(cli.config_dir.unwrap_or_else(ConfigPaths::default_dir));

    match cli.command {
        Command::Setup {
            passphrase,
            server_addr,
            listen,
        } => {
            let passphrase = passphrase::resolve(passphrase, &mut std::io::stdin().lock())?;
            let options = SetupOptions {
                listen_addr: listen,
                server_addr,
            };
            commands::setup(&paths, &options, &passphrase)?;
        }
        Command::Serve => commands::serve(&paths).await?,
        Command::Join {
            addr,
            passphrase,
            ca_cert,
        } => {
            let passphrase = passphrase::resolve(passphrase, &mut std::io::stdin().lock())?;
            commands::join(&paths, &addr, ca_cert.as_deref(), &passphrase).await?;
        }
        Command::Copy { id } => {
            let mut data = Vec::new();
            tokio::io::stdin().read_to_end(&mut data).await?;
            commands::copy(&paths, &id, data).await?;
        }
        Command::Paste { id } => {
            let data = commands::paste(&paths, &id).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await?;
            stdout.flush().await?;
        }
        Command::Verify => {
            commands::verify(&paths).await?;
            eprintln!("OK");
        }
    }

    Ok(())
}
