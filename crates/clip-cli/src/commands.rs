//! Implementation of each `clipshare` subcommand.

use anyhow::{Context, Result};
use clip_client::config::{host_part, with_default_port};
use clip_client::{
    ClientConfig, ClipClient, Discoverer, DiscoveryPhase, PinFile, Timeouts, VerifyingTls,
};
use clip_server::{generate_self_signed, ClipServer, ServerConfig};
use shared_auth::{derive_secret, write_private, Salt, TrustStore};
use std::net::SocketAddr;
use std::path::Path;
use tokio::sync::oneshot;
use tracing::info;

use crate::paths::ConfigPaths;

// =============================================================================
// SERVER
// =============================================================================

#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub listen_addr: SocketAddr,
    /// Advertised `host[:port]`.
    pub server_addr: Option<String>,
}

/// Generate salt, key and a self-signed certificate; write `server.toml`.
pub fn setup(paths: &ConfigPaths, options: &SetupOptions, passphrase: &str) -> Result<ServerConfig> {
    std::fs::create_dir_all(paths.dir())
        .with_context(|| format!("creating {}", paths.dir().display()))?;

    let salt = Salt::generate();
    let secret = derive_secret(passphrase, &salt).context("deriving key")?;

    let server_addr = options.server_addr.as_deref().map(with_default_port);
    let mut hosts = vec!["clipshare".to_string(), "localhost".to_string()];
    if let Some(addr) = &server_addr {
        let host = host_part(addr).to_string();
        if !hosts.contains(&host) {
            hosts.push(host);
        }
    }

    let pem = generate_self_signed(&hosts).context("generating certificate")?;
    std::fs::write(paths.server_cert(), &pem.cert_pem)
        .with_context(|| format!("writing {}", paths.server_cert().display()))?;
    write_private(&paths.server_key(), pem.key_pem.as_bytes())
        .with_context(|| format!("writing {}", paths.server_key().display()))?;

    let config = ServerConfig {
        listen_addr: options.listen_addr,
        server_addr,
        cache_dir: paths.clips_dir(),
        cert_file: paths.server_cert(),
        key_file: paths.server_key(),
        key: Some(secret.to_base64()),
        salt: Some(salt.to_base64()),
        ..ServerConfig::default()
    };
    config
        .save(&paths.server_config())
        .context("writing server config")?;

    info!(
        config = %paths.server_config().display(),
        hosts = ?hosts,
        "Server configured"
    );
    Ok(config)
}

/// Run the server until Ctrl+C.
pub async fn serve(paths: &ConfigPaths) -> Result<()> {
    let config = ServerConfig::load(&paths.server_config()).with_context(|| {
        format!(
            "loading {}; run `clipshare setup` first",
            paths.server_config().display()
        )
    })?;
    let server = ClipServer::new(config).context("starting server")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    server.run(shutdown_rx).await?;
    Ok(())
}

// =============================================================================
// CLIENT
// =============================================================================

/// Discover `addr`, derive the key and confirm the passphrase with a
/// signed `/verify`. Only then are the pin file and client config written,
/// so a rejected join leaves nothing behind.
///
/// `ca_cert` adds a trusted root for the secure discovery probe. When set
/// and no pin is needed, it is recorded as the config's certificate file.
pub async fn join(
    paths: &ConfigPaths,
    addr: &str,
    ca_cert: Option<&Path>,
    passphrase: &str,
) -> Result<ClientConfig> {
    let extra_roots = match ca_cert {
        Some(path) => PinFile::new(path)
            .load_der()
            .with_context(|| format!("loading {}", path.display()))?,
        None => Vec::new(),
    };

    let timeouts = Timeouts::default();
    let discoverer = Discoverer::new(addr, VerifyingTls::new(&extra_roots)?, timeouts);
    let discovered = discoverer
        .discover()
        .await
        .with_context(|| format!("discovering {}", discoverer.server_addr()))?;

    let secret = derive_secret(passphrase, &discovered.salt).context("deriving key")?;
    let store = TrustStore::new(
        discoverer.server_addr(),
        secret.clone(),
        discovered.salt.clone(),
        discovered.pinned.clone(),
    );
    ClipClient::from_trust_store(&store, &extra_roots, timeouts)?
        .verify()
        .await
        .context("server rejected the passphrase")?;

    let cert_file = match (&discovered.pinned, ca_cert) {
        (Some(pinned), _) => {
            let file = PinFile::new(paths.pinned_cert());
            file.write(pinned)?;
            Some(file.path().to_path_buf())
        }
        (None, Some(ca)) => Some(ca.to_path_buf()),
        (None, None) => None,
    };
    if discovered.phase == DiscoveryPhase::Pinned {
        info!(pin = %paths.pinned_cert().display(), "Pinned certificate saved");
    }

    let config = ClientConfig {
        key: Some(secret.to_base64()),
        salt: Some(discovered.salt.to_base64()),
        cert_file,
        connect_timeout: timeouts.connect,
        request_timeout: timeouts.request,
        ..ClientConfig::new(discoverer.server_addr())
    };
    config
        .save(&paths.client_config())
        .context("writing client config")?;
    info!(server = %config.server_addr, "Joined");
    Ok(config)
}

fn client_for(config: &ClientConfig) -> Result<ClipClient> {
    let store = config.trust_store()?;
    Ok(ClipClient::from_trust_store(&store, &[], config.timeouts())?)
}

fn load_client(paths: &ConfigPaths) -> Result<ClipClient> {
    let config = ClientConfig::load(&paths.client_config()).with_context(|| {
        format!(
            "loading {}; run `clipshare join <addr>` first",
            paths.client_config().display()
        )
    })?;
    client_for(&config)
}

pub async fn copy(paths: &ConfigPaths, id: &str, data: Vec<u8>) -> Result<()> {
    load_client(paths)?
        .copy(id, data)
        .await
        .with_context(|| format!("copying to clip {id:?}"))
}

pub async fn paste(paths: &ConfigPaths, id: &str) -> Result<Vec<u8>> {
    let data = load_client(paths)?
        .paste(id)
        .await
        .with_context(|| format!("pasting clip {id:?}"))?;
    Ok(data.to_vec())
}

pub async fn verify(paths: &ConfigPaths) -> Result<()> {
    load_client(paths)?.verify().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SetupOptions {
        SetupOptions {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            server_addr: Some("clip.lan".into()),
        }
    }

    #[test]
    fn test_setup_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(dir.path());

        let config = setup(&paths, &options(), "hunter2").unwrap();

        let loaded = ServerConfig::load(&paths.server_config()).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.server_addr.as_deref(), Some("clip.lan:2586"));
        assert!(ClipServer::new(loaded).is_ok());
    }

    #[test]
    fn test_setup_key_matches_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(dir.path());

        let config = setup(&paths, &options(), "hunter2").unwrap();
        let expected = derive_secret("hunter2", &config.salt().unwrap()).unwrap();

        assert_eq!(config.secret().unwrap(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_setup_secrets_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(dir.path());
        setup(&paths, &options(), "hunter2").unwrap();

        for file in [paths.server_key(), paths.server_config()] {
            let mode = std::fs::metadata(&file).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", file.display());
        }
    }

    #[test]
    fn test_setup_rejects_empty_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        assert!(setup(&ConfigPaths::new(dir.path()), &options(), "").is_err());
    }

    #[tokio::test]
    async fn test_client_commands_need_join() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify(&ConfigPaths::new(dir.path())).await.unwrap_err();
        assert!(err.to_string().contains("clipshare join"));
    }
}
