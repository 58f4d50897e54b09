//! # CLI Flows
//!
//! The `clipshare` subcommands end to end, each side with its own
//! configuration directory.

#[cfg(test)]
mod tests {
    use clip_cli::commands::{self, SetupOptions};
    use clip_cli::ConfigPaths;
    use clip_client::{ClientConfig, ClientError};
    use clip_server::{ClipServer, RunningServer, ServerConfig};
    use tokio::net::TcpListener;

    use crate::fixtures::{ca_signed, TestServer, PASSPHRASE};

    /// Run `setup` into a fresh directory and start the resulting server.
    async fn set_up_server() -> (tempfile::TempDir, RunningServer, String) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(dir.path());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let options = SetupOptions {
            listen_addr: addr,
            server_addr: Some(addr.to_string()),
        };
        commands::setup(&paths, &options, PASSPHRASE).unwrap();

        let config = ServerConfig::load(&paths.server_config()).unwrap();
        let server = ClipServer::new(config).unwrap().spawn(listener).unwrap();
        (dir, server, addr.to_string())
    }

    #[tokio::test]
    async fn test_setup_join_copy_paste() {
        let (_server_dir, server, addr) = set_up_server().await;
        let client_dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(client_dir.path());

        let config = commands::join(&paths, &addr, None, PASSPHRASE).await.unwrap();
        assert_eq!(config.cert_file.as_deref(), Some(paths.pinned_cert().as_path()));
        assert!(paths.pinned_cert().exists());

        commands::copy(&paths, "default", b"over the wire".to_vec())
            .await
            .unwrap();
        let pasted = commands::paste(&paths, "default").await.unwrap();
        assert_eq!(pasted, b"over the wire");

        commands::verify(&paths).await.unwrap();
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_join_persists_reloadable_config() {
        let (_server_dir, server, addr) = set_up_server().await;
        let client_dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(client_dir.path());

        let joined = commands::join(&paths, &addr, None, PASSPHRASE).await.unwrap();
        let loaded = ClientConfig::load(&paths.client_config()).unwrap();

        assert_eq!(loaded, joined);
        assert_eq!(loaded.server_addr, addr);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(paths.client_config()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_join_with_wrong_passphrase_fails() {
        let (_server_dir, server, addr) = set_up_server().await;
        let client_dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(client_dir.path());

        let err = commands::join(&paths, &addr, None, "guess").await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::Unauthorized)
        ));
        assert!(!paths.client_config().exists());
        assert!(!paths.pinned_cert().exists());
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_join_with_ca_certificate_skips_pinning() {
        let pki = ca_signed();
        let server = TestServer::start(&pki.leaf).await;

        let client_dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(client_dir.path());
        let ca_file = client_dir.path().join("ca.pem");
        std::fs::write(&ca_file, &pki.ca_pem).unwrap();

        let config = commands::join(&paths, &server.addr(), Some(&ca_file), PASSPHRASE)
            .await
            .unwrap();

        assert_eq!(config.cert_file.as_deref(), Some(ca_file.as_path()));
        assert!(!paths.pinned_cert().exists());

        commands::copy(&paths, "ca-backed", b"ok".to_vec()).await.unwrap();
        assert_eq!(commands::paste(&paths, "ca-backed").await.unwrap(), b"ok");
        server.stop().await;
    }
}
