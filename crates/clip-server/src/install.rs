//! Bash installer served at `GET /install`.

/// Installer for a server advertised at `server_addr`, or a script that
/// explains how to enable installs when no address is configured.
pub fn install_script(server_addr: Option<&str>) -> String {
    match server_addr {
        Some(addr) => format!(
            "#!/bin/bash\n\
             set -e\n\
             [ $(id -u) -eq 0 ] || {{ echo 'Must be root to install'; exit 1; }}\n\
             curl -sk https://{addr}/get > /usr/bin/clipshare\n\
             chmod +x /usr/bin/clipshare\n\
             echo 'clipshare downloaded and installed'\n\
             echo 'Run: clipshare join {addr}'\n"
        ),
        None => "#!/bin/bash\n\
                 echo 'Server not configured to allow simple install.'\n\
                 echo 'If you are the administrator, set server_addr in server.toml.'\n"
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_downloads_from_advertised_address() {
        let script = install_script(Some("clip.lan:2586"));
        assert!(script.starts_with("#!/bin/bash\nset -e\n"));
        assert!(script.contains("curl -sk https://clip.lan:2586/get > /usr/bin/clipshare\n"));
        assert!(script.contains("clipshare join clip.lan:2586"));
    }

    #[test]
    fn test_script_without_address_explains() {
        let script = install_script(None);
        assert!(script.contains("not configured"));
        assert!(!script.contains("curl"));
    }
}
