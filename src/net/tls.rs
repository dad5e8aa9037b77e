//! TLS certificate loading for the HTTPS listener.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;
use crate::net::ListenerError;

/// Rustls settings for the configured certificate chain and private key.
///
/// Both files are checked first so a missing one is reported by name instead
/// of surfacing as a PEM parse failure.
pub async fn load(config: &TlsConfig) -> Result<RustlsConfig, ListenerError> {
    let cert = Path::new(&config.cert_path);
    let key = Path::new(&config.key_path);
    require_file(cert, "Certificate")?;
    require_file(key, "Private key")?;

    let rustls = RustlsConfig::from_pem_file(cert, key)
        .await
        .map_err(ListenerError::Tls)?;
    tracing::debug!(cert = %cert.display(), key = %key.display(), "TLS certificate loaded");
    Ok(rustls)
}

fn require_file(path: &Path, what: &str) -> Result<(), ListenerError> {
    if path.is_file() {
        return Ok(());
    }
    Err(ListenerError::Tls(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{what} file not found: {}", path.display()),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tls_config(cert: &Path, key: &Path) -> TlsConfig {
        TlsConfig {
            cert_path: cert.display().to_string(),
            key_path: key.display().to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_certificate() {
        let config = tls_config(
            Path::new("/nonexistent/cert.pem"),
            Path::new("/nonexistent/key.pem"),
        );
        match load(&config).await {
            Err(ListenerError::Tls(e)) => {
                assert_eq!(e.kind(), io::ErrorKind::NotFound);
                assert!(e.to_string().contains("Certificate"));
            }
            other => panic!("expected a TLS error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_missing_key() {
        let cert = tempfile::NamedTempFile::new().unwrap();
        let config = tls_config(cert.path(), Path::new("/nonexistent/key.pem"));
        match load(&config).await {
            Err(ListenerError::Tls(e)) => assert!(e.to_string().contains("Private key")),
            other => panic!("expected a TLS error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_directory_is_not_a_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let key = tempfile::NamedTempFile::new().unwrap();
        let config = tls_config(dir.path(), key.path());
        assert!(matches!(load(&config).await, Err(ListenerError::Tls(_))));
    }

    #[tokio::test]
    async fn test_unparseable_pem() {
        let mut cert = tempfile::NamedTempFile::new().unwrap();
        writeln!(cert, "not a certificate").unwrap();
        let mut key = tempfile::NamedTempFile::new().unwrap();
        writeln!(key, "not a key").unwrap();

        let config = tls_config(cert.path(), key.path());
        assert!(matches!(load(&config).await, Err(ListenerError::Tls(_))));
    }
}
