//! TLS configuration with a pinned CA root certificate.
//!
//! When `MARKETSYNC_CA_CERT` points at a PEM bundle, both the WebSocket and
//! the HTTP client trust only the certificates in that bundle. Without it
//! the clients fall back to the bundled web PKI roots.

use std::path::Path;

use rustls::ClientConfig;

use crate::{MarketSyncError, Result};

/// Builds a [`ClientConfig`] whose root store contains only the CA
/// certificates found in the PEM file at `ca_pem`.
///
/// # Errors
///
/// Returns [`MarketSyncError::Tls`] if the file cannot be read, cannot be
/// parsed as PEM, or contains no usable certificate.
pub fn build_tls_config(ca_pem: &Path) -> Result<ClientConfig> {
    let pem = std::fs::read(ca_pem).map_err(|e| {
        MarketSyncError::Tls(format!("failed to read {}: {e}", ca_pem.display()))
    })?;

    let certs: Vec<_> = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| MarketSyncError::Tls(format!("failed to parse CA PEM: {e}")))?;

    let mut root_store = rustls::RootCertStore::empty();
    let (added, ignored) = root_store.add_parsable_certificates(certs);
    if added == 0 {
        return Err(MarketSyncError::Tls(format!(
            "no usable certificates in {} ({ignored} rejected)",
            ca_pem.display()
        )));
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_is_tls_error() {
        let err = build_tls_config(Path::new("/nonexistent/ca.pem")).unwrap_err();
        assert!(matches!(err, MarketSyncError::Tls(_)));
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn file_without_certificates_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not a certificate").unwrap();

        let err = build_tls_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("no usable certificates"));
    }
}
