//! TLS configuration for the CA channel.
//!
//! The channel speaks TLS 1.3 or TLS 1.2 and offers AES-128-GCM suites only. TLS 1.2 is
//! limited to the two ECDHE suites. Certificates are always verified against the Mozilla
//! root store.

use std::sync::Arc;

use rustls::crypto::{CryptoProvider, ring};
use rustls::{ClientConfig, RootCertStore, SupportedCipherSuite, SupportedProtocolVersion};

use crate::error::{CertOrderError, Result};

/// Protocol versions the client is willing to negotiate, preferred first.
pub static PROTOCOL_VERSIONS: &[&SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

/// Cipher suites the client is willing to negotiate.
pub fn allowed_cipher_suites() -> Vec<SupportedCipherSuite> {
    vec![
        ring::cipher_suite::TLS13_AES_128_GCM_SHA256,
        ring::cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        ring::cipher_suite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    ]
}

/// Build the rustls configuration used by [`crate::client::CaClient`].
pub fn build_rustls_config() -> Result<ClientConfig> {
    let provider = CryptoProvider {
        cipher_suites: allowed_cipher_suites(),
        ..ring::default_provider()
    };

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(PROTOCOL_VERSIONS)
        .map_err(|e| CertOrderError::ClientConfiguration(format!("invalid TLS settings: {e}")))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustls::pki_types::ServerName;

    #[test]
    fn config_only_offers_allowed_suites() {
        let config = build_rustls_config().unwrap();
        let suites: Vec<_> = config
            .crypto_provider()
            .cipher_suites
            .iter()
            .map(|suite| suite.suite())
            .collect();
        assert_eq!(
            suites,
            vec![
                rustls::CipherSuite::TLS13_AES_128_GCM_SHA256,
                rustls::CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
                rustls::CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            ]
        );
    }

    #[test]
    fn client_hello_offers_tls13_and_tls12() {
        let config = Arc::new(build_rustls_config().unwrap());
        let server = ServerName::try_from("example.com").unwrap();
        let mut conn = rustls::ClientConnection::new(config, server).unwrap();

        let mut hello = Vec::new();
        conn.write_tls(&mut hello).unwrap();

        // supported_versions extension listing TLS 1.3 then TLS 1.2
        let supported_versions = [0x00, 0x2b, 0x00, 0x05, 0x04, 0x03, 0x04, 0x03, 0x03];
        assert!(
            hello
                .windows(supported_versions.len())
                .any(|window| window == supported_versions),
            "ClientHello does not offer TLS 1.3 and TLS 1.2"
        );
    }
}
