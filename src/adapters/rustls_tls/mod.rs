use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::domain::{Result, SocksError, TlsOptions};
use crate::ports::TlsUpgradePort;

/// Upgrades tunnelled sockets to TLS with `tokio-rustls`.
#[derive(Clone)]
pub struct RustlsUpgrader {
    connector: TlsConnector,
    handshake_timeout: Duration,
}

impl RustlsUpgrader {
    pub fn new(options: &TlsOptions) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| SocksError::Config(e.to_string()))?;

        let mut config = if options.reject_unauthorized {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            for cert in &options.root_certificates {
                roots
                    .add(cert.clone())
                    .map_err(|e| SocksError::Config(format!("invalid root certificate: {}", e)))?;
            }
            builder.with_root_certificates(roots).with_no_client_auth()
        } else {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
                .with_no_client_auth()
        };
        config.alpn_protocols = options
            .alpn_protocols
            .iter()
            .map(|p| p.as_bytes().to_vec())
            .collect();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            handshake_timeout: options.timeout,
        })
    }
}

#[async_trait]
impl TlsUpgradePort for RustlsUpgrader {
    async fn upgrade(&self, stream: TcpStream, server_name: &str) -> Result<TlsStream<TcpStream>> {
        let name = ServerName::try_from(server_name.to_string())
            .map_err(|_| SocksError::InvalidServerName(server_name.to_string()))?;

        match timeout(self.handshake_timeout, self.connector.connect(name, stream)).await {
            Ok(Ok(tls)) => {
                debug!("TLS handshake with {} complete", server_name);
                Ok(tls)
            }
            Ok(Err(e)) => {
                debug!("TLS handshake with {} failed: {}", server_name, e);
                Err(SocksError::Tls(e))
            }
            Err(_) => {
                warn!(
                    "TLS handshake with {} timed out after {:?}",
                    server_name, self.handshake_timeout
                );
                Err(SocksError::Timeout(self.handshake_timeout))
            }
        }
    }
}

/// Skips certificate validation when `reject_unauthorized` is off. Handshake
/// signatures are still checked so the peer must hold the key it presents.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
