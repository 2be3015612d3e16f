#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ServerBuilder;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

pub const RESPONSE_DATA: &str = "__RESPONSE_DATA__";

/// Self-signed certificate valid for `localhost` and `example.com`.
pub struct TestCertificate {
    pub cert: CertificateDer<'static>,
    pub key: PrivateKeyDer<'static>,
}

impl TestCertificate {
    pub fn generate() -> Self {
        let certified = rcgen::generate_simple_self_signed(vec![
            "localhost".to_string(),
            "example.com".to_string(),
        ])
        .expect("Failed to generate test certificate");
        Self {
            cert: certified.cert.der().clone(),
            key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der())),
        }
    }

    fn server_config(&self) -> Arc<ServerConfig> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .expect("Failed to pick TLS versions")
            .with_no_client_auth()
            .with_single_cert(vec![self.cert.clone()], self.key.clone_key())
            .expect("Failed to build server TLS config");
        Arc::new(config)
    }
}

#[derive(Clone)]
enum Mode {
    Plain,
    Tls(TlsAcceptor),
    /// Accept the TCP connection and never speak.
    Stalled,
}

/// HTTP(S) origin that answers `GET /foobar` and remembers who called.
pub struct TestTargetServer {
    addr: SocketAddr,
    peers: Arc<Mutex<Vec<SocketAddr>>>,
    _server_handle: JoinHandle<()>,
}

impl TestTargetServer {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_inner(Mode::Plain).await
    }

    pub async fn start_tls(certificate: &TestCertificate) -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_inner(Mode::Tls(TlsAcceptor::from(certificate.server_config()))).await
    }

    /// Accepts connections but never answers, so a TLS handshake stalls.
    pub async fn start_stalled() -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_inner(Mode::Stalled).await
    }

    async fn start_inner(mode: Mode) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let peers = Arc::new(Mutex::new(Vec::new()));

        let recorded = peers.clone();
        let server_handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        recorded.lock().unwrap().push(peer);
                        let mode = mode.clone();

                        tokio::spawn(async move {
                            let service = service_fn(handle);
                            let builder = ServerBuilder::new(TokioExecutor::new());
                            let result = match mode {
                                Mode::Tls(acceptor) => match acceptor.accept(stream).await {
                                    Ok(tls) => builder.serve_connection(TokioIo::new(tls), service).await,
                                    Err(_) => return,
                                },
                                Mode::Plain => builder.serve_connection(TokioIo::new(stream), service).await,
                                Mode::Stalled => {
                                    tokio::time::sleep(Duration::from_secs(60)).await;
                                    drop(stream);
                                    return;
                                }
                            };
                            if let Err(_err) = result {
                                // Silently handle errors in test
                            }
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            addr,
            peers,
            _server_handle: server_handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn peers(&self) -> Vec<SocketAddr> {
        self.peers.lock().unwrap().clone()
    }
}

async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = if req.uri().path() == "/foobar" {
        Response::new(Full::new(Bytes::from(RESPONSE_DATA)))
    } else {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = hyper::StatusCode::NOT_FOUND;
        response
    };
    Ok(response)
}
