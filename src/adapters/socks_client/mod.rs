use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};
use tokio_socks::TargetAddr;
use tracing::{debug, warn};

use crate::domain::{ChainRequest, Result, SocksError, SocksProxy, SocksVersion};
use crate::ports::SocksDialerPort;

/// Dials through SOCKS proxies with `tokio-socks`.
///
/// Every hop is negotiated over the same TCP socket: after a handshake the
/// tunnel is unwrapped back to the raw stream and the next hop's handshake
/// runs inside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSocksDialer;

impl TokioSocksDialer {
    pub fn new() -> Self {
        Self
    }

    async fn negotiate(&self, request: &ChainRequest) -> Result<TcpStream> {
        let first = request
            .proxies
            .first()
            .ok_or_else(|| SocksError::InvalidProxy("empty proxy chain".to_string()))?;

        let mut stream = TcpStream::connect((first.host.as_str(), first.port))
            .await
            .map_err(|e| {
                debug!("Failed to reach proxy {}: {}", first, e);
                SocksError::Io(e)
            })?;

        for (hop, proxy) in request.proxies.iter().enumerate() {
            let target = match request.proxies.get(hop + 1) {
                Some(next) => next.target_addr(),
                None => request.destination.target_addr(),
            };
            stream = handshake(stream, proxy, target)
                .await
                .map_err(|source| SocksError::Handshake {
                    hop,
                    proxy: proxy.to_string(),
                    source,
                })?;
            debug!("hop {} ({}) negotiated", hop, proxy);
        }

        Ok(stream)
    }
}

async fn handshake(
    stream: TcpStream,
    proxy: &SocksProxy,
    target: TargetAddr<'_>,
) -> std::result::Result<TcpStream, tokio_socks::Error> {
    let creds = proxy.credentials.as_ref();
    match proxy.version {
        SocksVersion::V5 => match creds {
            Some(creds) => Socks5Stream::connect_with_password_and_socket(
                stream,
                target,
                &creds.username,
                creds.password.as_deref().unwrap_or_default(),
            )
            .await
            .map(Socks5Stream::into_inner),
            None => Socks5Stream::connect_with_socket(stream, target)
                .await
                .map(Socks5Stream::into_inner),
        },
        SocksVersion::V4 => match creds {
            Some(creds) => Socks4Stream::connect_with_userid_and_socket(stream, target, &creds.username)
                .await
                .map(Socks4Stream::into_inner),
            None => Socks4Stream::connect_with_socket(stream, target)
                .await
                .map(Socks4Stream::into_inner),
        },
    }
}

#[async_trait]
impl SocksDialerPort for TokioSocksDialer {
    async fn connect(&self, request: ChainRequest) -> Result<TcpStream> {
        match request.proxies.as_slice() {
            [proxy] => proxy.validate()?,
            other => {
                return Err(SocksError::InvalidProxy(format!(
                    "expected exactly one proxy, got {}",
                    other.len()
                )))
            }
        }
        self.connect_chain(request).await
    }

    async fn connect_chain(&self, request: ChainRequest) -> Result<TcpStream> {
        if request.proxies.is_empty() {
            return Err(SocksError::InvalidProxy("empty proxy chain".to_string()));
        }
        for proxy in &request.proxies {
            proxy.validate()?;
        }

        debug!(
            "dialing {} through {} hop(s)",
            request.destination,
            request.proxies.len()
        );
        match timeout(request.timeout, self.negotiate(&request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "SOCKS negotiation to {} timed out after {:?}",
                    request.destination, request.timeout
                );
                Err(SocksError::Timeout(request.timeout))
            }
        }
    }
}
