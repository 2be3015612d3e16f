use futures::future::BoxFuture;
use hyper::Uri;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tower_service::Service;
use tracing::{debug, info, warn};

use crate::adapters::{RustlsUpgrader, TokioSocksDialer};
use crate::connection::SocksStream;
use crate::domain::{
    ChainRequest, ConnectionRequest, Destination, ProxyChain, Result, SocksCommand, SocksError, SocksProxy,
    TlsOptions,
};
use crate::ports::{SocksDialerPort, TlsUpgradePort};

/// hyper connector that tunnels every connection through a SOCKS proxy chain.
///
/// `https:` and `wss:` targets are upgraded to TLS once the tunnel is up.
#[derive(Clone)]
pub struct SocksConnector {
    proxies: Arc<[SocksProxy]>,
    dialer: Arc<dyn SocksDialerPort>,
    tls: Arc<dyn TlsUpgradePort>,
    server_name: Option<Arc<str>>,
    connect_timeout: Duration,
}

impl SocksConnector {
    /// Connector backed by `tokio-socks` and `tokio-rustls`.
    pub fn new(proxies: impl Into<ProxyChain>, tls_options: &TlsOptions) -> Result<Self> {
        let tls = RustlsUpgrader::new(tls_options)?;
        Self::with_ports(
            proxies,
            tls_options,
            Arc::new(TokioSocksDialer::new()),
            Arc::new(tls),
        )
    }

    pub fn with_ports(
        proxies: impl Into<ProxyChain>,
        tls_options: &TlsOptions,
        dialer: Arc<dyn SocksDialerPort>,
        tls: Arc<dyn TlsUpgradePort>,
    ) -> Result<Self> {
        let chain = proxies.into();
        chain.validate()?;

        Ok(Self {
            proxies: chain.hops().into(),
            dialer,
            tls,
            server_name: tls_options.server_name.as_deref().map(Arc::from),
            connect_timeout: tls_options.timeout,
        })
    }

    pub fn proxies(&self) -> &[SocksProxy] {
        &self.proxies
    }

    /// Establish a connection to the target of `uri`.
    pub async fn connect(&self, uri: &Uri) -> Result<SocksStream> {
        let request = ConnectionRequest::from_uri(uri)?;
        let destination = request.destination()?;

        let stream = self.dial(&destination).await.map_err(|e| {
            debug!("Failed to connect to {}: {}", destination, e);
            e
        })?;

        if !request.is_secure() {
            stream.set_nodelay(true)?;
            info!("{} connected ({} hop(s))", destination, self.proxies.len());
            return Ok(stream.into());
        }

        let server_name = self.server_name.as_deref().unwrap_or(&request.hostname);
        let tls = self.tls.upgrade(stream, server_name).await?;
        info!(
            "{} connected over TLS ({} hop(s))",
            destination,
            self.proxies.len()
        );
        Ok(tls.into())
    }

    async fn dial(&self, destination: &Destination) -> Result<TcpStream> {
        if self.proxies.is_empty() {
            return self.dial_direct(destination).await;
        }

        let request = ChainRequest {
            proxies: self.proxies.to_vec(),
            command: SocksCommand::Connect,
            destination: destination.clone(),
            timeout: self.connect_timeout,
        };
        if self.proxies.len() == 1 {
            self.dialer.connect(request).await
        } else {
            self.dialer.connect_chain(request).await
        }
    }

    async fn dial_direct(&self, destination: &Destination) -> Result<TcpStream> {
        debug!("dialing {} directly", destination);
        let addr = (destination.host.as_str(), destination.port);
        match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(
                    "direct connection to {} timed out after {:?}",
                    destination, self.connect_timeout
                );
                Err(SocksError::Timeout(self.connect_timeout))
            }
        }
    }
}

impl std::fmt::Debug for SocksConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocksConnector")
            .field("proxies", &self.proxies)
            .field("server_name", &self.server_name)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Service<Uri> for SocksConnector {
    type Response = SocksStream;
    type Error = SocksError;
    type Future = BoxFuture<'static, Result<Self::Response>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let connector = self.clone();
        Box::pin(async move { connector.connect(&uri).await })
    }
}
