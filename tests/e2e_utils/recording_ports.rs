#![allow(dead_code)]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use hyper_socks_chain::domain::{ChainRequest, Result, SocksError};
use hyper_socks_chain::ports::{SocksDialerPort, TlsUpgradePort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialCall {
    Connect,
    ConnectChain,
}

/// Dialer that records what it was asked for, then connects straight to a
/// fixed address instead of negotiating with a proxy.
pub struct RecordingDialer {
    target: Option<SocketAddr>,
    calls: Mutex<Vec<(DialCall, ChainRequest)>>,
}

impl RecordingDialer {
    pub fn to(target: SocketAddr) -> Arc<Self> {
        Arc::new(Self {
            target: Some(target),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every dial fails with an invalid-proxy error.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            target: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(DialCall, ChainRequest)> {
        self.calls.lock().unwrap().clone()
    }

    async fn dial(&self, call: DialCall, request: ChainRequest) -> Result<TcpStream> {
        self.calls.lock().unwrap().push((call, request));
        match self.target {
            Some(addr) => Ok(TcpStream::connect(addr).await?),
            None => Err(SocksError::InvalidProxy("invalid proxy details".to_string())),
        }
    }
}

#[async_trait]
impl SocksDialerPort for RecordingDialer {
    async fn connect(&self, request: ChainRequest) -> Result<TcpStream> {
        self.dial(DialCall::Connect, request).await
    }

    async fn connect_chain(&self, request: ChainRequest) -> Result<TcpStream> {
        self.dial(DialCall::ConnectChain, request).await
    }
}

/// Counts upgrades and delegates to a real upgrader.
pub struct CountingUpgrader<T> {
    inner: T,
    upgrades: AtomicUsize,
    server_names: Mutex<Vec<String>>,
}

impl<T: TlsUpgradePort> CountingUpgrader<T> {
    pub fn new(inner: T) -> Arc<Self> {
        Arc::new(Self {
            inner,
            upgrades: AtomicUsize::new(0),
            server_names: Mutex::new(Vec::new()),
        })
    }

    pub fn upgrades(&self) -> usize {
        self.upgrades.load(Ordering::SeqCst)
    }

    pub fn server_names(&self) -> Vec<String> {
        self.server_names.lock().unwrap().clone()
    }
}

#[async_trait]
impl<T: TlsUpgradePort> TlsUpgradePort for CountingUpgrader<T> {
    async fn upgrade(&self, stream: TcpStream, server_name: &str) -> Result<TlsStream<TcpStream>> {
        self.upgrades.fetch_add(1, Ordering::SeqCst);
        self.server_names.lock().unwrap().push(server_name.to_string());
        self.inner.upgrade(stream, server_name).await
    }
}
