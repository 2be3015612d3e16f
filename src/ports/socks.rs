use crate::domain::{ChainRequest, Result};
use async_trait::async_trait;
use tokio::net::TcpStream;

/// Port for negotiating a tunnel through SOCKS proxies
#[async_trait]
pub trait SocksDialerPort: Send + Sync {
    /// Connect to `request.destination` through the single proxy in
    /// `request.proxies`
    async fn connect(&self, request: ChainRequest) -> Result<TcpStream>;

    /// Connect to `request.destination` by traversing every proxy in
    /// `request.proxies` in order
    ///
    /// The returned stream is the socket to the first hop, already tunnelled
    /// all the way to the destination.
    async fn connect_chain(&self, request: ChainRequest) -> Result<TcpStream>;
}
