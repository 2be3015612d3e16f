use crate::domain::Result;
use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// Port for upgrading an established socket to TLS
#[async_trait]
pub trait TlsUpgradePort: Send + Sync {
    /// Perform a client handshake over `stream`, verifying against `server_name`
    async fn upgrade(&self, stream: TcpStream, server_name: &str) -> Result<TlsStream<TcpStream>>;
}
