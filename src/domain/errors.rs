use std::io;
use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong while establishing a connection.
///
/// Library errors are carried as the `source` of the matching variant so
/// callers can still downcast to the original `tokio_socks` or `io` error.
#[derive(Debug, Error)]
pub enum SocksError {
    #[error("invalid proxy details: {0}")]
    InvalidProxy(String),
    #[error("invalid URI: {0}")]
    InvalidUri(String),
    #[error("invalid port: {0}")]
    InvalidPort(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The proxy at `hop` refused or failed the negotiation. This covers
    /// authentication failures and targets unreachable from that hop; the
    /// proxy's reply is not always precise enough to tell those apart.
    #[error("SOCKS negotiation with hop {hop} ({proxy}) failed: {source}")]
    Handshake {
        hop: usize,
        proxy: String,
        #[source]
        source: tokio_socks::Error,
    },
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),
    #[error("TLS handshake failed: {0}")]
    Tls(#[source] io::Error),
    #[error("invalid TLS configuration: {0}")]
    Config(String),
}

impl SocksError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SocksError::Timeout(_))
    }
}

impl From<SocksError> for io::Error {
    fn from(err: SocksError) -> Self {
        let kind = match &err {
            SocksError::Io(e) | SocksError::Tls(e) => e.kind(),
            SocksError::Timeout(_) => io::ErrorKind::TimedOut,
            SocksError::InvalidProxy(_)
            | SocksError::InvalidUri(_)
            | SocksError::InvalidPort(_)
            | SocksError::InvalidServerName(_)
            | SocksError::Config(_) => io::ErrorKind::InvalidInput,
            SocksError::Handshake { .. } => io::ErrorKind::ConnectionRefused,
        };
        io::Error::new(kind, err)
    }
}

pub type Result<T> = std::result::Result<T, SocksError>;
