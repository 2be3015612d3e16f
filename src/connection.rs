use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// A socket tunnelled through the proxy chain, handed to hyper once connected.
pub enum SocksStream {
    Plain { inner: TokioIo<TcpStream> },
    Tls { inner: TokioIo<TlsStream<TcpStream>> },
}

impl SocksStream {
    pub fn is_tls(&self) -> bool {
        matches!(self, SocksStream::Tls { .. })
    }

    pub fn tcp(&self) -> &TcpStream {
        match self {
            SocksStream::Plain { inner } => inner.inner(),
            SocksStream::Tls { inner } => inner.inner().get_ref().0,
        }
    }

    /// Local address of the socket to the first hop (or the target, when
    /// there is no proxy).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp().local_addr()
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.tcp().peer_addr()
    }

    /// ALPN protocol agreed during the TLS handshake, if any.
    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        match self {
            SocksStream::Plain { .. } => None,
            SocksStream::Tls { inner } => inner.inner().get_ref().1.alpn_protocol(),
        }
    }
}

impl std::fmt::Debug for SocksStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocksStream")
            .field("tls", &self.is_tls())
            .field("local_addr", &self.local_addr().ok())
            .field("peer_addr", &self.peer_addr().ok())
            .finish()
    }
}

impl From<TcpStream> for SocksStream {
    fn from(inner: TcpStream) -> Self {
        SocksStream::Plain {
            inner: TokioIo::new(inner),
        }
    }
}

impl From<TlsStream<TcpStream>> for SocksStream {
    fn from(inner: TlsStream<TcpStream>) -> Self {
        SocksStream::Tls {
            inner: TokioIo::new(inner),
        }
    }
}

impl Read for SocksStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            SocksStream::Plain { inner } => Pin::new(inner).poll_read(cx, buf),
            SocksStream::Tls { inner } => Pin::new(inner).poll_read(cx, buf),
        }
    }
}

impl Write for SocksStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            SocksStream::Plain { inner } => Pin::new(inner).poll_write(cx, buf),
            SocksStream::Tls { inner } => Pin::new(inner).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            SocksStream::Plain { inner } => Pin::new(inner).poll_flush(cx),
            SocksStream::Tls { inner } => Pin::new(inner).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            SocksStream::Plain { inner } => Pin::new(inner).poll_shutdown(cx),
            SocksStream::Tls { inner } => Pin::new(inner).poll_shutdown(cx),
        }
    }

    fn is_write_vectored(&self) -> bool {
        match self {
            SocksStream::Plain { inner } => inner.is_write_vectored(),
            SocksStream::Tls { inner } => inner.is_write_vectored(),
        }
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            SocksStream::Plain { inner } => Pin::new(inner).poll_write_vectored(cx, bufs),
            SocksStream::Tls { inner } => Pin::new(inner).poll_write_vectored(cx, bufs),
        }
    }
}

// SOCKS tunnels are transparent to HTTP, so the connection is never marked
// as a proxy: hyper must keep sending origin-form request targets.
impl Connection for SocksStream {
    fn connected(&self) -> Connected {
        let connected = Connected::new().proxy(false);
        match self.alpn_protocol() {
            Some(b"h2") => connected.negotiated_h2(),
            _ => connected,
        }
    }
}
