//! Route hyper client connections through chained SOCKS4/SOCKS5 proxies.
//!
//! ```rust,no_run
//! use http_body_util::Empty;
//! use hyper::body::Bytes;
//! use hyper_socks_chain::{socks_dispatcher, SocksDispatcherOptions, SocksProxy};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let options = SocksDispatcherOptions::new(vec![
//!     SocksProxy::v5("127.0.0.1", 1080),
//!     SocksProxy::v5("10.0.0.2", 1080).with_credentials("foo", "bar"),
//! ]);
//! let client = socks_dispatcher::<Empty<Bytes>>(options)?;
//! let response = client.get("http://example.com/".parse()?).await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod connection;
pub mod domain;
pub mod ports;

pub use adapters::{socks_dispatcher, SocksClient, SocksConnector, SocksDispatcherBuilder};
pub use connection::SocksStream;
pub use domain::{
    resolve_port, AgentOptions, Credentials, ProxyChain, SocksDispatcherOptions, SocksError, SocksProxy,
    SocksVersion, TlsOptions,
};
