pub mod hyper_client;
pub mod rustls_tls;
pub mod socks_client;

pub use hyper_client::{socks_dispatcher, SocksClient, SocksConnector, SocksDispatcherBuilder};
pub use rustls_tls::RustlsUpgrader;
pub use socks_client::TokioSocksDialer;
