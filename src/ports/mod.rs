pub mod socks;
pub mod tls;

pub use socks::SocksDialerPort;
pub use tls::TlsUpgradePort;
