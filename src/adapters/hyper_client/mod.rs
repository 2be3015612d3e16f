mod connector;
mod dispatcher;

pub use connector::SocksConnector;
pub use dispatcher::{socks_dispatcher, SocksClient, SocksDispatcherBuilder};
