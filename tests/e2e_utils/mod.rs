#![allow(dead_code)]
#![allow(unused_imports)]

pub mod recording_ports;
pub mod target_server;

pub use proxy_chain_fixture::{ProxyChainFixture, RunningHop};
pub use recording_ports::{CountingUpgrader, DialCall, RecordingDialer};
pub use socks_server::{HopRecord, TestSocksServer};
pub use target_server::{TestCertificate, TestTargetServer, RESPONSE_DATA};

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::Uri;
use hyper_socks_chain::SocksClient;
use std::net::TcpListener as StdTcpListener;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// GET `uri` and return status and body as text.
pub async fn fetch(
    client: &SocksClient<Empty<Bytes>>,
    uri: &str,
) -> Result<(u16, String), Box<dyn std::error::Error + Send + Sync>> {
    let uri: Uri = uri.parse()?;
    let response = client.get(uri).await?;
    let status = response.status().as_u16();
    let body = response.into_body().collect().await?.to_bytes();
    Ok((status, String::from_utf8(body.to_vec())?))
}

/// A port on localhost with nothing listening.
pub fn closed_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    listener.local_addr().expect("Failed to read local addr").port()
}

/// Walk the `source()` chain looking for the connector's error.
pub fn find_socks_error<'a>(
    err: &'a (dyn std::error::Error + 'static),
) -> Option<&'a hyper_socks_chain::SocksError> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(socks) = e.downcast_ref::<hyper_socks_chain::SocksError>() {
            return Some(socks);
        }
        current = e.source();
    }
    None
}
