use std::time::Duration;

use rustls::pki_types::CertificateDer;
use serde::Deserialize;

use super::ProxyChain;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for the TLS upgrade performed on `https:` connections.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TlsOptions {
    /// When false, any server certificate is accepted.
    pub reject_unauthorized: bool,
    /// Overrides the SNI / verification name, which otherwise is the
    /// request hostname.
    pub server_name: Option<String>,
    /// Bounds both the proxy negotiation and the TLS handshake.
    #[serde(with = "millis")]
    pub timeout: Duration,
    pub alpn_protocols: Vec<String>,
    /// Extra trust anchors on top of the bundled web PKI roots.
    #[serde(skip)]
    pub root_certificates: Vec<CertificateDer<'static>>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            reject_unauthorized: true,
            server_name: None,
            timeout: DEFAULT_CONNECT_TIMEOUT,
            alpn_protocols: Vec::new(),
            root_certificates: Vec::new(),
        }
    }
}

impl TlsOptions {
    pub fn insecure() -> Self {
        Self {
            reject_unauthorized: false,
            ..Default::default()
        }
    }

    pub fn with_root_certificate(mut self, cert: CertificateDer<'static>) -> Self {
        self.root_certificates.push(cert);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Settings forwarded untouched to the hyper-util client builder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentOptions {
    #[serde(with = "millis_opt")]
    pub pool_idle_timeout: Option<Duration>,
    pub pool_max_idle_per_host: Option<usize>,
    pub http1_title_case_headers: Option<bool>,
    pub http1_preserve_header_case: Option<bool>,
    pub http2_only: Option<bool>,
    pub retry_canceled_requests: Option<bool>,
    pub set_host: Option<bool>,
}

/// Full dispatcher configuration. The connector is always the SOCKS one
/// built from `proxy` and `connect`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SocksDispatcherOptions {
    pub proxy: ProxyChain,
    pub connect: TlsOptions,
    #[serde(flatten)]
    pub agent: AgentOptions,
}

impl SocksDispatcherOptions {
    pub fn new(proxy: impl Into<ProxyChain>) -> Self {
        Self {
            proxy: proxy.into(),
            ..Default::default()
        }
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.connect = tls;
        self
    }

    pub fn with_agent(mut self, agent: AgentOptions) -> Self {
        self.agent = agent;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod millis_opt {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_millis))
    }
}
