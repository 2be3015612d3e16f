use std::borrow::Cow;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use hyper::Uri;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tokio_socks::TargetAddr;
use url::Url;

use super::{Result, SocksError};

pub const DEFAULT_SOCKS_PORT: u16 = 1080;
const MAX_AUTH_FIELD_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub enum SocksVersion {
    V4,
    V5,
}

impl TryFrom<u8> for SocksVersion {
    type Error = SocksError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            4 => Ok(SocksVersion::V4),
            5 => Ok(SocksVersion::V5),
            other => Err(SocksError::InvalidProxy(format!(
                "unsupported SOCKS version {}",
                other
            ))),
        }
    }
}

impl SocksVersion {
    pub fn scheme(&self) -> &'static str {
        match self {
            SocksVersion::V4 => "socks4",
            SocksVersion::V5 => "socks5",
        }
    }
}

/// Proxy credentials. For SOCKS4 the username is sent as the user id and
/// there is no password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
        }
    }

    pub fn user_id(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A single SOCKS proxy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ProxyRepr")]
pub struct SocksProxy {
    pub host: String,
    pub port: u16,
    pub version: SocksVersion,
    pub credentials: Option<Credentials>,
}

impl SocksProxy {
    pub fn new(host: impl Into<String>, port: u16, version: SocksVersion) -> Self {
        Self {
            host: strip_brackets(&host.into()).to_string(),
            port,
            version,
            credentials: None,
        }
    }

    pub fn v4(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, SocksVersion::V4)
    }

    pub fn v5(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, SocksVersion::V5)
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::user_id(user_id));
        self
    }

    /// Rejects descriptors no SOCKS proxy could accept.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(SocksError::InvalidProxy("missing proxy host".to_string()));
        }
        if self.port == 0 {
            return Err(SocksError::InvalidProxy(format!(
                "invalid port 0 for proxy {}",
                self.host
            )));
        }
        if let Some(creds) = &self.credentials {
            if creds.username.is_empty() {
                return Err(SocksError::InvalidProxy(format!(
                    "empty username for proxy {}",
                    self
                )));
            }
            match (self.version, &creds.password) {
                (SocksVersion::V4, Some(_)) => {
                    return Err(SocksError::InvalidProxy(format!(
                        "SOCKS4 proxy {} does not support password authentication",
                        self
                    )))
                }
                (SocksVersion::V4, None) => {}
                (SocksVersion::V5, None) => {
                    return Err(SocksError::InvalidProxy(format!(
                        "missing password for proxy {}",
                        self
                    )))
                }
                // RFC 1929 length-prefixes both fields with a single byte.
                (SocksVersion::V5, Some(password)) => {
                    if creds.username.len() > MAX_AUTH_FIELD_LEN
                        || password.is_empty()
                        || password.len() > MAX_AUTH_FIELD_LEN
                    {
                        return Err(SocksError::InvalidProxy(format!(
                            "username and password for proxy {} must be 1 to 255 bytes",
                            self
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn target_addr(&self) -> TargetAddr<'_> {
        target_addr(&self.host, self.port)
    }
}

impl fmt::Display for SocksProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.version.scheme(), self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.version.scheme(), self.host, self.port)
        }
    }
}

impl FromStr for SocksProxy {
    type Err = SocksError;

    fn from_str(s: &str) -> Result<Self> {
        let url = Url::parse(s).map_err(|e| SocksError::InvalidProxy(format!("{}: {}", s, e)))?;

        let version = match url.scheme() {
            "socks4" | "socks4a" => SocksVersion::V4,
            "socks5" | "socks5h" | "socks" => SocksVersion::V5,
            other => {
                return Err(SocksError::InvalidProxy(format!(
                    "unsupported proxy scheme {}",
                    other
                )))
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| SocksError::InvalidProxy(format!("missing host in {}", s)))?;

        let mut proxy = SocksProxy::new(host, url.port().unwrap_or(DEFAULT_SOCKS_PORT), version);
        if !url.username().is_empty() {
            proxy.credentials = Some(Credentials {
                username: decode_userinfo(url.username())?,
                password: url.password().map(decode_userinfo).transpose()?,
            });
        }
        proxy.validate()?;
        Ok(proxy)
    }
}

fn decode_userinfo(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| SocksError::InvalidProxy(format!("proxy credentials are not valid UTF-8: {}", e)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProxyRepr {
    Url(String),
    #[serde(rename_all = "camelCase")]
    Object {
        host: String,
        #[serde(default = "default_socks_port")]
        port: u16,
        #[serde(rename = "type")]
        version: SocksVersion,
        #[serde(default, alias = "username")]
        user_id: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
}

fn default_socks_port() -> u16 {
    DEFAULT_SOCKS_PORT
}

impl TryFrom<ProxyRepr> for SocksProxy {
    type Error = SocksError;

    fn try_from(repr: ProxyRepr) -> Result<Self> {
        match repr {
            ProxyRepr::Url(url) => url.parse(),
            ProxyRepr::Object {
                host,
                port,
                version,
                user_id,
                password,
            } => {
                let mut proxy = SocksProxy::new(host, port, version);
                if let Some(username) = user_id {
                    proxy.credentials = Some(Credentials { username, password });
                }
                proxy.validate()?;
                Ok(proxy)
            }
        }
    }
}

/// Ordered list of proxies, first hop first. Empty means a direct connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyChain(Vec<SocksProxy>);

impl ProxyChain {
    pub fn direct() -> Self {
        Self(Vec::new())
    }

    pub fn hops(&self) -> &[SocksProxy] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        self.0.iter().try_for_each(SocksProxy::validate)
    }
}

impl From<SocksProxy> for ProxyChain {
    fn from(proxy: SocksProxy) -> Self {
        Self(vec![proxy])
    }
}

impl From<Option<SocksProxy>> for ProxyChain {
    fn from(proxy: Option<SocksProxy>) -> Self {
        Self(proxy.into_iter().collect())
    }
}

impl From<Vec<SocksProxy>> for ProxyChain {
    fn from(proxies: Vec<SocksProxy>) -> Self {
        Self(proxies)
    }
}

impl From<&[SocksProxy]> for ProxyChain {
    fn from(proxies: &[SocksProxy]) -> Self {
        Self(proxies.to_vec())
    }
}

impl<const N: usize> From<[SocksProxy; N]> for ProxyChain {
    fn from(proxies: [SocksProxy; N]) -> Self {
        Self(proxies.into())
    }
}

impl FromIterator<SocksProxy> for ProxyChain {
    fn from_iter<I: IntoIterator<Item = SocksProxy>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for ProxyChain {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(SocksProxy),
            Many(Vec<SocksProxy>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(proxy) => proxy.into(),
            OneOrMany::Many(proxies) => proxies.into(),
        })
    }
}

/// Where the last hop should connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub host: String,
    pub port: u16,
}

impl Destination {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: strip_brackets(&host.into()).to_string(),
            port,
        }
    }

    pub fn target_addr(&self) -> TargetAddr<'_> {
        target_addr(&self.host, self.port)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    Connect,
}

/// Everything a dialer needs to negotiate a tunnel to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRequest {
    pub proxies: Vec<SocksProxy>,
    pub command: SocksCommand,
    pub destination: Destination,
    pub timeout: Duration,
}

/// The pieces of an outbound request the connector cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRequest {
    /// Always ends with a colon, e.g. `https:`.
    pub scheme: String,
    pub hostname: String,
    /// Empty when the URI carries no explicit port.
    pub port: String,
}

impl ConnectionRequest {
    pub fn from_uri(uri: &Uri) -> Result<Self> {
        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| SocksError::InvalidUri(format!("missing host in {}", uri)))?;
        let scheme = uri.scheme_str().unwrap_or("http");

        Ok(Self {
            scheme: format!("{}:", scheme.to_ascii_lowercase()),
            hostname: strip_brackets(host).to_string(),
            port: uri.port().map(|p| p.as_str().to_string()).unwrap_or_default(),
        })
    }

    pub fn is_secure(&self) -> bool {
        matches!(self.scheme.as_str(), "https:" | "wss:")
    }

    pub fn destination(&self) -> Result<Destination> {
        Ok(Destination::new(
            self.hostname.clone(),
            resolve_port(&self.scheme, &self.port)?,
        ))
    }
}

/// Resolves the port to dial: an explicit port wins, otherwise 80 for
/// `http:` and 443 for anything else.
pub fn resolve_port(scheme: &str, port: &str) -> Result<u16> {
    if !port.is_empty() {
        return port
            .parse()
            .map_err(|_| SocksError::InvalidPort(port.to_string()));
    }
    match scheme.trim_end_matches(':') {
        "http" => Ok(80),
        _ => Ok(443),
    }
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

fn target_addr(host: &str, port: u16) -> TargetAddr<'_> {
    match host.parse::<IpAddr>() {
        Ok(ip) => TargetAddr::Ip(SocketAddr::new(ip, port)),
        Err(_) => TargetAddr::Domain(Cow::Borrowed(host), port),
    }
}
