use std::sync::Arc;

use hyper::body::Body;
use hyper_util::client::legacy::{Builder, Client};
use hyper_util::rt::{TokioExecutor, TokioTimer};

use super::SocksConnector;
use crate::adapters::{RustlsUpgrader, TokioSocksDialer};
use crate::domain::{AgentOptions, ProxyChain, Result, SocksDispatcherOptions, TlsOptions};
use crate::ports::{SocksDialerPort, TlsUpgradePort};

/// HTTP client whose every connection goes through the configured SOCKS chain.
pub type SocksClient<B> = Client<SocksConnector, B>;

/// Build an HTTP client from [`SocksDispatcherOptions`].
pub fn socks_dispatcher<B>(options: SocksDispatcherOptions) -> Result<SocksClient<B>>
where
    B: Body + Send + 'static,
    B::Data: Send,
{
    SocksDispatcherBuilder::from_options(options).build()
}

pub struct SocksDispatcherBuilder {
    proxies: ProxyChain,
    tls: TlsOptions,
    agent: AgentOptions,
    dialer: Option<Arc<dyn SocksDialerPort>>,
    tls_upgrader: Option<Arc<dyn TlsUpgradePort>>,
}

impl SocksDispatcherBuilder {
    pub fn new(proxies: impl Into<ProxyChain>) -> Self {
        Self::from_options(SocksDispatcherOptions::new(proxies))
    }

    pub fn from_options(options: SocksDispatcherOptions) -> Self {
        Self {
            proxies: options.proxy,
            tls: options.connect,
            agent: options.agent,
            dialer: None,
            tls_upgrader: None,
        }
    }

    pub fn tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    pub fn agent(mut self, agent: AgentOptions) -> Self {
        self.agent = agent;
        self
    }

    /// Replace the `tokio-socks` dialer.
    pub fn dialer(mut self, dialer: Arc<dyn SocksDialerPort>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// Replace the `tokio-rustls` upgrader.
    pub fn tls_upgrader(mut self, upgrader: Arc<dyn TlsUpgradePort>) -> Self {
        self.tls_upgrader = Some(upgrader);
        self
    }

    pub fn connector(&self) -> Result<SocksConnector> {
        let dialer = match &self.dialer {
            Some(dialer) => dialer.clone(),
            None => Arc::new(TokioSocksDialer::new()),
        };
        let tls_upgrader = match &self.tls_upgrader {
            Some(upgrader) => upgrader.clone(),
            None => Arc::new(RustlsUpgrader::new(&self.tls)?),
        };
        SocksConnector::with_ports(self.proxies.clone(), &self.tls, dialer, tls_upgrader)
    }

    pub fn build<B>(self) -> Result<SocksClient<B>>
    where
        B: Body + Send + 'static,
        B::Data: Send,
    {
        let connector = self.connector()?;
        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        apply_agent_options(&mut builder, &self.agent);
        Ok(builder.build(connector))
    }
}

fn apply_agent_options(builder: &mut Builder, agent: &AgentOptions) {
    if let Some(timeout) = agent.pool_idle_timeout {
        builder.pool_idle_timeout(timeout);
    }
    if let Some(max) = agent.pool_max_idle_per_host {
        builder.pool_max_idle_per_host(max);
    }
    if let Some(enabled) = agent.http1_title_case_headers {
        builder.http1_title_case_headers(enabled);
    }
    if let Some(enabled) = agent.http1_preserve_header_case {
        builder.http1_preserve_header_case(enabled);
    }
    if let Some(enabled) = agent.http2_only {
        builder.http2_only(enabled);
    }
    if let Some(enabled) = agent.retry_canceled_requests {
        builder.retry_canceled_requests(enabled);
    }
    if let Some(enabled) = agent.set_host {
        builder.set_host(enabled);
    }
}
