//! Leaf proxies reached over HTTP(S) or SOCKS5, plus direct connections.
//!
//! # Design Decisions
//! - One `reqwest::Client` per proxy, built once from config
//! - No idle pooling: every probe measures a fresh connection
//! - Redirects are not followed; the first response decides the probe

use futures_util::future::{BoxFuture, FutureExt};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

use super::types::delay_ms;
use super::{DelayState, ProbeError, Proxy};
use crate::config::schema::{ProxyEntry, ProxyProtocol};
use crate::health::ranges::StatusRanges;

/// Errors while turning a proxy entry into a usable client.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid proxy address: {0}")]
    Address(#[from] url::ParseError),

    #[error("invalid proxy credentials for {0}")]
    Credentials(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A single outbound proxy.
#[derive(Debug)]
pub struct HttpProxy {
    name: String,
    protocol: ProxyProtocol,
    client: reqwest::Client,
    state: DelayState,
}

impl HttpProxy {
    /// Build from a config entry.
    pub fn from_config(entry: &ProxyEntry) -> Result<Self, AdapterError> {
        let builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .connect_timeout(Duration::from_secs(30));

        let builder = match proxy_url(entry)? {
            Some(url) => builder.proxy(reqwest::Proxy::all(url.as_str())?),
            None => builder.no_proxy(),
        };

        Ok(Self {
            name: entry.name.clone(),
            protocol: entry.protocol,
            client: builder.build()?,
            state: DelayState::new(),
        })
    }
}

/// Proxy URL for the entry, `None` for direct connections.
pub fn proxy_url(entry: &ProxyEntry) -> Result<Option<Url>, AdapterError> {
    let scheme = match entry.protocol {
        ProxyProtocol::Direct => return Ok(None),
        ProxyProtocol::Http => "http",
        ProxyProtocol::Https => "https",
        // Resolve target hostnames on the proxy side.
        ProxyProtocol::Socks5 => "socks5h",
    };

    let mut url = Url::parse(&format!("{}://{}:{}", scheme, entry.server, entry.port))?;
    if let Some(username) = &entry.username {
        url.set_username(username)
            .map_err(|_| AdapterError::Credentials(entry.name.clone()))?;
        url.set_password(entry.password.as_deref())
            .map_err(|_| AdapterError::Credentials(entry.name.clone()))?;
    }
    Ok(Some(url))
}

impl Proxy for HttpProxy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.protocol.as_str()
    }

    fn url_test<'a>(
        &'a self,
        url: &'a str,
        expected: &'a StatusRanges,
        deadline: Instant,
    ) -> BoxFuture<'a, Result<u16, ProbeError>> {
        async move {
            let started = Instant::now();
            let request = self
                .client
                .head(url)
                .header(reqwest::header::USER_AGENT, "proxy-health-check")
                .send();

            let result = match tokio::time::timeout_at(deadline, request).await {
                Ok(Ok(response)) => {
                    let status = response.status().as_u16();
                    if expected.accepts(status) {
                        Ok(delay_ms(started.elapsed()))
                    } else {
                        Err(ProbeError::UnexpectedStatus(status))
                    }
                }
                Ok(Err(e)) => Err(ProbeError::Transport(e.to_string())),
                Err(_) => Err(ProbeError::Timeout),
            };

            if let Err(e) = &result {
                tracing::debug!(proxy = %self.name, error = %e, "URL test failed");
            }
            self.state.record(&result);
            result
        }
        .boxed()
    }

    fn alive(&self) -> bool {
        self.state.alive()
    }

    fn last_delay(&self) -> u16 {
        self.state.last_delay()
    }
}
