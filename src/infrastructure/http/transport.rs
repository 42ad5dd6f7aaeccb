use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client as ReqwestClient;

use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::models::{Body, ExchangeRequest, ExchangeResponse};
use crate::domain::ports::Exchange;

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,

    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 10,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Default transport: executes exchanges over the network with reqwest.
///
/// Response bodies are returned as streams; per-call timeouts are applied by
/// the outbound executor, not here.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: ReqwestClient,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_config(&HttpTransportConfig::default())
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built, e.g. when the TLS
    /// backend fails to initialize.
    pub fn with_config(config: &HttpTransportConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl Exchange for HttpTransport {
    async fn exchange(&self, req: ExchangeRequest) -> ExchangeResult<ExchangeResponse> {
        let mut builder = self
            .http_client
            .request(req.method, req.url)
            .headers(req.headers);
        if !req.body.is_empty() {
            builder = builder.body(req.body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ExchangeError::from_transport(&e, Duration::ZERO))?;

        let status = response.status();
        let headers = response.headers().clone();
        let stream = response
            .bytes_stream()
            .map_err(|e| ExchangeError::Io(e.to_string()))
            .boxed();

        Ok(ExchangeResponse::with_body(
            status,
            headers,
            Body::Stream(stream),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_config_builds_client() {
        let config = HttpTransportConfig {
            pool_max_idle_per_host: 1,
            connect_timeout: Duration::from_millis(250),
        };
        assert!(HttpTransport::with_config(&config).is_ok());
    }
}
