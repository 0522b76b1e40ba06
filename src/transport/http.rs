//! reqwest-backed transport
//!
//! Handles HTTP client configuration (timeouts, proxy, user agent) and turns
//! each [`ApiRequest`] into exactly one HTTP call.

use reqwest::{Client, Proxy};
use std::time::Duration;
use url::Url;

use super::{ApiRequest, Method, RawResponse, Transport};
use crate::Result;
use crate::config::settings::{ApiSettings, NetworkSettings};

/// HTTP transport for the rustmaps API
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Base HTTP client
    client: Client,
    /// API root, e.g. `https://rustmaps.com/api/v2`
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport from API and network settings
    pub fn new(api: &ApiSettings, network: &NetworkSettings) -> Result<Self> {
        let mut client_builder = Client::builder()
            .user_agent(network.user_agent.clone())
            .connect_timeout(Duration::from_secs(network.connect_timeout))
            .timeout(Duration::from_millis(network.request_timeout_ms));

        if let Some(proxy_url) = network.proxy_url() {
            let proxy = Proxy::all(&proxy_url).map_err(|e| {
                crate::Error::config("proxy", &format!("Invalid proxy URL {}: {}", proxy_url, e))
            })?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder.build().map_err(|e| {
            crate::Error::config(
                "client_builder",
                &format!("Failed to create HTTP client: {}", e),
            )
        })?;

        Self::with_client(client, &api.base_url)
    }

    /// Create a transport around an existing client
    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        Ok(Self { client, base_url })
    }

    /// API root this transport sends requests to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }
}

fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let url = self.url_for(&request.path)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!("Request {} {} failed: {}", request.method, request.path, e);
            crate::Error::from(e)
        })?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(&response);
        let body = response.text().await?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status,
            "rustmaps responded"
        );

        Ok(RawResponse {
            status,
            body,
            retry_after,
        })
    }
}
