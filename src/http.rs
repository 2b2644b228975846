use crate::error::Result;
use reqwest::Client;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of an HTTP request.
///
/// Non-2xx responses and transport errors are both reported as `success == false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    pub success: bool,
    pub body: Option<String>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            success: true,
            body: Some(body.into()),
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

/// Boxed future returned by [`HttpClient`] methods
pub type HttpFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// Minimal HTTP transport used for session setup, schedule refresh and beacons
///
/// The returned futures own everything they need, so callers can spawn them
/// without borrowing the client.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> HttpFuture;

    fn post(&self, url: &str, params: Option<&Map<String, Value>>) -> HttpFuture;
}

/// Default [`HttpClient`] backed by a pooled `reqwest::Client`
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client, sharing its connection pool
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(request: reqwest::RequestBuilder, url: String) -> HttpResponse {
        match request.send().await {
            Ok(resp) => {
                let status = resp.status();
                debug!("HTTP {} -> {}", url, status);
                let success = status.is_success();
                let body = match resp.text().await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!("Failed to read response body from {}: {}", url, e);
                        return HttpResponse::failed();
                    }
                };
                HttpResponse { success, body }
            }
            Err(e) => {
                warn!("HTTP request to {} failed: {}", url, e);
                HttpResponse::failed()
            }
        }
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, url: &str) -> HttpFuture {
        let request = self.client.get(url);
        Box::pin(Self::send(request, url.to_string()))
    }

    fn post(&self, url: &str, params: Option<&Map<String, Value>>) -> HttpFuture {
        let mut request = self.client.post(url);
        if let Some(params) = params {
            request = request.json(params);
        }
        Box::pin(Self::send(request, url.to_string()))
    }
}
