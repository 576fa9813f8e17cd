//! HTTP transport — the only place that talks to the network.
//!
//! `ReqwestTransport` is a thin wrapper over a pooled `reqwest::Client`;
//! the session protocol lives above it and is tested against a mock.

use std::time::Duration;

use serde_json::Value;

use super::types::{ApiRequest, ApiResponse, Method};
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Executes one fully-prepared request. Implementations must not retry.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

pub struct ReqwestTransport {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    /// Build a transport with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the TLS backend fails to initialize.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.config.url(&request.path);
        let mut builder = self.http.request(to_reqwest_method(request.method), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        tracing::debug!(method = request.method.as_str(), path = %request.path, status, "api response");

        Ok(ApiResponse::new(status, parse_body(&text)))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Bodies that are not JSON (HTML error pages, 204s) are kept as text or `Null`.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
