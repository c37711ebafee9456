//! HTTP transport port and its reqwest adapter

use std::time::Duration;

use async_trait::async_trait;
use polyscan_core::error::{PolyscanError, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound request, independent of the HTTP library
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// The body carries a spatial filter; a server error then points at the geometry
    pub spatial_filter: bool,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            spatial_filter: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    pub fn with_spatial_filter(mut self, spatial_filter: bool) -> Self {
        self.spatial_filter = spatial_filter;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }
}

/// Failure to get any HTTP response at all
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Port for sending requests to the remote service
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError>;
}

/// Transport backed by a shared `reqwest::Client`
pub struct HttpTransport {
    client: reqwest::Client,
    token: String,
}

impl HttpTransport {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            PolyscanError::Network {
                reason: format!("Failed to build HTTP client: {}", e),
                transient: false,
            }
        })?;

        Ok(Self { client, token: token.into() })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let url = if request.query.is_empty() {
            reqwest::Url::parse(&request.url)
        } else {
            reqwest::Url::parse_with_params(&request.url, &request.query)
        }
        .map_err(|e| TransportError::Other(format!("invalid URL {}: {}", request.url, e)))?;

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        let mut builder = builder
            .header("X-AUTH-TOKEN", &self.token)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!("API Request: {:?} {}", request.method, request.url);
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!("Status Code: {}", status);

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::post("https://example.test/v1/places/scan")
            .with_body(json!({"filter": {"relation": "geo_polygon", "value": []}}))
            .with_spatial_filter(true);

        assert_eq!(request.method, Method::Post);
        assert!(request.spatial_filter);
        assert!(request.query.is_empty());

        let page = ApiRequest::get("https://example.test/v1/places/scan/abc")
            .with_query([("packages".to_string(), "enhanced_v2".to_string())]);
        assert_eq!(page.query, vec![("packages".to_string(), "enhanced_v2".to_string())]);
        assert!(page.body.is_none());
        assert!(!page.spatial_filter);
    }

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::Timeout("slow".into()).is_transient());
        assert!(TransportError::Connect("refused".into()).is_transient());
        assert!(!TransportError::Other("bad url".into()).is_transient());
    }
}
