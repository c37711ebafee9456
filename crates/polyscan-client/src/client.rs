//! Single request path shared by every query: rate gate, retries and status
//! classification.

use std::sync::Arc;
use std::time::Duration;

use polyscan_core::config::LayeredConfig;
use polyscan_core::error::{PolyscanError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::rate_limit::{Clock, RateLimiter, SystemClock};
use crate::transport::{ApiRequest, HttpTransport, Transport};

/// Bounded retry for rate-limited and transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Wait before the first retry; doubled on each further retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor)
    }
}

/// Client settings derived from the layered configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub base_url: String,
    pub rate_limit: u32,
    pub rate_window: Duration,
    pub page_delay: Duration,
    pub retry: RetryPolicy,
    pub places_package: String,
    pub people_package: String,
}

impl ClientSettings {
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            base_url: config.base_url.value.trim_end_matches('/').to_string(),
            rate_limit: config.rate_limit.value,
            rate_window: config.rate_window(),
            page_delay: config.page_delay(),
            retry: RetryPolicy {
                max_retries: config.max_retries.value,
                base_delay: config.retry_delay(),
            },
            places_package: config.places_package.value.clone(),
            people_package: config.people_package.value.clone(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&LayeredConfig::default())
    }
}

/// Outcome of a request that did not fail outright
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Data(Value),
    /// The service answered a spatially filtered request with a server error,
    /// which in practice means it could not use the polygon
    GeometryRejected { status: u16, detail: String },
}

/// Handle to the remote service. Cheap to clone; clones share the rate gate.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    settings: ClientSettings,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, clock: Arc<dyn Clock>, settings: ClientSettings) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            settings.rate_limit,
            settings.rate_window,
            clock.clone(),
        ));
        Self { transport, limiter, clock, settings }
    }

    /// Build an HTTP client from configuration. Fails when no token is set.
    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        let token = config.require_token()?;
        let transport = HttpTransport::new(token, config.request_timeout())?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(SystemClock),
            ClientSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url, path)
    }

    /// Send a request, retrying 429 responses and transient network
    /// failures with exponential backoff. Every attempt passes the rate gate.
    pub async fn execute(&self, request: &ApiRequest) -> Result<Reply> {
        let max_retries = self.settings.retry.max_retries;
        let mut attempt = 0u32;

        loop {
            if attempt > 0 {
                let delay = self.settings.retry.delay(attempt);
                tracing::warn!("  retry {}/{} in {:?}...", attempt, max_retries, delay);
                self.clock.sleep(delay).await;
            }

            self.limiter.acquire().await;

            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) if e.is_transient() && attempt < max_retries => {
                    tracing::warn!("  transient error: {}", e);
                    attempt += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!("Request error: {}", e);
                    return Err(PolyscanError::Network {
                        reason: e.to_string(),
                        transient: e.is_transient(),
                    });
                }
            };

            match response.status {
                200 => return parse_body(&request.url, &response.body).map(Reply::Data),
                429 if attempt < max_retries => {
                    tracing::warn!("Rate limit exceeded. Retrying after delay.");
                    attempt += 1;
                }
                429 => {
                    tracing::error!("Rate limit still exceeded after {} retries", max_retries);
                    return Err(PolyscanError::RateLimited { attempts: attempt + 1 });
                }
                500 if request.spatial_filter => {
                    tracing::error!(
                        "Malformed polygon, please fix geometry. Status code {}: {}",
                        response.status,
                        response.body
                    );
                    return Ok(Reply::GeometryRejected {
                        status: response.status,
                        detail: response.body,
                    });
                }
                status => {
                    tracing::error!(
                        "API request failed with status code {}: {}",
                        status,
                        response.body
                    );
                    return Err(PolyscanError::Http { status, body: response.body });
                }
            }
        }
    }
}

fn parse_body(endpoint: &str, body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| PolyscanError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Deserialize a reply payload into a typed response
pub(crate) fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| PolyscanError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy { max_retries: 3, base_delay: Duration::from_secs(2) };
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = ClientSettings::default();
        assert_eq!(settings.base_url, "https://api.data-axle.com/v1");
        assert_eq!(settings.rate_limit, 150);
        assert_eq!(settings.rate_window, Duration::from_secs(10));
        assert_eq!(settings.page_delay, Duration::from_millis(100));
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.places_package, "enhanced_v2");
        assert_eq!(settings.people_package, "enhanced");
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body("scan", "  ").unwrap(), Value::Null);
        assert_eq!(parse_body("scan", "[1]").unwrap(), serde_json::json!([1]));
        assert!(matches!(
            parse_body("scan", "<html>"),
            Err(PolyscanError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_from_config_requires_token() {
        let config = LayeredConfig::default();
        assert!(matches!(
            ApiClient::from_config(&config),
            Err(PolyscanError::ConfigMissing { .. })
        ));
    }
}
