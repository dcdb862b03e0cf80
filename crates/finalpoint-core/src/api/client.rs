//! API client for the FinalPoint REST API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use tracing::{debug, warn};

use super::ApiError;
use crate::prompt::{PushSubscription, SubscriptionSink};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Push-subscription endpoint, relative to the API base URL.
const PUSH_SUBSCRIPTION_PATH: &str = "notifications/push-subscription";

/// Platform tag the server records for browser subscriptions.
const WEB_PLATFORM: &str = "web";

#[derive(Debug, Serialize)]
struct PushSubscriptionRequest<'a> {
    subscription: &'a PushSubscription,
    platform: &'static str,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("Bearer token contains invalid header characters")?,
            );
        }
        Ok(headers)
    }

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// POST `body` as JSON, retrying with exponential backoff while rate limited.
    async fn post<B: Serialize>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .post(url)
                .headers(self.auth_headers()?)
                .json(body)
                .send()
                .await
                .with_context(|| format!("Failed to send POST request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    // ===== Notifications =====

    /// Register (or re-register) a browser push subscription for the
    /// signed-in user.
    pub async fn register_push_subscription(&self, subscription: &PushSubscription) -> Result<()> {
        let url = self.endpoint(PUSH_SUBSCRIPTION_PATH);
        let body = PushSubscriptionRequest {
            subscription,
            platform: WEB_PLATFORM,
        };
        let response = self
            .post(&url, &body)
            .await
            .context("Failed to register push subscription")?;
        debug!(status = %response.status(), endpoint = %subscription.endpoint, "Registered push subscription");
        Ok(())
    }
}

#[async_trait]
impl SubscriptionSink for ApiClient {
    async fn register(&self, subscription: &PushSubscription) -> Result<()> {
        self.register_push_subscription(subscription).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::SubscriptionKeys;

    #[test]
    fn test_endpoint_joins_cleanly() {
        let client = ApiClient::new("https://finalpoint.app/api/").unwrap();
        assert_eq!(client.base_url(), "https://finalpoint.app/api");
        assert_eq!(
            client.endpoint(PUSH_SUBSCRIPTION_PATH),
            "https://finalpoint.app/api/notifications/push-subscription"
        );
        assert_eq!(
            client.endpoint("/notifications/push-subscription"),
            "https://finalpoint.app/api/notifications/push-subscription"
        );
    }

    #[test]
    fn test_subscription_request_body() {
        let subscription = PushSubscription {
            endpoint: "https://push.example.com/abc".to_string(),
            expiration_time: Some(1_700_000_000_000),
            keys: SubscriptionKeys {
                p256dh: "key".to_string(),
                auth: "secret".to_string(),
            },
        };
        let body = PushSubscriptionRequest {
            subscription: &subscription,
            platform: WEB_PLATFORM,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "subscription": {
                    "endpoint": "https://push.example.com/abc",
                    "expirationTime": 1_700_000_000_000_i64,
                    "keys": { "p256dh": "key", "auth": "secret" }
                },
                "platform": "web"
            })
        );
    }

    #[test]
    fn test_auth_headers() {
        let client = ApiClient::new("https://finalpoint.app/api").unwrap();
        assert!(client.auth_headers().unwrap().is_empty());

        let authed = client.with_token("abc123".to_string());
        assert_eq!(
            authed.auth_headers().unwrap()[header::AUTHORIZATION],
            "Bearer abc123"
        );
    }
}
