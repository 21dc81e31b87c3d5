//! Rate-limited HTTP client for the flag management API.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::{ApiFamily, ClientConfig, Region};
use crate::error::{ClientError, ClientResult};
use crate::rate_limit::{QuotaBudget, QuotaHeaders};

/// Header selecting the beta API version.
const API_VERSION_HEADER: &str = "LD-API-Version";

/// A fully read API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl ApiResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_str(&self.body).map_err(ClientError::from)
    }

    /// The API's `code` field from an error body, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<String> {
        serde_json::from_str::<Value>(&self.body)
            .ok()?
            .get("code")?
            .as_str()
            .map(str::to_string)
    }

    /// Whether the API rejected the request because the resource already exists.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status == StatusCode::CONFLICT.as_u16()
            || self.error_code().as_deref() == Some("conflict")
    }

    /// Turns a non-success response into [`ClientError::Api`].
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Api {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Client bound to one account (token + region).
pub struct ApiClient {
    http_client: Client,
    api_base: String,
    internal_base: String,
    config: ClientConfig,
    budget: QuotaBudget,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_base", &self.api_base)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client for an account in `region`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(api_token: &str, region: Region, config: ClientConfig) -> ClientResult<Self> {
        Self::with_base_url(&region.base_url(), api_token, config)
    }

    /// Creates a client against an explicit base URL (scheme + host).
    pub fn with_base_url(
        base_url: &str,
        api_token: &str,
        config: ClientConfig,
    ) -> ClientResult<Self> {
        config.validate().map_err(ClientError::InvalidConfig)?;

        let mut auth = HeaderValue::from_str(api_token).map_err(|_| {
            ClientError::InvalidConfig("API token contains invalid characters".to_string())
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(concat!("flagsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        let base_url = base_url.trim_end_matches('/');
        let budget = QuotaBudget::new(config.quota_tries);

        Ok(Self {
            http_client,
            api_base: format!("{base_url}/api/v2"),
            internal_base: format!("{base_url}/internal"),
            config,
            budget,
        })
    }

    /// Base URL of the stable/beta API tree.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Performs a GET request.
    pub async fn get(&self, path: &str, family: ApiFamily) -> ClientResult<ApiResponse> {
        self.send(Method::GET, path, None::<&()>, family).await
    }

    /// Performs a POST request with a JSON body.
    pub async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        family: ApiFamily,
    ) -> ClientResult<ApiResponse> {
        self.send(Method::POST, path, Some(body), family).await
    }

    /// Performs a PUT request with a JSON body.
    pub async fn put<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        family: ApiFamily,
    ) -> ClientResult<ApiResponse> {
        self.send(Method::PUT, path, Some(body), family).await
    }

    /// Performs a PATCH request with a JSON body.
    pub async fn patch<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        family: ApiFamily,
    ) -> ClientResult<ApiResponse> {
        self.send(Method::PATCH, path, Some(body), family).await
    }

    /// Performs a DELETE request.
    pub async fn delete(&self, path: &str, family: ApiFamily) -> ClientResult<ApiResponse> {
        self.send(Method::DELETE, path, None::<&()>, family).await
    }

    /// Sends a request, honoring the route quota reported by the API.
    ///
    /// Non-success statuses are returned as responses, not errors; callers
    /// decide what a failure means for them. When the quota stays exhausted
    /// for the whole throttle budget the response is discarded and
    /// [`ClientError::RateLimitExceeded`] is returned instead.
    #[instrument(skip(self, body), fields(method = %method))]
    pub async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        family: ApiFamily,
    ) -> ClientResult<ApiResponse> {
        let url = self.url_for(path, family);

        loop {
            let response = self.send_with_retry(&method, &url, body, family).await?;
            let quota = QuotaHeaders::from_headers(response.headers());
            let status = response.status();
            let text = response.text().await?;

            debug!(url = %url, status = %status, remaining = ?quota.remaining, "Received API response");

            if status == StatusCode::TOO_MANY_REQUESTS {
                if self.budget.consume() {
                    warn!(url = %url, "Rate limit budget exhausted");
                    return Err(ClientError::RateLimitExceeded {
                        path: path.to_string(),
                    });
                }
                let wait = quota.wait(now_epoch_ms(), self.config.min_quota_wait);
                warn!(url = %url, wait_ms = wait.as_millis(), "Rate limited (429), waiting before resend");
                tokio::time::sleep(wait).await;
                continue;
            }

            if quota.is_low(self.config.quota_low_water) {
                let exhausted = self.budget.consume();
                let wait = quota.wait(now_epoch_ms(), self.config.min_quota_wait);
                info!(
                    url = %url,
                    wait_ms = wait.as_millis(),
                    tries_left = self.budget.remaining(),
                    "Rate limit reached, waiting for quota reset"
                );
                tokio::time::sleep(wait).await;
                if exhausted {
                    return Err(ClientError::RateLimitExceeded {
                        path: path.to_string(),
                    });
                }
            } else if quota.remaining.is_some() {
                self.budget.reset();
            }

            return Ok(ApiResponse {
                status: status.as_u16(),
                body: text,
            });
        }
    }

    /// Sends the request, retrying connection-level failures with a fixed backoff.
    async fn send_with_retry<B: Serialize>(
        &self,
        method: &Method,
        url: &str,
        body: Option<&B>,
        family: ApiFamily,
    ) -> ClientResult<reqwest::Response> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut request = self.http_client.request(method.clone(), url);
            if family.is_beta() {
                request = request.header(API_VERSION_HEADER, "beta");
            }
            if let Some(b) = body {
                request = request.json(b);
            }

            debug!(url = %url, attempt = attempt, "Sending API request");

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.config.max_attempts => {
                    warn!(
                        url = %url,
                        error = %e,
                        attempt = attempt,
                        wait_ms = self.config.retry_backoff.as_millis(),
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(e) => {
                    return Err(ClientError::ConnectionFailed {
                        url: url.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    fn url_for(&self, path: &str, family: ApiFamily) -> String {
        let base = if family.is_internal() {
            &self.internal_base
        } else {
            &self.api_base
        };
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_url_for_families() {
        let client =
            ApiClient::with_base_url("https://example.test/", "token", ClientConfig::for_testing())
                .unwrap();

        assert_eq!(
            client.url_for("/flags/p", ApiFamily::Stable),
            "https://example.test/api/v2/flags/p"
        );
        assert_eq!(
            client.url_for("flags/p", ApiFamily::Beta),
            "https://example.test/api/v2/flags/p"
        );
        assert_eq!(
            client.url_for("/projects/p/flag-templates", ApiFamily::InternalBeta),
            "https://example.test/internal/projects/p/flag-templates"
        );
    }

    #[test]
    fn test_invalid_token_rejected() {
        let result = ApiClient::new("bad\ntoken", Region::Commercial, ClientConfig::default());
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = ApiClient::new("secret-token", Region::Federal, ClientConfig::default())
            .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("app.launchdarkly.us"));
    }

    #[test]
    fn test_response_conflict_detection() {
        assert!(response(409, "").is_conflict());
        assert!(response(400, r#"{"code":"conflict","message":"exists"}"#).is_conflict());
        assert!(!response(400, r#"{"code":"invalid_request"}"#).is_conflict());
        assert!(!response(201, "{}").is_conflict());
    }

    #[test]
    fn test_error_for_status() {
        assert!(response(204, "").error_for_status().is_ok());
        match response(404, "missing").error_for_status() {
            Err(ClientError::Api { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "missing");
            }
            other => panic!("Expected Api error, got: {other:?}"),
        }
    }

    #[test]
    fn test_non_json_body_is_decode_error() {
        let result: ClientResult<Value> = response(200, "Rate limit exceeded.").json();
        assert!(matches!(result, Err(ClientError::Decode(_))));
    }
}
