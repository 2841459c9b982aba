//! HTTP transport for the conference REST backend
//!
//! This module implements request/response types, the backend's error
//! conventions, retry helpers, and the reqwest-based client used by
//! [`crate::api::ConferenceAgent`].
//!
//! The backend speaks JSON. A `204 No Content` reply counts as success, a
//! failing reply carries a `message` field, and anything that is not JSON is
//! reported as an invalid response.

use reqwest::{Client as ReqwestClient, Response as ReqwestResponse};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Message used when a failing response carries no `message` field
pub const FALLBACK_ERROR_MESSAGE: &str = "API request failed";

/// Message used when a response body is not valid JSON
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid response format";

// =============================================================================
// Error Types
// =============================================================================

/// API error with HTTP status and message
///
/// Status `0` marks failures that never produced an HTTP response
/// (connection refused, timeout, unreadable body).
///
/// # Examples
/// ```
/// use conference_client::http::ApiError;
///
/// let error = ApiError::new(404, "NotFound", "Workshop not found");
/// assert_eq!(error.status(), 404);
/// assert!(!error.is_network_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: u16,
    error: String,
    message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status, error: error.into(), message: message.into() }
    }

    /// Create a transport-level error (no HTTP response)
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(0, "NetworkError", message)
    }

    /// Create an error for a body that could not be decoded
    pub fn invalid_response(status: u16) -> Self {
        Self::new(status, "InvalidResponse", INVALID_RESPONSE_MESSAGE)
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the error code
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a network-related error that may be retried
    ///
    /// Network failure statuses: 0, 408, 425, 429, 500, 502, 503, 504, 522, 524
    pub fn is_network_error(&self) -> bool {
        matches!(self.status, 0 | 408 | 425 | 429 | 500 | 502 | 503 | 504 | 522 | 524)
    }

    /// Check if the server rejected our credentials
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API error {}: {} - {}", self.status, self.error, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error body returned by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Optional error code
    #[serde(default)]
    pub error: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
}

impl HttpMethod {
    /// Method name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Request to a backend endpoint
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the base URL, starting with `/`
    pub path: String,
    /// Query parameters, in insertion order
    pub params: Vec<(String, String)>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// JSON request body
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    fn with_method(method: HttpMethod, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Self { method, path, params: Vec::new(), headers: HashMap::new(), body: None }
    }

    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Get, path)
    }

    /// Create a POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Post, path)
    }

    /// Create a PUT request
    pub fn put(path: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Put, path)
    }

    /// Create a DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Delete, path)
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attach a bearer token
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    /// Set the request body from JSON
    pub fn json_body<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(value)?);
        Ok(self)
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Decoded response
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lower-case names)
    pub headers: HashMap<String, String>,
    /// Response data
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Create a new response
    pub fn new(status: u16, headers: HashMap<String, String>, data: T) -> Self {
        Self { status, headers, data }
    }

    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&String> {
        self.headers.get(&key.to_ascii_lowercase())
    }

    /// Check if the response is successful (2xx status)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Raw binary response, used for image endpoints
#[derive(Debug, Clone)]
pub struct BinaryResponse {
    /// HTTP status code
    pub status: u16,
    /// `Content-Type` header, if present
    pub content_type: Option<String>,
    /// Body bytes
    pub bytes: Vec<u8>,
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL including the API prefix (e.g. "https://example.org/api")
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Headers included in all requests
    pub default_headers: HashMap<String, String>,
    /// Retries for idempotent reads on network errors; zero sends each read once
    pub read_retries: usize,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("Conference-Companion/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
            read_retries: 0,
        }
    }
}

impl ApiClientConfig {
    /// Create a new config with a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Default::default() }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the number of retries for reads
    pub fn with_read_retries(mut self, retries: usize) -> Self {
        self.read_retries = retries;
        self
    }

    /// Full URL for an endpoint path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

// =============================================================================
// Retry Logic with Exponential Backoff
// =============================================================================

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: usize,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier (e.g., 2.0 for exponential backoff)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new(max_retries: usize) -> Self {
        Self { max_retries, ..Default::default() }
    }

    /// Set the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculate the delay for a given retry attempt
    fn calculate_delay(&self, attempt: usize) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Retry an async operation with a configurable retry policy
///
/// # Examples
/// ```
/// use conference_client::http::{retry, ApiError, RetryConfig};
///
/// async fn example() -> Result<String, ApiError> {
///     retry(
///         RetryConfig::new(3),
///         |err: &ApiError| err.is_network_error(),
///         || async { Ok("success".to_string()) },
///     )
///     .await
/// }
/// ```
pub async fn retry<F, Fut, T, E>(
    config: RetryConfig,
    should_retry: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempts += 1;

                if !should_retry(&err) || attempts > config.max_retries {
                    return Err(err);
                }

                let delay = config.calculate_delay(attempts - 1);
                tracing::debug!(attempt = attempts, ?delay, "retrying after failure");
                sleep(delay).await;
            }
        }
    }
}

/// Retry only network errors
pub async fn network_retry<F, Fut, T>(max_retries: usize, operation: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    retry(RetryConfig::new(max_retries), |err: &ApiError| err.is_network_error(), operation).await
}

// =============================================================================
// Client Implementation
// =============================================================================

/// HTTP client for the conference backend
///
/// # Examples
/// ```
/// use conference_client::http::{ApiClient, ApiClientConfig, ApiRequest};
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ApiClient::new(ApiClientConfig::new("https://example.org/api"))?;
///     let response = client.send::<serde_json::Value>(ApiRequest::get("/listworkshops")).await?;
///     println!("{} workshops", response.data.as_array().map(Vec::len).unwrap_or(0));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: ReqwestClient,
    config: ApiClientConfig,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Send a request and decode the JSON response
    ///
    /// A `204 No Content` reply decodes as `{"success": true}`.
    pub async fn send<T>(&self, request: ApiRequest) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(&request).await?;
        self.parse_response(response).await
    }

    /// Send a GET request, retrying network errors up to `read_retries` times
    pub async fn send_with_retry<T>(&self, request: ApiRequest) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        network_retry(self.config.read_retries, || self.send(request.clone())).await
    }

    /// Send a request and return the raw body bytes
    pub async fn fetch_bytes(&self, request: ApiRequest) -> Result<BinaryResponse, ApiError> {
        let response = self.execute(&request).await?;
        let status = response.status().as_u16();

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::error_from_body(status, &body));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response: {}", e)))?;

        Ok(BinaryResponse { status, content_type, bytes: bytes.to_vec() })
    }

    async fn execute(&self, request: &ApiRequest) -> Result<ReqwestResponse, ApiError> {
        let url = self.config.url_for(&request.path);

        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        if !request.params.is_empty() {
            req = req.query(&request.params);
        }

        req = req.header("Content-Type", "application/json").header("Accept", "application/json");

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        tracing::debug!(method = request.method.as_str(), path = %request.path, "sending request");

        req.send().await.map_err(|e| ApiError::network(format!("Request failed: {}", e)))
    }

    async fn parse_response<T>(&self, response: ReqwestResponse) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let status = response.status().as_u16();
        let success = response.status().is_success();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(key.as_str().to_string(), value_str.to_string());
            }
        }

        tracing::debug!(status, "received response");

        if status == 204 {
            let data = serde_json::from_value(serde_json::json!({ "success": true }))
                .map_err(|_| ApiError::invalid_response(status))?;
            return Ok(ApiResponse::new(status, headers, data));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response: {}", e)))?;

        if !success {
            return Err(Self::error_from_body(status, &body));
        }

        let data: T =
            serde_json::from_str(&body).map_err(|_| ApiError::invalid_response(status))?;

        Ok(ApiResponse::new(status, headers, data))
    }

    fn error_from_body(status: u16, body: &str) -> ApiError {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => {
                let parsed: ErrorBody = serde_json::from_value(value).unwrap_or_default();
                ApiError::new(
                    status,
                    parsed.error.unwrap_or_else(|| format!("HTTP{}", status)),
                    parsed.message.unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string()),
                )
            }
            Err(_) => ApiError::invalid_response(status),
        }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_api_error_network() {
        let error = ApiError::new(503, "ServiceUnavailable", "Service is down");
        assert_eq!(error.status(), 503);
        assert_eq!(error.error(), "ServiceUnavailable");
        assert_eq!(error.message(), "Service is down");
        assert!(error.is_network_error());
    }

    #[test]
    fn test_api_error_application() {
        let error = ApiError::new(400, "BadRequest", "Bad input");
        assert!(!error.is_network_error());
        assert!(!error.is_unauthorized());
        assert!(ApiError::new(401, "Unauthorized", "nope").is_unauthorized());
    }

    #[test]
    fn test_api_error_display() {
        let display = ApiError::new(404, "NotFound", "Workshop not found").to_string();
        assert!(display.contains("404"));
        assert!(display.contains("NotFound"));
        assert!(display.contains("Workshop not found"));
    }

    #[test]
    fn test_error_from_body_uses_message() {
        let err = ApiClient::error_from_body(422, r#"{"message":"Already enrolled"}"#);
        assert_eq!(err.status(), 422);
        assert_eq!(err.message(), "Already enrolled");
        assert_eq!(err.error(), "HTTP422");
    }

    #[test]
    fn test_error_from_body_fallback_message() {
        let err = ApiClient::error_from_body(500, r#"{"detail":"boom"}"#);
        assert_eq!(err.message(), FALLBACK_ERROR_MESSAGE);
    }

    #[test]
    fn test_error_from_non_json_body() {
        let err = ApiClient::error_from_body(502, "<html>Bad Gateway</html>");
        assert_eq!(err.status(), 502);
        assert_eq!(err.message(), INVALID_RESPONSE_MESSAGE);
    }

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::get("listworkshops").param("day", "1").bearer("abc");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "/listworkshops");
        assert_eq!(req.params, vec![("day".to_string(), "1".to_string())]);
        assert_eq!(req.headers.get("Authorization"), Some(&"Bearer abc".to_string()));

        assert_eq!(ApiRequest::delete("/x").method, HttpMethod::Delete);
        assert_eq!(ApiRequest::put("/x").method, HttpMethod::Put);
    }

    #[test]
    fn test_request_json_body() {
        #[derive(Serialize)]
        struct Credentials<'a> {
            email: &'a str,
        }

        let req = ApiRequest::post("/login").json_body(&Credentials { email: "a@b.c" }).unwrap();
        let body = String::from_utf8(req.body.unwrap()).unwrap();
        assert_eq!(body, r#"{"email":"a@b.c"}"#);
    }

    #[test]
    fn test_response_header_lookup() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let response = ApiResponse::new(200, headers, ());
        assert!(response.is_success());
        assert_eq!(response.header("Content-Type"), Some(&"application/json".to_string()));
    }

    #[test]
    fn test_config_url_for() {
        let config = ApiClientConfig::new("https://example.org/api/");
        assert_eq!(config.url_for("/profile"), "https://example.org/api/profile");
    }

    #[test]
    fn test_client_config_builder() {
        let config = ApiClientConfig::new("https://custom.server/api")
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("CustomAgent/1.0")
            .with_header("X-Custom", "value")
            .with_read_retries(3);

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "CustomAgent/1.0");
        assert_eq!(config.default_headers.get("X-Custom"), Some(&"value".to_string()));
        assert_eq!(config.read_retries, 3);
        assert_eq!(ApiClientConfig::default().read_retries, 0);
        assert!(ApiClientConfig::default().user_agent.starts_with("Conference-Companion/"));
    }

    #[test]
    fn test_retry_config_calculate_delay() {
        let config = RetryConfig::new(3)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_max_delay(Duration::from_secs(1));

        assert_eq!(config.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(config.calculate_delay(10), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_retry_success_after_retries() {
        let config = RetryConfig::new(3).with_initial_delay(Duration::from_millis(1));
        let counter = Arc::new(AtomicUsize::new(0));

        let result = retry(config, |_: &String| true, || {
            let c = counter.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("temporary".to_string())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_network_retry_skips_application_errors() {
        let counter = Arc::new(AtomicUsize::new(0));

        let result: Result<(), ApiError> = network_retry(2, || {
            let c = counter.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::new(400, "BadRequest", "Invalid input"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let config = RetryConfig::new(2).with_initial_delay(Duration::from_millis(1));
        let counter = Arc::new(AtomicUsize::new(0));

        let result: Result<(), String> = retry(config, |_: &String| true, || {
            let c = counter.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err("always".to_string())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
