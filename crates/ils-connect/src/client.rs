//! Gateway client facade.
//!
//! [`GatewayClient`] is the single entry point the rest of the system uses:
//! it owns the credential store, the token cache, and the HTTP plumbing, and
//! exposes token acquisition, authenticated request execution, the health
//! probe, and credential rotation. No other component may build assertions
//! or call the token endpoint directly.
//!
//! Clients are constructed explicitly and injected; there is no process-wide
//! singleton. Independently configured credential sets (one per tenant, say)
//! can coexist either as separate instances or in one instance, since the
//! token cache is keyed by `(client_id, environment)`.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::assertion::generate_assertion;
use crate::cache::{CacheKey, CachedToken, EXPIRY_BUFFER, TokenCache};
use crate::credentials::Credentials;
use crate::environment::{Environment, EnvironmentConfig};
use crate::error::AuthClientError;
use crate::exchange::{TokenExchangeClient, TokenResponse};
use crate::retry::RetryPolicy;

/// Default timeout for every network call, including the forced-refresh path.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`GatewayClient`].
#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    /// Timeout applied to every network call (default: 30 s).
    pub request_timeout: Duration,

    /// Safety margin before token expiry (default: 60 s).
    pub expiry_buffer: Duration,

    /// Backoff policy for transient token exchange failures.
    pub retry: RetryPolicy,

    /// Endpoint override. When unset, endpoints come from the credential's
    /// environment via the built-in table.
    pub endpoints: Option<EnvironmentConfig>,
}

impl Default for GatewayClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            expiry_buffer: EXPIRY_BUFFER,
            retry: RetryPolicy::default(),
            endpoints: None,
        }
    }
}

impl GatewayClientConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the network timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the token expiry buffer.
    #[must_use]
    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    /// Sets the transient-failure retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the endpoint set (tests, private deployments).
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: EnvironmentConfig) -> Self {
        self.endpoints = Some(endpoints);
        self
    }
}

/// Options for an authenticated gateway request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method (default: GET).
    pub method: reqwest::Method,

    /// Optional JSON body.
    pub body: Option<Value>,

    /// Query parameters.
    pub query: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: reqwest::Method::GET,
            body: None,
            query: Vec::new(),
        }
    }
}

impl RequestOptions {
    /// A plain GET request.
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    /// A POST request with a JSON body.
    #[must_use]
    pub fn post(body: Value) -> Self {
        Self {
            method: reqwest::Method::POST,
            body: Some(body),
            query: Vec::new(),
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: reqwest::Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Health probe result. Never an error: failures are folded into
/// `success: false` with a diagnostic message.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    /// Whether a fresh token was acquired.
    pub success: bool,

    /// The environment that was probed.
    pub environment: Environment,

    /// Human-readable outcome.
    pub message: String,

    /// When the probe ran.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Signed-assertion OAuth2 client for the ILS gateway.
pub struct GatewayClient {
    /// Current credentials; swapped wholesale on rotation.
    credentials: ArcSwapOption<Credentials>,
    /// Endpoint override, if configured.
    endpoints_override: Option<EnvironmentConfig>,
    /// Token endpoint client.
    exchange: TokenExchangeClient,
    /// HTTP client for authenticated gateway calls.
    http: reqwest::Client,
    /// Access token cache.
    cache: TokenCache,
    expiry_buffer: Duration,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl GatewayClient {
    /// Creates an unconfigured client. Credentials must be installed with
    /// [`set_credentials`](Self::set_credentials) before any token can be
    /// acquired.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(config: GatewayClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            credentials: ArcSwapOption::empty(),
            endpoints_override: config.endpoints,
            exchange: TokenExchangeClient::new(config.request_timeout),
            http,
            cache: TokenCache::new(),
            expiry_buffer: config.expiry_buffer,
            retry: config.retry,
            request_timeout: config.request_timeout,
        }
    }

    /// Creates a client with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(GatewayClientConfig::default())
    }

    /// Creates a client and installs credentials in one step.
    #[must_use]
    pub fn configured(config: GatewayClientConfig, credentials: Credentials) -> Self {
        let client = Self::new(config);
        client.credentials.store(Some(Arc::new(credentials)));
        client
    }

    /// Installs a new credential set and invalidates all cached tokens.
    ///
    /// Swap-then-invalidate: the new credentials are visible before the
    /// cache is cleared, so no token signed under a superseded key identity
    /// survives the rotation.
    pub async fn set_credentials(&self, credentials: Credentials) {
        tracing::info!(
            client_id = %credentials.client_id,
            key_id = %credentials.key_id,
            environment = %credentials.environment,
            "Installing gateway credentials"
        );
        self.credentials.store(Some(Arc::new(credentials)));
        self.cache.clear().await;
    }

    /// Returns `true` if credentials are installed.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.credentials.load().is_some()
    }

    /// Returns the environment of the installed credentials, if any.
    #[must_use]
    pub fn current_environment(&self) -> Option<Environment> {
        self.credentials.load_full().map(|c| c.environment)
    }

    /// Drops all cached tokens. The next token request performs a fresh
    /// exchange.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Returns a valid access token, reusing the cached one while it is
    /// outside the expiry buffer.
    ///
    /// With `force_refresh`, the cache is bypassed and a new exchange always
    /// happens; the full new entry replaces whatever was cached.
    ///
    /// # Errors
    ///
    /// Configuration errors if no credentials are installed or the key is
    /// unusable; token exchange errors per the retry policy (transient
    /// failures retried with capped backoff, 4xx rejections surfaced
    /// immediately).
    pub async fn get_access_token(&self, force_refresh: bool) -> Result<String, AuthClientError> {
        let credentials = self.current_credentials()?;
        let key = CacheKey {
            client_id: credentials.client_id.clone(),
            environment: credentials.environment,
        };

        if !force_refresh
            && let Some(hit) = self
                .cache
                .get_fresh(&key, OffsetDateTime::now_utc(), self.expiry_buffer)
                .await
        {
            tracing::trace!(client_id = %key.client_id, "Token cache hit");
            return Ok(hit.access_token);
        }

        let endpoints = self.endpoints_for(&credentials);
        let token = self.exchange_with_retry(&credentials, &endpoints).await?;
        let expires_in = token.expires_in.as_seconds()?;

        let entry = CachedToken {
            access_token: token.access_token.clone(),
            token_type: token.token_type,
            expires_at: OffsetDateTime::now_utc() + time::Duration::seconds(expires_in),
        };
        tracing::debug!(
            client_id = %key.client_id,
            environment = %key.environment,
            expires_in,
            "Cached fresh access token"
        );
        self.cache.insert(key, entry).await;

        Ok(token.access_token)
    }

    /// Issues an authenticated request against the gateway API.
    ///
    /// Attaches `Authorization: Bearer`, `Accept: application/fhir+json`,
    /// and a fresh `X-Request-ID` per attempt. A single 401 triggers exactly
    /// one forced token refresh and one resend; a second 401 surfaces as an
    /// authentication failure. No other status is retried at this layer.
    ///
    /// # Errors
    ///
    /// See [`AuthClientError`]; non-2xx statuses carry the status code and
    /// response body (`OperationOutcome` diagnostics extracted when present).
    pub async fn make_authenticated_request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, AuthClientError> {
        let credentials = self.current_credentials()?;
        let endpoints = self.endpoints_for(&credentials);
        let url = endpoints.api_url(path);

        // Bounded retry loop: the 401 contract is one forced refresh, one
        // resend, then give up.
        let mut attempt: u32 = 0;
        loop {
            let token = self.get_access_token(attempt > 0).await?;
            let request_id = uuid::Uuid::new_v4().to_string();

            let mut request = self
                .http
                .request(options.method.clone(), &url)
                .bearer_auth(&token)
                .header("Accept", "application/fhir+json")
                .header("X-Request-ID", &request_id);
            if !options.query.is_empty() {
                request = request.query(&options.query);
            }
            if let Some(body) = &options.body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| self.classify_transport_error(&e))?;
            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED {
                let body = response.text().await.unwrap_or_default();
                if attempt == 0 {
                    tracing::debug!(
                        %request_id,
                        "Gateway returned 401; forcing token refresh and retrying once"
                    );
                    attempt += 1;
                    continue;
                }
                tracing::warn!(%request_id, "Gateway rejected refreshed token");
                return Err(AuthClientError::Authentication {
                    status: status.as_u16(),
                    body,
                });
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let body = outcome_diagnostics(&body).unwrap_or(body);
                return Err(AuthClientError::Request {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response
                .text()
                .await
                .map_err(|e| AuthClientError::invalid_response(e.to_string()))?;
            if body.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body)
                .map_err(|e| AuthClientError::invalid_response(e.to_string()));
        }
    }

    /// Probes the whole auth chain by forcing a fresh token acquisition.
    ///
    /// Never returns an error; any failure is reported as
    /// `success: false` with the error message. Diagnostic use only.
    pub async fn test_connection(&self) -> ConnectionStatus {
        let environment = self.current_environment().unwrap_or_default();

        let (success, message) = match self.get_access_token(true).await {
            Ok(_) => (true, "Access token acquired".to_string()),
            Err(e) => (false, e.to_string()),
        };

        ConnectionStatus {
            success,
            environment,
            message,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    fn current_credentials(&self) -> Result<Arc<Credentials>, AuthClientError> {
        self.credentials.load_full().ok_or_else(|| {
            AuthClientError::configuration("Gateway credentials are not configured")
        })
    }

    fn endpoints_for(&self, credentials: &Credentials) -> EnvironmentConfig {
        self.endpoints_override
            .clone()
            .unwrap_or_else(|| credentials.environment.endpoints())
    }

    /// Performs the token exchange, regenerating the assertion for every
    /// attempt and backing off on transient failures.
    async fn exchange_with_retry(
        &self,
        credentials: &Credentials,
        endpoints: &EnvironmentConfig,
    ) -> Result<TokenResponse, AuthClientError> {
        let mut attempt: u32 = 0;
        loop {
            // Assertions are single-use: one per exchange attempt.
            let assertion = generate_assertion(credentials, endpoints)?;

            match self.exchange.exchange(&assertion, &endpoints.token_url).await {
                Ok(token) => return Ok(token),
                Err(e) if e.is_transient() && attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient token exchange failure; backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn classify_transport_error(&self, error: &reqwest::Error) -> AuthClientError {
        if error.is_timeout() {
            AuthClientError::Timeout {
                timeout: self.request_timeout,
            }
        } else {
            AuthClientError::network(error.to_string())
        }
    }
}

/// Extracts `OperationOutcome` diagnostics from an error body, if present.
fn outcome_diagnostics(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    if json.get("resourceType").and_then(|v| v.as_str()) != Some("OperationOutcome") {
        return None;
    }
    let messages: Vec<&str> = json
        .get("issue")?
        .as_array()?
        .iter()
        .filter_map(|issue| issue.get("diagnostics").and_then(|d| d.as_str()))
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}
