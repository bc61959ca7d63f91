//! OAuth2 token exchange against the gateway token endpoint.
//!
//! Performs the client-credentials POST with a JWT-bearer client assertion
//! and parses the token response. This layer does no retries; the retry
//! policy for transient failures lives above it.

use std::time::Duration;

use serde::Deserialize;

use crate::error::AuthClientError;

/// Client assertion type URN for the JWT-bearer profile (RFC 7523).
pub const CLIENT_ASSERTION_TYPE: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Successful token endpoint response.
///
/// The gateway is inconsistent about `expires_in`: some environments return
/// a JSON number, others a numeric string. Both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The bearer access token.
    pub access_token: String,

    /// Token type (the gateway omits it occasionally; defaults to "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Token lifetime in seconds, as number or numeric string.
    pub expires_in: ExpiresIn,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// `expires_in` value as a JSON number or numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExpiresIn {
    /// Plain number of seconds.
    Seconds(i64),
    /// Number of seconds encoded as a string.
    Text(String),
}

impl ExpiresIn {
    /// Returns the lifetime in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthClientError::InvalidResponse`] if the string form is
    /// not a valid integer.
    pub fn as_seconds(&self) -> Result<i64, AuthClientError> {
        match self {
            Self::Seconds(s) => Ok(*s),
            Self::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                AuthClientError::invalid_response(format!(
                    "expires_in is not numeric: {s:?}"
                ))
            }),
        }
    }
}

/// HTTP client for the gateway token endpoint.
pub struct TokenExchangeClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl TokenExchangeClient {
    /// Creates a new exchange client with the given request timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { http, timeout }
    }

    /// Exchanges a signed client assertion for an access token.
    ///
    /// # Errors
    ///
    /// - [`AuthClientError::TokenExchange`] for any non-2xx status, carrying
    ///   the status code and raw body. The caller classifies by status class;
    ///   no retries happen here.
    /// - [`AuthClientError::Timeout`] / [`AuthClientError::Network`] for
    ///   transport failures.
    /// - [`AuthClientError::InvalidResponse`] if the success body cannot be
    ///   parsed or carries an empty token.
    pub async fn exchange(
        &self,
        assertion: &str,
        token_url: &str,
    ) -> Result<TokenResponse, AuthClientError> {
        tracing::debug!(token_url, "Exchanging client assertion for access token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion),
        ];

        let response = self
            .http
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Token exchange rejected");
            return Err(AuthClientError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthClientError::invalid_response(e.to_string()))?;

        if token.access_token.trim().is_empty() {
            return Err(AuthClientError::invalid_response(
                "token response did not include access_token",
            ));
        }

        Ok(token)
    }

    fn classify_transport_error(&self, error: &reqwest::Error) -> AuthClientError {
        if error.is_timeout() {
            AuthClientError::Timeout {
                timeout: self.timeout,
            }
        } else {
            AuthClientError::network(error.to_string())
        }
    }
}
