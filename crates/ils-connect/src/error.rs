//! Error types for the gateway auth client.
//!
//! This module defines all error types that can occur while acquiring tokens
//! from the ILS gateway and issuing authenticated requests against it.

use std::time::Duration;

/// Errors that can occur during token acquisition and authenticated requests.
#[derive(Debug, thiserror::Error)]
pub enum AuthClientError {
    /// Credentials are missing, incomplete, or the private key is unusable.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// Building or signing the client assertion failed.
    ///
    /// Signing failures indicate bad key material and are treated exactly
    /// like configuration errors: fatal, never retried.
    #[error("Assertion signing failed: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },

    /// The token endpoint returned a non-2xx status.
    #[error("Token exchange failed (HTTP {status}): {body}")]
    TokenExchange {
        /// HTTP status code returned by the token endpoint.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A transport-level failure (connection refused, DNS, TLS, ...).
    #[error("Network error: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },

    /// A network call exceeded the configured request timeout.
    #[error("Request timed out after {timeout:?}")]
    Timeout {
        /// The configured timeout that was exceeded.
        timeout: Duration,
    },

    /// The gateway rejected the bearer token even after a forced refresh.
    #[error("Authentication failed (HTTP {status}): {body}")]
    Authentication {
        /// HTTP status code (401).
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// An authenticated gateway request returned a non-2xx, non-401 status.
    #[error("Gateway request failed (HTTP {status}): {body}")]
    Request {
        /// HTTP status code returned by the gateway.
        status: u16,
        /// Raw response body (with OperationOutcome diagnostics folded in
        /// where present).
        body: String,
    },

    /// A response could not be parsed (missing fields, invalid JSON).
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of what was wrong with the response.
        message: String,
    },
}

impl AuthClientError {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `Network` error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Returns `true` if the failure is transient and eligible for the
    /// capped exponential-backoff retry on token exchange.
    ///
    /// Transient: token endpoint 5xx, transport failures, timeouts.
    /// Everything else (4xx rejections, bad key material, parse failures)
    /// is fatal for the attempt and must not be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TokenExchange { status, .. } => *status >= 500,
            Self::Network { .. } | Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a configuration-class error (bad or missing
    /// credentials, unusable key material).
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Signing { .. })
    }

    /// Returns `true` if the token endpoint rejected the client or assertion
    /// (4xx), indicating a credential/key mismatch rather than an outage.
    #[must_use]
    pub fn is_client_rejection(&self) -> bool {
        matches!(self, Self::TokenExchange { status, .. } if (400..500).contains(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthClientError::configuration("client_id is empty");
        assert_eq!(err.to_string(), "Configuration error: client_id is empty");

        let err = AuthClientError::TokenExchange {
            status: 400,
            body: "invalid_client".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Token exchange failed (HTTP 400): invalid_client"
        );

        let err = AuthClientError::Timeout {
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "Request timed out after 30s");
    }

    #[test]
    fn test_transient_classification() {
        let err = AuthClientError::TokenExchange {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_transient());

        let err = AuthClientError::TokenExchange {
            status: 400,
            body: String::new(),
        };
        assert!(!err.is_transient());
        assert!(err.is_client_rejection());

        assert!(AuthClientError::network("connection refused").is_transient());
        assert!(
            AuthClientError::Timeout {
                timeout: Duration::from_secs(10)
            }
            .is_transient()
        );

        assert!(!AuthClientError::configuration("no key").is_transient());
        assert!(!AuthClientError::signing("bad pem").is_transient());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(AuthClientError::configuration("x").is_configuration_error());
        assert!(AuthClientError::signing("x").is_configuration_error());
        assert!(
            !AuthClientError::TokenExchange {
                status: 500,
                body: String::new()
            }
            .is_configuration_error()
        );
    }
}
