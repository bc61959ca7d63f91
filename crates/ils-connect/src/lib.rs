//! Signed-assertion OAuth2 client for the ILS clinical API gateway.
//!
//! The gateway authenticates integrations with the OAuth2 client-credentials
//! grant and a JWT-bearer client assertion (RFC 7523): every token request
//! carries a short-lived RS512-signed JWT instead of a shared secret. This
//! crate owns that whole chain so the rest of a system never touches key
//! material or tokens directly:
//!
//! - [`Credentials`] - validated client ID, RSA key, key ID, environment
//! - [`Environment`] - sandbox / integration / production endpoint sets
//! - [`assertion`] - RS512 client assertion construction and signing
//! - [`exchange`] - token endpoint POST and response parsing
//! - [`cache`] - per `(client_id, environment)` token cache with an expiry
//!   buffer
//! - [`GatewayClient`] - the facade: token acquisition with capped backoff,
//!   authenticated FHIR requests with a single forced-refresh retry on 401,
//!   credential rotation, health probe
//!
//! # Example
//!
//! ```no_run
//! use ils_connect::{ConnectConfig, RequestOptions};
//!
//! # async fn example() -> Result<(), ils_connect::AuthClientError> {
//! let client = ConnectConfig::from_env()?.build_client()?;
//!
//! let patient = client
//!     .make_authenticated_request("Patient/123", RequestOptions::get())
//!     .await?;
//! println!("{patient}");
//! # Ok(())
//! # }
//! ```

pub mod assertion;
pub mod cache;
pub mod client;
pub mod config;
pub mod credentials;
pub mod environment;
pub mod error;
pub mod exchange;
pub mod retry;

pub use assertion::{ASSERTION_LIFETIME, AssertionClaims, generate_assertion};
pub use cache::{CacheKey, CachedToken, EXPIRY_BUFFER, TokenCache};
pub use client::{
    ConnectionStatus, DEFAULT_REQUEST_TIMEOUT, GatewayClient, GatewayClientConfig, RequestOptions,
};
pub use config::ConnectConfig;
pub use credentials::Credentials;
pub use environment::{Environment, EnvironmentConfig};
pub use error::AuthClientError;
pub use exchange::{CLIENT_ASSERTION_TYPE, TokenExchangeClient, TokenResponse};
pub use retry::RetryPolicy;

/// Result alias for gateway auth operations.
pub type AuthResult<T> = Result<T, AuthClientError>;
