//! Target environments of the ILS gateway.
//!
//! The gateway runs three isolated environments. Each one has its own FHIR
//! base URL and OAuth2 token endpoint; the token endpoint URL doubles as the
//! assertion audience (RFC 7523).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthClientError;

/// A target environment of the ILS gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Sandbox environment with synthetic data (default).
    #[default]
    Sandbox,
    /// Integration environment for pre-production validation.
    Integration,
    /// Production environment.
    Production,
}

impl Environment {
    /// Returns the lowercase environment name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Integration => "integration",
            Self::Production => "production",
        }
    }

    /// Returns the built-in endpoint set for this environment.
    #[must_use]
    pub fn endpoints(&self) -> EnvironmentConfig {
        let (base_url, token_url) = match self {
            Self::Sandbox => (
                "https://sandbox.ilsgateway.com/fhir/R4",
                "https://sandbox.ilsgateway.com/oauth2/token",
            ),
            Self::Integration => (
                "https://integration.ilsgateway.com/fhir/R4",
                "https://integration.ilsgateway.com/oauth2/token",
            ),
            Self::Production => (
                "https://api.ilsgateway.com/fhir/R4",
                "https://api.ilsgateway.com/oauth2/token",
            ),
        };

        EnvironmentConfig {
            name: self.as_str().to_string(),
            base_url: base_url.to_string(),
            token_url: token_url.to_string(),
            // The gateway expects the token endpoint URL as the audience.
            audience_url: token_url.to_string(),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = AuthClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "integration" => Ok(Self::Integration),
            "production" => Ok(Self::Production),
            other => Err(AuthClientError::configuration(format!(
                "Unknown environment '{other}' (expected sandbox, integration, or production)"
            ))),
        }
    }
}

/// Resolved endpoint set for one gateway environment.
///
/// Normally obtained from [`Environment::endpoints`]; a custom set can be
/// injected for tests or private gateway deployments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Environment name (for diagnostics).
    pub name: String,

    /// Base URL for authenticated FHIR calls.
    pub base_url: String,

    /// OAuth2 token endpoint URL.
    pub token_url: String,

    /// Audience (`aud`) value for client assertions.
    pub audience_url: String,
}

impl EnvironmentConfig {
    /// Joins a request path onto the FHIR base URL.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environment() {
        assert_eq!("sandbox".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert_eq!(
            "Integration".parse::<Environment>().unwrap(),
            Environment::Integration
        );
        assert_eq!(
            " PRODUCTION ".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_default_is_sandbox() {
        assert_eq!(Environment::default(), Environment::Sandbox);
    }

    #[test]
    fn test_display_round_trips() {
        for env in [
            Environment::Sandbox,
            Environment::Integration,
            Environment::Production,
        ] {
            assert_eq!(env.to_string().parse::<Environment>().unwrap(), env);
        }
    }

    #[test]
    fn test_endpoints_table() {
        let sandbox = Environment::Sandbox.endpoints();
        assert_eq!(sandbox.name, "sandbox");
        assert_eq!(sandbox.base_url, "https://sandbox.ilsgateway.com/fhir/R4");
        assert_eq!(sandbox.token_url, "https://sandbox.ilsgateway.com/oauth2/token");
        assert_eq!(sandbox.audience_url, sandbox.token_url);

        let production = Environment::Production.endpoints();
        assert_eq!(production.base_url, "https://api.ilsgateway.com/fhir/R4");
    }

    #[test]
    fn test_api_url_joins_path() {
        let endpoints = Environment::Sandbox.endpoints();
        assert_eq!(
            endpoints.api_url("Patient/123"),
            "https://sandbox.ilsgateway.com/fhir/R4/Patient/123"
        );
        assert_eq!(
            endpoints.api_url("/Patient/123"),
            "https://sandbox.ilsgateway.com/fhir/R4/Patient/123"
        );
    }

    #[test]
    fn test_serde_lowercase() {
        let env: Environment = serde_json::from_str("\"production\"").unwrap();
        assert_eq!(env, Environment::Production);
        assert_eq!(serde_json::to_string(&env).unwrap(), "\"production\"");
    }
}
