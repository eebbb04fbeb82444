//! Login flow configuration.
//!
//! Configuration can be built in code or loaded with [`LoginConfig::load`],
//! which layers an optional TOML file under `AUTH0__`-prefixed environment
//! variables, e.g. `AUTH0__PROVIDER__CLIENT_ID` or `AUTH0__CALLBACK_PATH`.

use crate::error::ConfigError;
use config::{Config as ConfigBuilder, Environment, File};
use ras_identity_core::ClaimMapping;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use url::Url;

/// Identity provider endpoints and client credentials.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// API audience requested in the authorization redirect.
    #[serde(default)]
    pub audience: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_id", &self.provider_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("userinfo_endpoint", &self.userinfo_endpoint)
            .field("scopes", &self.scopes)
            .field("audience", &self.audience)
            .finish()
    }
}

impl ProviderConfig {
    /// Endpoints of an Auth0 tenant, e.g. `example.eu.auth0.com`.
    pub fn auth0(
        domain: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let domain = domain
            .trim_start_matches("https://")
            .trim_end_matches('/');

        Self {
            provider_id: default_provider_id(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorization_endpoint: format!("https://{}/authorize", domain),
            token_endpoint: format!("https://{}/oauth/token", domain),
            userinfo_endpoint: format!("https://{}/userinfo", domain),
            scopes: default_scopes(),
            audience: None,
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// Settings for one callback route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginConfig {
    pub provider: ProviderConfig,

    /// Path of the callback route, e.g. `/auth/callback`.
    #[serde(default = "default_callback_path")]
    pub callback_path: String,

    /// Absolute callback URL registered with the provider. Sent verbatim in
    /// both the authorization redirect and the code exchange.
    pub redirect_uri: String,

    /// Label state tokens are bound to.
    #[serde(default = "default_state_label")]
    pub state_label: String,

    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,

    #[serde(default)]
    pub claims: ClaimMapping,
}

fn default_provider_id() -> String {
    "auth0".to_string()
}

fn default_scopes() -> Vec<String> {
    vec![
        "openid".to_string(),
        "profile".to_string(),
        "email".to_string(),
    ]
}

fn default_callback_path() -> String {
    "/callback".to_string()
}

fn default_state_label() -> String {
    "auth0-sso".to_string()
}

fn default_state_ttl() -> u64 {
    600 // 10 minutes
}

fn default_http_timeout() -> u64 {
    30
}

impl LoginConfig {
    pub fn new(provider: ProviderConfig, redirect_uri: impl Into<String>) -> Self {
        Self {
            provider,
            callback_path: default_callback_path(),
            redirect_uri: redirect_uri.into(),
            state_label: default_state_label(),
            state_ttl_seconds: default_state_ttl(),
            http_timeout_seconds: default_http_timeout(),
            claims: ClaimMapping::default(),
        }
    }

    /// Load from an optional config file, overridden by `AUTH0__*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = path {
            debug!("Loading login configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("AUTH0")
                .separator("__")
                .try_parsing(true)
                .list_separator(" ")
                .with_list_parse_key("provider.scopes"),
        );

        let config: LoginConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("client_id must not be empty".to_string()));
        }

        if self.state_label.is_empty() {
            return Err(ConfigError::Invalid("state_label must not be empty".to_string()));
        }

        if self.state_ttl_seconds == 0 {
            return Err(ConfigError::Invalid("state_ttl_seconds must be positive".to_string()));
        }

        if !self.callback_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "callback_path must start with '/': {}",
                self.callback_path
            )));
        }

        Url::parse(&self.provider.authorization_endpoint)?;
        Url::parse(&self.provider.token_endpoint)?;
        Url::parse(&self.provider.userinfo_endpoint)?;

        let redirect_uri = Url::parse(&self.redirect_uri)?;
        if redirect_uri.path() != self.callback_path {
            return Err(ConfigError::Invalid(format!(
                "redirect_uri path {} does not match callback_path {}",
                redirect_uri.path(),
                self.callback_path
            )));
        }

        Ok(())
    }

    pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
        self.callback_path = path.into();
        self
    }

    pub fn with_state_label(mut self, label: impl Into<String>) -> Self {
        self.state_label = label.into();
        self
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_ttl_seconds = seconds;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    pub fn with_claim_mapping(mut self, claims: ClaimMapping) -> Self {
        self.claims = claims;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_config() -> LoginConfig {
        LoginConfig::new(
            ProviderConfig::auth0("example.eu.auth0.com", "client", "secret"),
            "https://app.example.com/callback",
        )
    }

    #[test]
    fn test_auth0_endpoints() {
        let provider = ProviderConfig::auth0("https://example.eu.auth0.com/", "client", "secret");
        assert_eq!(
            provider.authorization_endpoint,
            "https://example.eu.auth0.com/authorize"
        );
        assert_eq!(provider.token_endpoint, "https://example.eu.auth0.com/oauth/token");
        assert_eq!(provider.userinfo_endpoint, "https://example.eu.auth0.com/userinfo");
        assert_eq!(provider.scopes, vec!["openid", "profile", "email"]);
    }

    #[test]
    fn test_defaults() {
        let config = test_config();
        assert_eq!(config.callback_path, "/callback");
        assert_eq!(config.state_label, "auth0-sso");
        assert_eq!(config.state_ttl_seconds, 600);
        assert_eq!(config.http_timeout_seconds, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_mismatched_redirect_path() {
        let config = test_config().with_callback_path("/auth/callback");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_relative_callback_path() {
        let config = test_config().with_callback_path("callback");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut config = test_config();
        config.redirect_uri = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Url(_))));
    }

    #[test]
    fn test_validate_rejects_empty_client_id() {
        let mut config = test_config();
        config.provider.client_id = " ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_state_ttl() {
        let config = test_config().with_state_ttl(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_debug_hides_client_secret() {
        let config = LoginConfig::new(
            ProviderConfig::auth0("example.eu.auth0.com", "client", "s3cr3t-value"),
            "https://app.example.com/callback",
        );
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cr3t-value"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
callback_path = "/auth/callback"
redirect_uri = "https://app.example.com/auth/callback"
state_ttl_seconds = 120

[provider]
client_id = "file-client"
client_secret = "file-secret"
authorization_endpoint = "https://tenant.auth0.com/authorize"
token_endpoint = "https://tenant.auth0.com/oauth/token"
userinfo_endpoint = "https://tenant.auth0.com/userinfo"
audience = "https://api.example.com"

[claims]
subject_claim = "user_id"
"#
        )
        .unwrap();

        let config = LoginConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.callback_path, "/auth/callback");
        assert_eq!(config.state_ttl_seconds, 120);
        assert_eq!(config.state_label, "auth0-sso");
        assert_eq!(config.provider.provider_id, "auth0");
        assert_eq!(config.provider.client_id, "file-client");
        assert_eq!(config.provider.scopes, vec!["openid", "profile", "email"]);
        assert_eq!(config.provider.audience.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.claims.subject_claim, "user_id");
        assert_eq!(config.claims.email_claim, "email");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
callback_path = "/callback"
redirect_uri = "https://app.example.com/elsewhere"

[provider]
client_id = "client"
client_secret = "secret"
authorization_endpoint = "https://tenant.auth0.com/authorize"
token_endpoint = "https://tenant.auth0.com/oauth/token"
userinfo_endpoint = "https://tenant.auth0.com/userinfo"
"#
        )
        .unwrap();

        assert!(matches!(
            LoginConfig::load(Some(file.path())),
            Err(ConfigError::Invalid(_))
        ));
    }
}
