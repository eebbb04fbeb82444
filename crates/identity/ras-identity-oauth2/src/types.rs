//! OAuth2 protocol types.

use axum::http::Uri;
use serde::Deserialize;
use std::collections::HashMap;

/// The parts of an inbound callback request the login flow looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackRequest {
    pub path: String,
    pub query: HashMap<String, String>,
}

impl CallbackRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Build from a request URI. Repeated query keys keep the last value.
    pub fn from_uri(uri: &Uri) -> Self {
        let query = uri
            .query()
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path: uri.path().to_string(),
            query,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.query.contains_key(name)
    }
}

/// A single callback being processed. Never persisted.
#[derive(Clone)]
pub struct LoginAttempt {
    pub authorization_code: String,
    pub state_token: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for LoginAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginAttempt")
            .field("authorization_code", &"[redacted]")
            .field("state_token", &"[redacted]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Tokens returned by the token endpoint.
///
/// Deliberately not `Serialize`, and `Debug` hides every credential.
#[derive(Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenSet {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_in: None,
            id_token: None,
            refresh_token: None,
            scope: None,
        }
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("id_token", &self.id_token.as_ref().map(|_| "[redacted]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("scope", &self.scope)
            .finish()
    }
}

/// OAuth2 error body (RFC 6749 section 5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2ErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

/// Where to send the user to start a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRedirect {
    pub url: String,
    pub state: String,
}
