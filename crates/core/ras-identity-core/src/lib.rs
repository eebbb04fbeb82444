//! Core identity types for OAuth2/OIDC logins.
//!
//! A login flow turns the raw claims returned by an identity provider into a
//! [`UserIdentity`] using an [`IdentityMapper`], optionally resolves it against
//! a local user store through a [`UserResolver`], and hands the resulting
//! [`AuthenticatedPrincipal`] to the session layer.

mod mapper;

pub use mapper::{ClaimMapping, IdentityMapper, MappingError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Profile claims as returned by a provider's user info endpoint.
pub type RawClaims = serde_json::Map<String, serde_json::Value>;

/// Canonical projection of the claims describing an authenticated subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable identifier of the account at the provider, never empty.
    pub subject_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// Every claim the provider returned, untouched.
    pub raw_claims: RawClaims,
}

impl UserIdentity {
    /// Look up an arbitrary claim by name.
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.raw_claims.get(name)
    }
}

/// A user record owned by the application, resolved from a [`UserIdentity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: String,
    pub attributes: Option<serde_json::Value>,
}

impl LocalUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: None,
        }
    }

    pub fn with_attributes(mut self, attributes: serde_json::Value) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

/// Outcome of a successful login, handed to the session layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedPrincipal {
    pub provider_id: String,
    pub identity: UserIdentity,
    pub local_user: Option<LocalUser>,
}

impl AuthenticatedPrincipal {
    pub fn new(
        provider_id: impl Into<String>,
        identity: UserIdentity,
        local_user: Option<LocalUser>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            identity,
            local_user,
        }
    }

    /// The local user id when one was resolved, otherwise the provider subject.
    pub fn user_id(&self) -> &str {
        self.local_user
            .as_ref()
            .map(|user| user.id.as_str())
            .unwrap_or(&self.identity.subject_id)
    }

    pub fn subject_id(&self) -> &str {
        &self.identity.subject_id
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("User rejected: {0}")]
    Rejected(String),

    #[error("User store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Loads or creates the local user matching a provider identity.
#[async_trait]
pub trait UserResolver: Send + Sync {
    async fn resolve(&self, identity: &UserIdentity) -> Result<LocalUser, ResolveError>;
}
