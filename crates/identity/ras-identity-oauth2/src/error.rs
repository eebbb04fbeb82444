//! OAuth2 login error types.

use ras_identity_core::{MappingError, ResolveError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type LoginResult<T> = Result<T, LoginError>;

/// Failure reported by the identity provider or the HTTP transport.
///
/// Messages carry status codes and OAuth2 error codes only, never the
/// authorization code or any token.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider rejected the request ({status}): {error}")]
    Rejected {
        status: u16,
        error: String,
        description: Option<String>,
    },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Terminal failure of a login attempt. The variant names the failed step.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Missing `{0}` parameter in callback request")]
    MissingParameter(&'static str),

    #[error("Invalid, expired or already used state parameter")]
    InvalidState,

    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(#[source] ProviderError),

    #[error("User info request failed: {0}")]
    ProfileFetchFailed(#[source] ProviderError),

    #[error("Invalid user profile: {0}")]
    InvalidProfile(#[from] MappingError),

    #[error("Local user resolution failed: {0}")]
    ResolutionFailed(#[source] ResolveError),
}

impl LoginError {
    pub fn kind(&self) -> LoginErrorKind {
        match self {
            LoginError::MissingParameter(_) => LoginErrorKind::MissingParameter,
            LoginError::InvalidState => LoginErrorKind::InvalidState,
            LoginError::ExchangeFailed(_) => LoginErrorKind::ExchangeFailed,
            LoginError::ProfileFetchFailed(_) => LoginErrorKind::ProfileFetchFailed,
            LoginError::InvalidProfile(_) => LoginErrorKind::InvalidProfile,
            LoginError::ResolutionFailed(_) => LoginErrorKind::ResolutionFailed,
        }
    }

    /// The callback step that failed.
    pub fn step(&self) -> LoginStep {
        match self {
            LoginError::MissingParameter(_) => LoginStep::ParameterCheck,
            LoginError::InvalidState => LoginStep::StateValidation,
            LoginError::ExchangeFailed(_) => LoginStep::CodeExchange,
            LoginError::ProfileFetchFailed(_) => LoginStep::UserInfoFetch,
            LoginError::InvalidProfile(_) => LoginStep::IdentityMapping,
            LoginError::ResolutionFailed(_) => LoginStep::LocalResolution,
        }
    }
}

/// Steps of the callback flow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoginStep {
    ParameterCheck,
    StateValidation,
    CodeExchange,
    UserInfoFetch,
    IdentityMapping,
    LocalResolution,
}

impl LoginStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStep::ParameterCheck => "parameter_check",
            LoginStep::StateValidation => "state_validation",
            LoginStep::CodeExchange => "code_exchange",
            LoginStep::UserInfoFetch => "user_info_fetch",
            LoginStep::IdentityMapping => "identity_mapping",
            LoginStep::LocalResolution => "local_resolution",
        }
    }
}

impl std::fmt::Display for LoginStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data-free discriminant of [`LoginError`], safe to expose to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginErrorKind {
    MissingParameter,
    InvalidState,
    ExchangeFailed,
    ProfileFetchFailed,
    InvalidProfile,
    ResolutionFailed,
}

impl LoginErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginErrorKind::MissingParameter => "missing_parameter",
            LoginErrorKind::InvalidState => "invalid_state",
            LoginErrorKind::ExchangeFailed => "exchange_failed",
            LoginErrorKind::ProfileFetchFailed => "profile_fetch_failed",
            LoginErrorKind::InvalidProfile => "invalid_profile",
            LoginErrorKind::ResolutionFailed => "resolution_failed",
        }
    }
}

impl std::fmt::Display for LoginErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("State store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] ProviderError),
}
