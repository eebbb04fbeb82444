//! OAuth2/OIDC authorization code login flow.
//!
//! This crate handles the callback leg of an authorization code login against
//! an identity provider such as Auth0: it validates the anti-forgery state,
//! exchanges the authorization code for tokens, fetches the user's profile,
//! maps it into a [`UserIdentity`] and dispatches the outcome to pluggable
//! success and failure handlers. It also builds the authorization redirect
//! that starts a login.

mod client;
mod config;
mod error;
mod flow;
mod handler;
mod state;
mod types;


pub use client::{HttpProviderClient, TokenExchangeClient, UserInfoFetcher};
pub use config::{LoginConfig, ProviderConfig};
pub use error::{
    ConfigError, LoginError, LoginErrorKind, LoginResult, LoginStep, ProviderError, StateStoreError,
};
pub use flow::{LoginFlowBuilder, LoginFlowController, login_callback};
pub use handler::{FailureHandler, RedirectFailureHandler, RedirectSuccessHandler, SuccessHandler};
pub use state::{InMemoryStateStore, IssuedState, StateStore};
pub use types::{AuthorizationRedirect, CallbackRequest, LoginAttempt, TokenSet};

// Re-export common types for convenience
pub use ras_identity_core::{
    AuthenticatedPrincipal, ClaimMapping, IdentityMapper, LocalUser, RawClaims, ResolveError,
    UserIdentity, UserResolver,
};
