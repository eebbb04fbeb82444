//! Success and failure dispatch.

use crate::error::LoginError;
use async_trait::async_trait;
use axum::response::{IntoResponse, Redirect, Response};
use ras_identity_core::AuthenticatedPrincipal;
use tracing::info;

/// Turns an authenticated principal into a response, typically by starting
/// a session.
#[async_trait]
pub trait SuccessHandler: Send + Sync {
    async fn on_success(&self, principal: AuthenticatedPrincipal) -> Response;
}

/// Turns a failed login into a response for the client.
#[async_trait]
pub trait FailureHandler: Send + Sync {
    async fn on_failure(&self, error: LoginError) -> Response;
}

/// Redirects to a fixed location after login.
#[derive(Debug, Clone)]
pub struct RedirectSuccessHandler {
    target: String,
}

impl RedirectSuccessHandler {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[async_trait]
impl SuccessHandler for RedirectSuccessHandler {
    async fn on_success(&self, principal: AuthenticatedPrincipal) -> Response {
        info!(user_id = %principal.user_id(), "Redirecting after login");
        Redirect::to(&self.target).into_response()
    }
}

/// Redirects to a fixed location with `error=<kind>` appended.
#[derive(Debug, Clone)]
pub struct RedirectFailureHandler {
    target: String,
}

impl RedirectFailureHandler {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    fn location(&self, error: &LoginError) -> String {
        let separator = if self.target.contains('?') { '&' } else { '?' };
        format!("{}{}error={}", self.target, separator, error.kind())
    }
}

#[async_trait]
impl FailureHandler for RedirectFailureHandler {
    async fn on_failure(&self, error: LoginError) -> Response {
        Redirect::to(&self.location(&error)).into_response()
    }
}
