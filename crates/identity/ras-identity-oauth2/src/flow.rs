//! The authorization code callback flow.

use crate::client::{HttpProviderClient, TokenExchangeClient, UserInfoFetcher};
use crate::config::LoginConfig;
use crate::error::{ConfigError, LoginError, LoginResult, StateStoreError};
use crate::handler::{FailureHandler, SuccessHandler};
use crate::state::StateStore;
use crate::types::{AuthorizationRedirect, CallbackRequest, LoginAttempt};
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bon::Builder;
use ras_identity_core::{AuthenticatedPrincipal, IdentityMapper, UserResolver};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Collaborators and settings for a [`LoginFlowController`].
///
/// When either provider client is omitted, an [`HttpProviderClient`] built
/// from the provider configuration fills the gap.
#[derive(Builder)]
pub struct LoginFlowBuilder {
    config: LoginConfig,
    state_store: Arc<dyn StateStore>,
    token_client: Option<Arc<dyn TokenExchangeClient>>,
    userinfo_fetcher: Option<Arc<dyn UserInfoFetcher>>,
    /// Local user lookup. Without one the provider identity is the principal.
    user_resolver: Option<Arc<dyn UserResolver>>,
    success_handler: Arc<dyn SuccessHandler>,
    failure_handler: Arc<dyn FailureHandler>,
}

impl LoginFlowBuilder {
    pub fn build(self) -> Result<LoginFlowController, ConfigError> {
        self.config.validate()?;
        let authorize_url = Url::parse(&self.config.provider.authorization_endpoint)?;

        let (token_client, userinfo_fetcher) = match (self.token_client, self.userinfo_fetcher) {
            (Some(token_client), Some(userinfo_fetcher)) => (token_client, userinfo_fetcher),
            (token_client, userinfo_fetcher) => {
                let http = Arc::new(HttpProviderClient::new(
                    self.config.provider.clone(),
                    self.config.http_timeout_seconds,
                )?);
                let token_client: Arc<dyn TokenExchangeClient> = match token_client {
                    Some(client) => client,
                    None => http.clone(),
                };
                let userinfo_fetcher: Arc<dyn UserInfoFetcher> = match userinfo_fetcher {
                    Some(fetcher) => fetcher,
                    None => http,
                };
                (token_client, userinfo_fetcher)
            }
        };

        Ok(LoginFlowController {
            mapper: IdentityMapper::new(self.config.claims.clone()),
            config: self.config,
            authorize_url,
            state_store: self.state_store,
            token_client,
            userinfo_fetcher,
            user_resolver: self.user_resolver,
            success_handler: self.success_handler,
            failure_handler: self.failure_handler,
        })
    }
}

/// Handles the provider callback of an OAuth2 authorization code login.
///
/// Each step is a hard gate: presence of `code` and `state`, single-use
/// state validation, code exchange, user info fetch, identity mapping and
/// optional local resolution. The first failure ends the attempt.
pub struct LoginFlowController {
    config: LoginConfig,
    authorize_url: Url,
    mapper: IdentityMapper,
    state_store: Arc<dyn StateStore>,
    token_client: Arc<dyn TokenExchangeClient>,
    userinfo_fetcher: Arc<dyn UserInfoFetcher>,
    user_resolver: Option<Arc<dyn UserResolver>>,
    success_handler: Arc<dyn SuccessHandler>,
    failure_handler: Arc<dyn FailureHandler>,
}

impl LoginFlowController {
    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    /// Whether this flow applies to `request`: it targets the callback path
    /// and carries both `code` and `state`.
    pub fn supports(&self, request: &CallbackRequest) -> bool {
        request.path == self.config.callback_path
            && request.has_param("code")
            && request.has_param("state")
    }

    /// Run the callback steps. Callers check [`supports`](Self::supports) first.
    pub async fn handle(&self, request: &CallbackRequest) -> LoginResult<AuthenticatedPrincipal> {
        let attempt = self.login_attempt(request)?;

        if !self
            .state_store
            .validate(&self.config.state_label, &attempt.state_token)
            .await
        {
            warn!(label = %self.config.state_label, "Rejected callback with invalid state");
            return Err(LoginError::InvalidState);
        }

        let tokens = self
            .token_client
            .exchange(&attempt.authorization_code, &attempt.redirect_uri)
            .await
            .map_err(|e| {
                error!(error = %e, "Authorization code exchange failed");
                LoginError::ExchangeFailed(e)
            })?;

        let claims = self
            .userinfo_fetcher
            .fetch(&tokens.access_token)
            .await
            .map_err(|e| {
                error!(error = %e, "User info request failed");
                LoginError::ProfileFetchFailed(e)
            })?;

        let identity = self.mapper.map(&claims).map_err(|e| {
            warn!(error = %e, "Provider returned an unusable profile");
            LoginError::from(e)
        })?;

        let local_user = match &self.user_resolver {
            Some(resolver) => Some(resolver.resolve(&identity).await.map_err(|e| {
                warn!(subject = %identity.subject_id, error = %e, "Local user resolution failed");
                LoginError::ResolutionFailed(e)
            })?),
            None => None,
        };

        info!(
            provider = %self.config.provider.provider_id,
            subject = %identity.subject_id,
            "Login succeeded"
        );

        Ok(AuthenticatedPrincipal::new(
            self.config.provider.provider_id.clone(),
            identity,
            local_user,
        ))
    }

    /// Handle `request` and hand the outcome to exactly one of the success or
    /// failure handlers. Returns `None` when the flow does not apply.
    pub async fn dispatch(&self, request: &CallbackRequest) -> Option<Response> {
        if !self.supports(request) {
            debug!(path = %request.path, "Login flow does not apply to request");
            return None;
        }

        let response = match self.handle(request).await {
            Ok(principal) => self.success_handler.on_success(principal).await,
            Err(error) => {
                debug!(kind = %error.kind(), step = %error.step(), "Dispatching login failure");
                self.failure_handler.on_failure(error).await
            }
        };

        Some(response)
    }

    /// Issue a state token and build the provider authorization URL that
    /// starts a login. `extra_params` are appended verbatim.
    pub async fn authorization_url(
        &self,
        extra_params: &[(&str, &str)],
    ) -> Result<AuthorizationRedirect, StateStoreError> {
        let state = self
            .state_store
            .issue(&self.config.state_label, self.config.state_ttl_seconds)
            .await?;
        let provider = &self.config.provider;

        let mut url = self.authorize_url.clone();
        let mut params = url.query_pairs_mut();
        params.append_pair("response_type", "code");
        params.append_pair("client_id", &provider.client_id);
        params.append_pair("redirect_uri", &self.config.redirect_uri);

        if !provider.scopes.is_empty() {
            params.append_pair("scope", &provider.scopes.join(" "));
        }

        params.append_pair("state", &state);

        if let Some(audience) = &provider.audience {
            params.append_pair("audience", audience);
        }

        for (key, value) in extra_params {
            params.append_pair(key, value);
        }

        drop(params);

        debug!(provider = %provider.provider_id, "Generated authorization URL");

        Ok(AuthorizationRedirect {
            url: url.to_string(),
            state,
        })
    }

    fn login_attempt(&self, request: &CallbackRequest) -> LoginResult<LoginAttempt> {
        let authorization_code = request
            .param("code")
            .ok_or(LoginError::MissingParameter("code"))?;
        let state_token = request
            .param("state")
            .ok_or(LoginError::MissingParameter("state"))?;

        Ok(LoginAttempt {
            authorization_code: authorization_code.to_string(),
            state_token: state_token.to_string(),
            redirect_uri: self.config.redirect_uri.clone(),
        })
    }
}

/// Axum handler for the callback route. Requests the flow does not apply to
/// get a 404.
pub async fn login_callback(
    State(flow): State<Arc<LoginFlowController>>,
    uri: Uri,
) -> Response {
    match flow.dispatch(&CallbackRequest::from_uri(&uri)).await {
        Some(response) => response,
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
