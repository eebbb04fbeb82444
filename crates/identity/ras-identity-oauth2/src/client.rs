//! Token exchange and user info retrieval.

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{OAuth2ErrorResponse, TokenSet};
use async_trait::async_trait;
use ras_identity_core::RawClaims;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, error};

/// Exchanges an authorization code for tokens at the provider's token endpoint.
#[async_trait]
pub trait TokenExchangeClient: Send + Sync {
    /// `redirect_uri` must be byte-for-byte the one used in the
    /// authorization redirect.
    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, ProviderError>;
}

/// Fetches profile claims for an access token.
#[async_trait]
pub trait UserInfoFetcher: Send + Sync {
    async fn fetch(&self, access_token: &str) -> Result<RawClaims, ProviderError>;
}

/// `reqwest` backed client implementing both provider calls.
#[derive(Clone)]
pub struct HttpProviderClient {
    http_client: Client,
    provider: ProviderConfig,
}

impl HttpProviderClient {
    pub fn new(provider: ProviderConfig, http_timeout_seconds: u64) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(http_timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            provider,
        })
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }
}

/// Turn a non-success response into [`ProviderError::Rejected`], reading the
/// OAuth2 error body when there is one.
async fn rejection(response: Response) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<OAuth2ErrorResponse>(&body) {
        Ok(oauth_error) => ProviderError::Rejected {
            status: status.as_u16(),
            error: oauth_error.error,
            description: oauth_error.error_description,
        },
        Err(_) => ProviderError::Rejected {
            status: status.as_u16(),
            error: status
                .canonical_reason()
                .unwrap_or("unknown_error")
                .to_string(),
            description: None,
        },
    }
}

#[async_trait]
impl TokenExchangeClient for HttpProviderClient {
    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, ProviderError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.provider.client_id.as_str()),
            ("client_secret", self.provider.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http_client
            .post(&self.provider.token_endpoint)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let rejection = rejection(response).await;
            error!(error = %rejection, "Token exchange rejected by provider");
            return Err(rejection);
        }

        let tokens: TokenSet = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("token response: {}", e)))?;

        debug!(
            provider = %self.provider.provider_id,
            token_type = %tokens.token_type,
            "Exchanged authorization code for tokens"
        );
        Ok(tokens)
    }
}

#[async_trait]
impl UserInfoFetcher for HttpProviderClient {
    async fn fetch(&self, access_token: &str) -> Result<RawClaims, ProviderError> {
        let response = self
            .http_client
            .get(&self.provider.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let rejection = rejection(response).await;
            error!(error = %rejection, "User info request rejected by provider");
            return Err(rejection);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("user info response: {}", e)))?;

        match body {
            serde_json::Value::Object(claims) => {
                debug!(claims = claims.len(), "Retrieved user info");
                Ok(claims)
            }
            _ => Err(ProviderError::InvalidResponse(
                "user info response is not a JSON object".to_string(),
            )),
        }
    }
}
