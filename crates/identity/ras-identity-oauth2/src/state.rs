//! Anti-forgery state tokens for the authorization code flow.

use crate::error::StateStoreError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A state token issued for one login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedState {
    pub token: String,
    /// Binding label; a token only validates under the label it was issued for.
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedState {
    /// A TTL too large to represent saturates to the latest instant.
    pub fn new(label: impl Into<String>, ttl_seconds: u64) -> Self {
        let created_at = Utc::now();
        let expires_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            token: Uuid::new_v4().to_string(),
            label: label.into(),
            created_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Storage for state tokens.
///
/// `validate` must be single use: a token that validated once never
/// validates again. Implementations must be safe under concurrent access.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Issue a fresh token bound to `label`, live for `ttl_seconds`.
    async fn issue(&self, label: &str, ttl_seconds: u64) -> Result<String, StateStoreError>;

    /// Consume `token` and report whether it was issued under `label` and
    /// is still live.
    async fn validate(&self, label: &str, token: &str) -> bool;
}

/// Process-local [`StateStore`].
pub struct InMemoryStateStore {
    states: Arc<RwLock<HashMap<String, IssuedState>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert an already built state.
    pub async fn store(&self, state: IssuedState) {
        let mut states = self.states.write().await;
        states.insert(state.token.clone(), state);
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }

    /// Drop expired states, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut states = self.states.write().await;
        let now = Utc::now();
        let before = states.len();
        states.retain(|_, state| now <= state.expires_at);
        before - states.len()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn issue(&self, label: &str, ttl_seconds: u64) -> Result<String, StateStoreError> {
        let state = IssuedState::new(label, ttl_seconds);
        let token = state.token.clone();
        self.store(state).await;
        Ok(token)
    }

    async fn validate(&self, label: &str, token: &str) -> bool {
        // Removed before any check so a token can never be tried twice.
        let removed = self.states.write().await.remove(token);

        match removed {
            Some(state) => state.label == label && !state.is_expired(),
            None => false,
        }
    }
}
