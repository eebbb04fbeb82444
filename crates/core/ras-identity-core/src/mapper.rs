//! Claim to identity mapping.

use crate::{RawClaims, UserIdentity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Missing subject claim `{0}`")]
    MissingSubject(String),

    #[error("Subject claim `{0}` must be a non-empty string")]
    InvalidSubject(String),
}

/// Which claims feed the canonical identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimMapping {
    pub subject_claim: String,
    /// Tried in order, the first string value wins.
    pub name_claims: Vec<String>,
    pub email_claim: String,
}

impl Default for ClaimMapping {
    fn default() -> Self {
        Self {
            subject_claim: "sub".to_string(),
            name_claims: vec!["name".to_string(), "nickname".to_string()],
            email_claim: "email".to_string(),
        }
    }
}

/// Builds a [`UserIdentity`] from provider claims without any I/O.
#[derive(Debug, Clone, Default)]
pub struct IdentityMapper {
    mapping: ClaimMapping,
}

impl IdentityMapper {
    pub fn new(mapping: ClaimMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &ClaimMapping {
        &self.mapping
    }

    pub fn map(&self, claims: &RawClaims) -> Result<UserIdentity, MappingError> {
        let subject_claim = &self.mapping.subject_claim;
        let subject_id = match claims.get(subject_claim) {
            None | Some(serde_json::Value::Null) => {
                return Err(MappingError::MissingSubject(subject_claim.clone()));
            }
            Some(serde_json::Value::String(sub)) if !sub.trim().is_empty() => sub.clone(),
            Some(_) => return Err(MappingError::InvalidSubject(subject_claim.clone())),
        };

        let display_name = self
            .mapping
            .name_claims
            .iter()
            .find_map(|claim| string_claim(claims, claim));

        let email = string_claim(claims, &self.mapping.email_claim);

        Ok(UserIdentity {
            subject_id,
            display_name,
            email,
            raw_claims: claims.clone(),
        })
    }
}

fn string_claim(claims: &RawClaims, name: &str) -> Option<String> {
    claims
        .get(name)
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .map(String::from)
}
