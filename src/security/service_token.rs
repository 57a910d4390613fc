//! Short-lived service-to-service tokens for catalog calls
//!
//! Every catalog request carries a freshly signed HS256 claim embedding an
//! organization-scope role and a collection-scope role. The signing secret is
//! held in a [`SecretString`] and tokens are only ever logged masked.

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::error::CatalogError;

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

/// Claims carried by a service token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClaims {
    pub iss: String,
    pub sub: String,
    /// Organization-scope role
    pub org_role: String,
    /// Collection-scope role
    pub dataset_role: String,
    /// Collection the token is scoped to, absent for catalog-wide lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    pub iat: u64,
    pub exp: u64,
}

/// Signs service tokens for the catalog client
pub struct ServiceTokenIssuer {
    secret: SecretString,
    issuer: String,
    organization_role: String,
    dataset_role: String,
    ttl: Duration,
}

impl ServiceTokenIssuer {
    pub fn new(
        secret: SecretString,
        issuer: impl Into<String>,
        organization_role: impl Into<String>,
        dataset_role: impl Into<String>,
    ) -> Self {
        Self {
            secret,
            issuer: issuer.into(),
            organization_role: organization_role.into(),
            dataset_role: dataset_role.into(),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Build the claims for a call, scoped to `dataset` when given
    pub fn claims(&self, dataset: Option<&str>) -> ServiceClaims {
        let now = Utc::now().timestamp().max(0) as u64;

        ServiceClaims {
            iss: self.issuer.clone(),
            sub: self.issuer.clone(),
            org_role: self.organization_role.clone(),
            dataset_role: self.dataset_role.clone(),
            dataset: dataset.map(str::to_string),
            iat: now,
            exp: now + self.ttl.as_secs(),
        }
    }

    /// Sign a fresh token
    pub fn issue(&self, dataset: Option<&str>) -> Result<SecretString, CatalogError> {
        let token = encode(
            &Header::default(),
            &self.claims(dataset),
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )?;

        Ok(SecretString::new(token.into()))
    }
}

/// Masks a token for safe logging
///
/// Shows only the first 3 and last 3 characters. Tokens shorter than 10
/// characters are fully masked as "****".
///
/// # Examples
///
/// ```
/// use collection_publisher::security::mask_token;
///
/// assert_eq!(mask_token("abcdef123456"), "abc...456");
/// assert_eq!(mask_token("short"), "****");
/// ```
pub fn mask_token(token: &str) -> String {
    if token.len() < 10 || !token.is_ascii() {
        return "****".to_string();
    }

    format!("{}...{}", &token[..3], &token[token.len() - 3..])
}
