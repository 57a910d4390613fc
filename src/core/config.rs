//! Configuration structures and types for collection-publisher
//!
//! Every section has defaults so a partial YAML file is enough; secrets are
//! wrapped in [`SecretString`] as soon as they are parsed.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

use super::retry::RetryOptions;

/// Licence identifiers accepted at publish time unless configured otherwise
pub const DEFAULT_LICENSES: &[&str] = &[
    "CC0-1.0",
    "CC-BY-4.0",
    "CC-BY-SA-4.0",
    "CC-BY-NC-4.0",
    "ODC-By-1.0",
    "ODbL-1.0",
    "PDDL-1.0",
];

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(SecretString::new(value.into()))
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new().into())
}

/// Root configuration object
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite database holding collections and publish status
    pub database_path: PathBuf,

    /// Prefix of catalog-native DOIs (e.g. "10.1111")
    pub doi_prefix: String,

    /// Publisher string written into manifests
    pub publisher: String,

    pub catalog: CatalogConfig,

    pub artifacts: ArtifactConfig,

    pub saga: SagaConfig,

    pub retry: RetryConfig,

    /// Licence identifiers accepted at publish time
    pub allowed_licenses: Vec<String>,

    pub manifest: ManifestConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("collections.db"),
            doi_prefix: String::new(),
            publisher: "Collections Catalog".to_string(),
            catalog: CatalogConfig::default(),
            artifacts: ArtifactConfig::default(),
            saga: SagaConfig::default(),
            retry: RetryConfig::default(),
            allowed_licenses: DEFAULT_LICENSES.iter().map(|l| l.to_string()).collect(),
            manifest: ManifestConfig::default(),
        }
    }
}

/// Catalog service connection
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,

    /// HMAC secret shared with the catalog for service tokens
    #[serde(deserialize_with = "deserialize_secret")]
    pub signing_secret: SecretString,

    /// `iss` claim of service tokens
    pub issuer: String,

    /// Organization-scope role presented on every call
    pub organization_role: String,

    /// Dataset/collection-scope role presented on every call
    pub dataset_role: String,

    pub timeout_secs: u64,

    pub token_ttl_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            signing_secret: empty_secret(),
            issuer: "collection-publisher".to_string(),
            organization_role: "publisher".to_string(),
            dataset_role: "owner".to_string(),
            timeout_secs: 30,
            token_ttl_secs: 300,
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Versioned object store for manifests
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Empty selects the in-process store
    pub base_url: String,

    pub bucket: String,

    #[serde(deserialize_with = "deserialize_secret")]
    pub token: SecretString,

    pub timeout_secs: u64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            bucket: "collection-manifests".to_string(),
            token: empty_secret(),
            timeout_secs: 30,
        }
    }
}

impl ArtifactConfig {
    pub fn is_remote(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Deadlines applied by the publication saga
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SagaConfig {
    /// Upper bound for each forward remote call
    pub step_timeout_secs: u64,

    /// Upper bound for each compensating call
    pub compensation_timeout_secs: u64,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: 30,
            compensation_timeout_secs: 15,
        }
    }
}

/// Backoff for idempotent remote calls
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let options = RetryOptions::default();
        Self {
            max_attempts: options.max_attempts,
            initial_delay_ms: options.initial_delay.as_millis() as u64,
            max_delay_ms: options.max_delay.as_millis() as u64,
            backoff_multiplier: options.backoff_multiplier,
        }
    }
}

impl From<&RetryConfig> for RetryOptions {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
        }
    }
}

/// Fixed strings of the manifest schema
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub context: String,
    pub schema_version: String,
    pub conforms_to: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            context: "https://schema.org/".to_string(),
            schema_version: "1.0.0".to_string(),
            conforms_to: "https://w3id.org/collection-manifest/1.0".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Report every missing or unusable setting
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.doi_prefix.trim().is_empty() {
            problems.push("doi_prefix is required".to_string());
        } else if self.doi_prefix.ends_with('/') {
            problems.push("doi_prefix must not end with '/'".to_string());
        }

        if self.catalog.base_url.trim().is_empty() {
            problems.push("catalog.base_url is required".to_string());
        }

        if self.catalog.signing_secret.expose_secret().len() < 32 {
            problems.push("catalog.signing_secret must be at least 32 characters".to_string());
        }

        if self.catalog.token_ttl_secs == 0 {
            problems.push("catalog.token_ttl_secs must be positive".to_string());
        }

        if self.artifacts.is_remote() && self.artifacts.bucket.trim().is_empty() {
            problems.push("artifacts.bucket is required with artifacts.base_url".to_string());
        }

        if self.allowed_licenses.is_empty() {
            problems.push("allowed_licenses must not be empty".to_string());
        }

        if self.saga.step_timeout_secs == 0 || self.saga.compensation_timeout_secs == 0 {
            problems.push("saga timeouts must be positive".to_string());
        }

        problems
    }
}
