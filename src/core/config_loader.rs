//! Configuration file loader for collection-publisher
//!
//! Priority (high to low):
//! 1. Environment variables (`COLLECTIONS_*`)
//! 2. YAML config file
//! 3. Default values
//!
//! `${VAR}` references in the YAML file are expanded before parsing.

use lazy_static::lazy_static;
use regex::Regex;
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::config::ServiceConfig;
use super::error::ConfigError;

/// Default configuration file name
pub const CONFIG_FILENAME: &str = "collection-publisher.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

lazy_static! {
    static ref ENV_VAR_REGEX: Regex = Regex::new(ENV_VAR_PATTERN).expect("valid pattern");
}

/// Configuration load options
#[derive(Debug, Clone)]
pub struct ConfigLoadOptions {
    /// Config file to read; missing files fall back to defaults
    pub path: PathBuf,

    /// Environment variables
    pub env: HashMap<String, String>,
}

impl ConfigLoadOptions {
    /// Options reading `path` with the process environment
    pub fn from_process_env(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env: std::env::vars().collect(),
        }
    }
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration
    pub async fn load(options: ConfigLoadOptions) -> Result<ServiceConfig, ConfigError> {
        let mut config = match Self::load_config_file(&options.path, &options.env).await? {
            Some(config) => config,
            None => ServiceConfig::default(),
        };

        Self::apply_env_overrides(&mut config, &options.env);
        Self::validate(&config)?;

        Ok(config)
    }

    /// Reject configurations the service cannot run with
    pub fn validate(config: &ServiceConfig) -> Result<(), ConfigError> {
        let problems = config.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    async fn load_config_file(
        file_path: &Path,
        env: &HashMap<String, String>,
    ) -> Result<Option<ServiceConfig>, ConfigError> {
        if !file_path.exists() {
            debug!("no config file at {}, using defaults", file_path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(file_path).await?;
        let expanded = Self::expand_env_vars(&content, env)?;
        let config: ServiceConfig = serde_yaml::from_str(&expanded)?;

        Ok(Some(config))
    }

    /// Replace `${VAR}` references with values from `env`
    pub fn expand_env_vars(
        content: &str,
        env: &HashMap<String, String>,
    ) -> Result<String, ConfigError> {
        if let Some(missing) = ENV_VAR_REGEX
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .find(|name| !env.contains_key(name))
        {
            return Err(ConfigError::UndefinedVariable(missing));
        }

        Ok(ENV_VAR_REGEX
            .replace_all(content, |caps: &regex::Captures| env[&caps[1]].clone())
            .into_owned())
    }

    fn apply_env_overrides(config: &mut ServiceConfig, env: &HashMap<String, String>) {
        if let Some(path) = env.get("COLLECTIONS_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(prefix) = env.get("COLLECTIONS_DOI_PREFIX") {
            config.doi_prefix = prefix.clone();
        }
        if let Some(url) = env.get("COLLECTIONS_CATALOG_URL") {
            config.catalog.base_url = url.clone();
        }
        if let Some(secret) = env.get("COLLECTIONS_CATALOG_SECRET") {
            config.catalog.signing_secret = SecretString::new(secret.clone().into());
        }
        if let Some(url) = env.get("COLLECTIONS_ARTIFACT_URL") {
            config.artifacts.base_url = url.clone();
        }
        if let Some(token) = env.get("COLLECTIONS_ARTIFACT_TOKEN") {
            config.artifacts.token = SecretString::new(token.clone().into());
        }
        if let Some(secs) = env
            .get("COLLECTIONS_STEP_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
        {
            config.saga.step_timeout_secs = secs;
        }
    }
}
