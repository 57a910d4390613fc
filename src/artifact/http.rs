//! S3-compatible versioned bucket over HTTP

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

use crate::core::config::ArtifactConfig;
use crate::core::error::ArtifactError;
use crate::core::traits::{ManifestArtifactStore, ManifestVersion};

/// Response header carrying the version of a stored object
pub const VERSION_HEADER: &str = "x-amz-version-id";

pub struct HttpArtifactStore {
    client: Client,
    base_url: String,
    bucket: String,
    token: SecretString,
}

impl HttpArtifactStore {
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, ArtifactError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            token,
        })
    }

    pub fn from_config(config: &ArtifactConfig) -> Result<Self, ArtifactError> {
        Self::new(
            config.base_url.clone(),
            config.bucket.clone(),
            SecretString::new(config.token.expose_secret().into()),
            config.timeout(),
        )
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, key)
    }
}

async fn status_error(response: reqwest::Response) -> ArtifactError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ArtifactError::Status { status, body }
}

#[async_trait]
impl ManifestArtifactStore for HttpArtifactStore {
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<ManifestVersion, ArtifactError> {
        let size = bytes.len();
        let response = self
            .client
            .put(self.object_url(key))
            .bearer_auth(self.token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let version = response
            .headers()
            .get(VERSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| ManifestVersion(value.to_string()))
            .ok_or_else(|| ArtifactError::MissingVersion {
                key: key.to_string(),
            })?;

        debug!(key, version = version.as_str(), size, "manifest stored");
        Ok(version)
    }

    async fn delete_version(
        &self,
        key: &str,
        version: &ManifestVersion,
    ) -> Result<(), ArtifactError> {
        let response = self
            .client
            .delete(self.object_url(key))
            .query(&[("versionId", version.as_str())])
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!(key, version = version.as_str(), "manifest version deleted");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(ArtifactError::NotFound {
                key: key.to_string(),
                version: version.as_str().to_string(),
            }),
            _ => Err(status_error(response).await),
        }
    }
}
