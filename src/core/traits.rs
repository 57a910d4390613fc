//! Collaborator traits and the payloads exchanged with them
//!
//! The orchestrator only ever talks to these abstractions; concrete stores
//! and clients live in their own modules and are injected at construction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::{ArtifactError, CatalogError, CollectionError, StatusStoreError};
use super::model::{
    Collection, DoiEntry, PublishStatus, PublishStatusKind, PublishType, UserProfile,
};

// ============================================================================
// Catalog payloads
// ============================================================================

/// Kind of record a DOI resolves to in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Dataset,
    Collection,
}

/// Catalog view of a referenced DOI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDoi {
    pub doi: String,
    pub kind: RecordKind,
    pub published: bool,
}

/// Publication status as reported by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    InProgress,
    Completed,
    Failed,
    Removed,
}

impl CatalogStatus {
    /// Terminal publish status row value recording this catalog outcome
    pub fn to_publish_status(self) -> PublishStatusKind {
        match self {
            Self::Completed | Self::Removed => PublishStatusKind::Completed,
            Self::Failed => PublishStatusKind::Failed,
            Self::InProgress => PublishStatusKind::InProgress,
        }
    }
}

/// Identity of a contributor as sent to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorIdentity {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
}

impl From<&UserProfile> for ContributorIdentity {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            orcid: profile.orcid.clone(),
        }
    }
}

/// Body of `POST /collection/{id}/publish`
///
/// List fields are plain vectors so they always serialize as `[]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPublishRequest {
    pub name: String,
    pub description: String,
    pub banner_urls: Vec<String>,
    pub dois: Vec<String>,
    pub license: String,
    pub tags: Vec<String>,
    pub owner: ContributorIdentity,
    pub contributors: Vec<ContributorIdentity>,
}

/// Response of `POST /collection/{id}/publish`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPublication {
    pub dataset_id: String,
    pub version: String,
    pub status: CatalogStatus,
}

/// Body of `POST /collection/{id}/finalize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub success: bool,
    pub file_count: u64,
    pub total_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_version: Option<String>,
}

impl FinalizeRequest {
    /// A failure finalization carrying no manifest metadata
    pub fn failure() -> Self {
        Self {
            success: false,
            file_count: 0,
            total_size: 0,
            manifest_key: None,
            manifest_version: None,
        }
    }
}

/// Opaque version token of a stored manifest object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestVersion(pub String);

impl ManifestVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Lifecycle record of a collection's publication
#[async_trait]
pub trait PublishStatusStore: Send + Sync {
    /// Atomically mark the collection's publication as in progress
    ///
    /// Fails with [`StatusStoreError::AlreadyInProgress`] when the existing
    /// row is still in progress; in that case nothing was written.
    async fn claim(
        &self,
        collection_id: i64,
        user_id: &str,
        publish_type: PublishType,
    ) -> Result<(), StatusStoreError>;

    /// Move the row to a terminal status and stamp its finish time
    ///
    /// With `must_exist` a missing row is reported as
    /// [`StatusStoreError::NoPublishStatus`].
    async fn finish(
        &self,
        collection_id: i64,
        status: PublishStatusKind,
        must_exist: bool,
    ) -> Result<(), StatusStoreError>;

    async fn get(&self, collection_id: i64) -> Result<Option<PublishStatus>, StatusStoreError>;
}

/// Client for the external cataloguing service
#[async_trait]
pub trait CatalogPublisher: Send + Sync {
    async fn resolve_dois(&self, dois: &[String]) -> Result<Vec<ResolvedDoi>, CatalogError>;

    async fn publish(
        &self,
        collection_node_id: &str,
        request: &CatalogPublishRequest,
    ) -> Result<CatalogPublication, CatalogError>;

    async fn finalize(
        &self,
        collection_node_id: &str,
        request: &FinalizeRequest,
    ) -> Result<CatalogStatus, CatalogError>;

    async fn unpublish(&self, collection_node_id: &str) -> Result<CatalogStatus, CatalogError>;
}

/// Versioned object store holding manifest documents
#[async_trait]
pub trait ManifestArtifactStore: Send + Sync {
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<ManifestVersion, ArtifactError>;

    /// Delete exactly one version of the object under `key`
    async fn delete_version(
        &self,
        key: &str,
        version: &ManifestVersion,
    ) -> Result<(), ArtifactError>;
}

/// Read access to collections plus the membership write used by DOI updates
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    async fn find_collection(&self, node_id: &str) -> Result<Option<Collection>, CollectionError>;

    async fn replace_dois(
        &self,
        collection_id: i64,
        dois: &[DoiEntry],
    ) -> Result<(), CollectionError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, CollectionError>;
}
