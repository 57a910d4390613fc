//! Manifest document schema
//!
//! Field order here is the serialized order; every list is a plain vector so
//! it serializes as `[]` when empty.

use serde::{Deserialize, Serialize};

use crate::core::model::UserProfile;

/// File name of the manifest inside its dataset
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Declared type of the manifest file entry
pub const MANIFEST_FILE_TYPE: &str = "application/json";

/// Deterministic object key for a dataset's manifest
pub fn manifest_key(dataset_id: &str) -> String {
    format!("{}/{}", dataset_id, MANIFEST_FILE_NAME)
}

/// Role of a contributor in the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributorRole {
    Creator,
    Contributor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestContributor {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    pub role: ContributorRole,
}

impl ManifestContributor {
    pub fn from_profile(profile: &UserProfile, role: ContributorRole) -> Self {
        Self {
            name: profile.name.clone(),
            email: profile.email.clone(),
            orcid: profile.orcid.clone(),
            role,
        }
    }
}

/// A file listed by the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub path: String,
    #[serde(rename = "fileType")]
    pub file_type: String,
    /// Size in bytes
    pub size: u64,
}

/// The self-describing manifest published alongside a catalog record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(rename = "@context")]
    pub context: String,

    #[serde(rename = "@type")]
    pub record_type: String,

    /// The assigned DOI
    #[serde(rename = "@id")]
    pub id: String,

    pub identifier: Vec<String>,

    pub name: String,

    pub description: String,

    pub license: String,

    pub version: String,

    pub publisher: String,

    #[serde(rename = "schemaVersion")]
    pub schema_version: String,

    #[serde(rename = "conformsTo")]
    pub conforms_to: String,

    /// Creator first, then co-contributors
    pub contributors: Vec<ManifestContributor>,

    pub keywords: Vec<String>,

    pub files: Vec<ManifestFile>,

    /// DOIs of the datasets the collection references
    pub references: Vec<String>,
}
