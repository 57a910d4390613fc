//! Two-phase manifest construction
//!
//! The manifest lists itself as a file whose size is the manifest's own
//! serialized length. The document is measured once with a single-digit
//! placeholder and the size is then patched in, computed as a fixed point by
//! [`self_referential_size`].

use crate::core::config::ManifestConfig;
use crate::core::error::ManifestError;
use crate::core::model::UserProfile;

use super::document::{
    ContributorRole, MANIFEST_FILE_NAME, MANIFEST_FILE_TYPE, ManifestContributor,
    ManifestDocument, ManifestFile,
};

const RECORD_TYPE: &str = "Dataset";

/// Number of decimal digits needed to print `n`
fn decimal_digits(mut n: u64) -> u64 {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Size a self-describing document must declare, given the length it
/// serializes to with a single-digit placeholder size
///
/// # Examples
///
/// ```
/// use collection_publisher::manifest::self_referential_size;
///
/// // 8 bytes of content plus the one-digit size itself
/// assert_eq!(self_referential_size(9), 9);
/// // 9 bytes of content: "10" would not fit, "11" does
/// assert_eq!(self_referential_size(10), 11);
/// ```
pub fn self_referential_size(placeholder_len: u64) -> u64 {
    let base = placeholder_len.saturating_sub(1);
    let digits = decimal_digits(base);
    let candidate = base + digits;

    if decimal_digits(candidate) > digits {
        candidate + 1
    } else {
        candidate
    }
}

/// Collection metadata a manifest is built from
#[derive(Debug, Clone)]
pub struct ManifestInput {
    pub dataset_id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub license: String,
    pub keywords: Vec<String>,
    pub creator: UserProfile,
    pub co_contributors: Vec<UserProfile>,
    pub references: Vec<String>,
}

/// A manifest and its exact serialized bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltManifest {
    pub document: ManifestDocument,
    pub bytes: Vec<u8>,
}

impl BuiltManifest {
    /// Declared (and actual) size of the manifest in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Number of files the manifest lists
    pub fn file_count(&self) -> u64 {
        self.document.files.len() as u64
    }
}

/// Builds deterministic manifest documents
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    config: ManifestConfig,
    publisher: String,
}

impl ManifestBuilder {
    pub fn new(config: ManifestConfig, publisher: impl Into<String>) -> Self {
        Self {
            config,
            publisher: publisher.into(),
        }
    }

    pub fn build(&self, input: ManifestInput) -> Result<BuiltManifest, ManifestError> {
        let mut document = self.document(input);

        let placeholder_len = serde_json::to_vec(&document)?.len() as u64;
        let size = self_referential_size(placeholder_len);
        document.files[0].size = size;

        let bytes = serde_json::to_vec(&document)?;
        if bytes.len() as u64 != size {
            return Err(ManifestError::SizeMismatch {
                declared: size,
                actual: bytes.len(),
            });
        }

        Ok(BuiltManifest { document, bytes })
    }

    fn document(&self, input: ManifestInput) -> ManifestDocument {
        let contributors = std::iter::once(ManifestContributor::from_profile(
            &input.creator,
            ContributorRole::Creator,
        ))
        .chain(
            input
                .co_contributors
                .iter()
                .map(|profile| ManifestContributor::from_profile(profile, ContributorRole::Contributor)),
        )
        .collect();

        ManifestDocument {
            context: self.config.context.clone(),
            record_type: RECORD_TYPE.to_string(),
            id: input.dataset_id.clone(),
            identifier: vec![input.dataset_id],
            name: input.name,
            description: input.description,
            license: input.license,
            version: input.version,
            publisher: self.publisher.clone(),
            schema_version: self.config.schema_version.clone(),
            conforms_to: self.config.conforms_to.clone(),
            contributors,
            keywords: input.keywords,
            files: vec![ManifestFile {
                name: MANIFEST_FILE_NAME.to_string(),
                path: MANIFEST_FILE_NAME.to_string(),
                file_type: MANIFEST_FILE_TYPE.to_string(),
                size: 0,
            }],
            references: input.references,
        }
    }
}
