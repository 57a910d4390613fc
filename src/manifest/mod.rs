pub mod builder;
pub mod document;

pub use builder::{BuiltManifest, ManifestBuilder, ManifestInput, self_referential_size};
pub use document::{
    ContributorRole, MANIFEST_FILE_NAME, MANIFEST_FILE_TYPE, ManifestContributor,
    ManifestDocument, ManifestFile, manifest_key,
};
