pub mod artifact;
pub mod catalog;
pub mod collection;
pub mod core;
pub mod manifest;
pub mod orchestration;
pub mod security;
pub mod store;

pub use artifact::{HttpArtifactStore, MemoryArtifactStore};
pub use catalog::HttpCatalogClient;
pub use collection::{DoiUpdate, MembershipService, categorize_dois};
pub use self::core::*;
pub use manifest::{ManifestBuilder, manifest_key};
pub use orchestration::{
    Collaborators, OrchestratorOptions, PublicationOrchestrator, PublishReport, PublishRequest,
    RemovalReport,
};
pub use store::{Database, NewCollection};
