//! Manifest artifact stores

pub mod http;
pub mod memory;

pub use http::{HttpArtifactStore, VERSION_HEADER};
pub use memory::MemoryArtifactStore;
