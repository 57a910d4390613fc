//! In-process versioned object store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::core::error::ArtifactError;
use crate::core::traits::{ManifestArtifactStore, ManifestVersion};

/// Keeps every saved version of every key in memory
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    objects: Mutex<HashMap<String, Vec<(ManifestVersion, Vec<u8>)>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, Vec<(ManifestVersion, Vec<u8>)>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Versions stored under `key`, oldest first
    pub fn versions(&self, key: &str) -> Vec<ManifestVersion> {
        self.objects()
            .get(key)
            .map(|versions| versions.iter().map(|(v, _)| v.clone()).collect())
            .unwrap_or_default()
    }

    /// Bytes of one stored version
    pub fn get(&self, key: &str, version: &ManifestVersion) -> Option<Vec<u8>> {
        self.objects()
            .get(key)?
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, bytes)| bytes.clone())
    }
}

#[async_trait]
impl ManifestArtifactStore for MemoryArtifactStore {
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<ManifestVersion, ArtifactError> {
        let version = ManifestVersion(Uuid::new_v4().to_string());

        self.objects()
            .entry(key.to_string())
            .or_default()
            .push((version.clone(), bytes));

        Ok(version)
    }

    async fn delete_version(
        &self,
        key: &str,
        version: &ManifestVersion,
    ) -> Result<(), ArtifactError> {
        let not_found = || ArtifactError::NotFound {
            key: key.to_string(),
            version: version.as_str().to_string(),
        };

        let mut objects = self.objects();
        let versions = objects.get_mut(key).ok_or_else(not_found)?;
        let index = versions
            .iter()
            .position(|(v, _)| v == version)
            .ok_or_else(not_found)?;

        versions.remove(index);
        if versions.is_empty() {
            objects.remove(key);
        }
        Ok(())
    }
}
