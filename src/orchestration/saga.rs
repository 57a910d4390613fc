//! Compensating actions of the publication saga
//!
//! Each side-effecting step pushes its undo action once it has committed;
//! on failure the stack is unwound in reverse (LIFO). Undo errors are
//! collected and logged but never replace the error that triggered the unwind.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::deadline::bounded;
use crate::core::error::CollectionError;
use crate::core::traits::ManifestVersion;

/// Undo action registered by a completed saga step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Move the claimed publish status row to Failed
    FailPublishStatus { collection_id: i64 },

    /// Finalize the catalog publication as unsuccessful
    FailCatalogPublication { collection_node_id: String },

    /// Delete exactly the manifest version this saga wrote
    DeleteManifestVersion {
        key: String,
        version: ManifestVersion,
    },
}

impl Compensation {
    pub fn description(&self) -> String {
        match self {
            Self::FailPublishStatus { collection_id } => {
                format!("fail publish status of collection {}", collection_id)
            }
            Self::FailCatalogPublication { collection_node_id } => {
                format!("fail catalog publication of {}", collection_node_id)
            }
            Self::DeleteManifestVersion { key, version } => {
                format!("delete manifest {} version {}", key, version.as_str())
            }
        }
    }
}

/// Executes compensations against the saga's collaborators
#[async_trait]
pub trait Compensator: Send + Sync {
    async fn compensate(&self, compensation: &Compensation) -> Result<(), CollectionError>;
}

/// A compensation that could not be completed
#[derive(Debug)]
pub struct CompensationFailure {
    pub description: String,
    pub error: CollectionError,
}

/// LIFO stack of pending compensations
#[derive(Debug, Default)]
pub struct CompensationStack {
    entries: Vec<Compensation>,
}

impl CompensationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, compensation: Compensation) {
        debug!(compensation = %compensation.description(), "compensation registered");
        self.entries.push(compensation);
    }

    /// Compensations in registration order
    pub fn pending(&self) -> &[Compensation] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discard every pending compensation once the saga can no longer be undone
    pub fn commit(&mut self) {
        self.entries.clear();
    }

    /// Run every pending compensation, most recent first
    ///
    /// Each compensation gets its own `timeout`. A failure does not stop the
    /// unwind.
    pub async fn unwind(
        &mut self,
        compensator: &dyn Compensator,
        timeout: Duration,
    ) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();

        while let Some(compensation) = self.entries.pop() {
            let description = compensation.description();

            match bounded(&description, timeout, compensator.compensate(&compensation)).await {
                Ok(()) => debug!(compensation = %description, "compensation applied"),
                Err(error) => {
                    warn!(compensation = %description, error = %error, "compensation failed");
                    failures.push(CompensationFailure { description, error });
                }
            }
        }

        failures
    }
}

/// Annotate the triggering error with any compensation failures
pub fn with_compensation_failures(
    error: CollectionError,
    failures: Vec<CompensationFailure>,
) -> CollectionError {
    if failures.is_empty() {
        return error;
    }

    let summary = failures
        .iter()
        .map(|failure| format!("{}: {}", failure.description, failure.error))
        .collect::<Vec<_>>()
        .join("; ");

    CollectionError::WithCompensationFailures {
        error: Box::new(error),
        summary,
    }
}
