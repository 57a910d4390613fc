//! Publication orchestrator
//!
//! Drives the publish saga across the status store, the catalog and the
//! manifest artifact store:
//!
//! 1. load the collection and require the owner role
//! 2. claim the publish status row (undo: mark it Failed)
//! 3. validate description, license, tags and DOI sources
//! 4. resolve referenced DOIs; every one must be published upstream
//! 5. load the publishing user's profile and co-contributors
//! 6. publish to the catalog (undo: finalize as unsuccessful)
//! 7. build and save the manifest (undo: delete that version)
//! 8. finalize the catalog publication
//! 9. finish the status row with the finalized status
//!
//! Collaborators are injected through [`Collaborators`]; each request runs
//! inside its own tracing span.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span};

use super::deadline::RequestDeadline;
use super::saga::{Compensation, CompensationStack, Compensator, with_compensation_failures};
use super::state::{SagaState, SagaTracker, StateTransition};
use crate::collection::categorize_dois;
use crate::core::config::ServiceConfig;
use crate::core::error::CollectionError;
use crate::core::model::{
    Collection, PublishStatus, PublishStatusKind, PublishType, Role, UserProfile,
};
use crate::core::retry::{RetryManager, RetryOptions};
use crate::core::traits::{
    CatalogPublishRequest, CatalogPublisher, CatalogStatus, CollectionRepository,
    ContributorIdentity, FinalizeRequest, ManifestArtifactStore, ManifestVersion,
    PublishStatusStore, UserDirectory,
};
use crate::manifest::{ManifestBuilder, ManifestInput, manifest_key};

/// Banner URLs sent to the catalog
pub const MAX_BANNER_URLS: usize = 4;

/// The orchestrator's collaborators
#[derive(Clone)]
pub struct Collaborators {
    pub status: Arc<dyn PublishStatusStore>,
    pub collections: Arc<dyn CollectionRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub catalog: Arc<dyn CatalogPublisher>,
    pub artifacts: Arc<dyn ManifestArtifactStore>,
}

#[async_trait]
impl Compensator for Collaborators {
    async fn compensate(&self, compensation: &Compensation) -> Result<(), CollectionError> {
        match compensation {
            Compensation::FailPublishStatus { collection_id } => {
                self.status
                    .finish(*collection_id, PublishStatusKind::Failed, true)
                    .await?;
            }
            Compensation::FailCatalogPublication { collection_node_id } => {
                self.catalog
                    .finalize(collection_node_id, &FinalizeRequest::failure())
                    .await?;
            }
            Compensation::DeleteManifestVersion { key, version } => {
                self.artifacts.delete_version(key, version).await?;
            }
        }
        Ok(())
    }
}

/// Policy and tuning of the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Prefix of catalog-native DOIs
    pub doi_prefix: String,
    pub allowed_licenses: Vec<String>,
    /// Upper bound for each forward remote call
    pub step_timeout: Duration,
    /// Upper bound for each compensating call
    pub compensation_timeout: Duration,
    pub retry: RetryManager,
    pub manifest: ManifestBuilder,
}

impl OrchestratorOptions {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            doi_prefix: config.doi_prefix.clone(),
            allowed_licenses: config.allowed_licenses.clone(),
            step_timeout: Duration::from_secs(config.saga.step_timeout_secs),
            compensation_timeout: Duration::from_secs(config.saga.compensation_timeout_secs),
            retry: RetryManager::new(RetryOptions::from(&config.retry)),
            manifest: ManifestBuilder::new(config.manifest.clone(), config.publisher.clone()),
        }
    }
}

/// A publish or unpublish request
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub collection_node_id: String,
    pub user_id: String,
    /// Absolute deadline for the whole request
    pub deadline: Option<Instant>,
}

impl PublishRequest {
    pub fn new(collection_node_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            collection_node_id: collection_node_id.into(),
            user_id: user_id.into(),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

/// Outcome of a successful publication
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub collection_id: i64,
    pub publish_type: PublishType,
    pub dataset_id: String,
    pub version: String,
    pub manifest_key: String,
    pub manifest_version: ManifestVersion,
    /// Declared size of the manifest in bytes
    pub manifest_size: u64,
    pub status: PublishStatusKind,
    pub transitions: Vec<StateTransition>,
}

/// Outcome of a successful removal
#[derive(Debug, Clone, Serialize)]
pub struct RemovalReport {
    pub collection_id: i64,
    pub catalog_status: CatalogStatus,
    pub status: PublishStatusKind,
    pub transitions: Vec<StateTransition>,
}

/// What the catalog assigned and the saga wrote before finalizing
struct Finalized {
    dataset_id: String,
    version: String,
    manifest_key: String,
    manifest_version: ManifestVersion,
    manifest_size: u64,
    catalog_status: CatalogStatus,
}

/// The publication saga driver
pub struct PublicationOrchestrator {
    collaborators: Collaborators,
    options: OrchestratorOptions,
}

impl PublicationOrchestrator {
    pub fn new(collaborators: Collaborators, options: OrchestratorOptions) -> Self {
        Self {
            collaborators,
            options,
        }
    }

    /// Publish a collection to the catalog
    ///
    /// # Errors
    ///
    /// Returns NotFound when the caller holds no role on the collection,
    /// Forbidden below owner, Conflict when a publish is already in progress
    /// and BadRequest for invalid collections. Any failure after the claim
    /// unwinds the completed steps; compensation failures are appended to
    /// the returned error.
    pub async fn publish(&self, request: PublishRequest) -> Result<PublishReport, CollectionError> {
        let span = info_span!(
            "publish",
            collection = %request.collection_node_id,
            user = %request.user_id,
            operation = "publish"
        );
        self.run_publish(request).instrument(span).await
    }

    /// Withdraw a published collection from the catalog
    pub async fn unpublish(&self, request: PublishRequest) -> Result<RemovalReport, CollectionError> {
        let span = info_span!(
            "unpublish",
            collection = %request.collection_node_id,
            user = %request.user_id,
            operation = "unpublish"
        );
        self.run_unpublish(request).instrument(span).await
    }

    /// Current publish status row of a collection visible to `user_id`
    pub async fn publish_status(
        &self,
        collection_node_id: &str,
        user_id: &str,
    ) -> Result<PublishStatus, CollectionError> {
        let deadline = RequestDeadline::new(None, self.options.step_timeout);
        let collection = self
            .authorize(&deadline, collection_node_id, user_id, Role::Guest)
            .await?;

        deadline
            .run("load publish status", self.collaborators.status.get(collection.id))
            .await?
            .ok_or_else(|| CollectionError::not_found(collection_node_id))
    }

    async fn run_publish(&self, request: PublishRequest) -> Result<PublishReport, CollectionError> {
        let deadline = RequestDeadline::new(request.deadline, self.options.step_timeout);
        let mut tracker = SagaTracker::new();

        let collection = self
            .authorize(&deadline, &request.collection_node_id, &request.user_id, Role::Owner)
            .await?;

        let previous = deadline
            .run("load publish status", self.collaborators.status.get(collection.id))
            .await?;
        let publish_type = if previous.as_ref().is_some_and(PublishStatus::is_published) {
            PublishType::Revision
        } else {
            PublishType::Publication
        };

        // The claim always runs to completion; an overrun is reported after
        // it has landed so the committed row is unwound
        let claim_budget = deadline.start("claim publish status")?;
        self.collaborators
            .status
            .claim(collection.id, &request.user_id, publish_type)
            .await?;
        info!(publish_type = publish_type.as_str(), "publish status claimed");
        tracker.transition(SagaState::Claimed, None);

        let mut compensations = CompensationStack::new();
        compensations.push(Compensation::FailPublishStatus {
            collection_id: collection.id,
        });

        let outcome = match claim_budget.check() {
            Ok(()) => {
                self.publish_claimed(
                    &deadline,
                    &collection,
                    &request.user_id,
                    &mut compensations,
                    &mut tracker,
                )
                .await
            }
            Err(error) => Err(error),
        };
        let finalized = match outcome {
            Ok(finalized) => finalized,
            Err(error) => {
                let failures = compensations
                    .unwind(&self.collaborators, self.options.compensation_timeout)
                    .await;
                tracker.transition(SagaState::Failed, Some(error.to_string()));
                return Err(with_compensation_failures(error, failures));
            }
        };

        let status = self
            .finish_with(&deadline, collection.id, finalized.catalog_status, &mut tracker)
            .await?;
        info!(
            dataset_id = %finalized.dataset_id,
            version = %finalized.version,
            "collection published"
        );

        Ok(PublishReport {
            collection_id: collection.id,
            publish_type,
            dataset_id: finalized.dataset_id,
            version: finalized.version,
            manifest_key: finalized.manifest_key,
            manifest_version: finalized.manifest_version,
            manifest_size: finalized.manifest_size,
            status,
            transitions: tracker.into_history(),
        })
    }

    /// Steps 3 to 8; every error returned here unwinds `compensations`
    async fn publish_claimed(
        &self,
        deadline: &RequestDeadline,
        collection: &Collection,
        user_id: &str,
        compensations: &mut CompensationStack,
        tracker: &mut SagaTracker,
    ) -> Result<Finalized, CollectionError> {
        let license = self.validate(collection)?;
        let references: Vec<String> = collection.dois.iter().map(|d| d.value.clone()).collect();

        self.check_references(deadline, &references).await?;

        let creator = self.profile(deadline, user_id).await?.ok_or_else(|| {
            CollectionError::internal(format!("no profile for user {}", user_id))
        })?;
        let co_contributors = self.co_contributors(deadline, collection, user_id).await?;

        let catalog_request = CatalogPublishRequest {
            name: collection.name.clone(),
            description: collection.description.clone(),
            banner_urls: collection
                .banner_urls
                .iter()
                .take(MAX_BANNER_URLS)
                .cloned()
                .collect(),
            dois: references.clone(),
            license: license.clone(),
            tags: collection.tags.clone(),
            owner: ContributorIdentity::from(&creator),
            contributors: co_contributors.iter().map(ContributorIdentity::from).collect(),
        };

        let publication = deadline
            .run(
                "catalog publish",
                self.collaborators
                    .catalog
                    .publish(&collection.node_id, &catalog_request),
            )
            .await?;
        compensations.push(Compensation::FailCatalogPublication {
            collection_node_id: collection.node_id.clone(),
        });
        tracker.transition(
            SagaState::ExternallyPublished,
            Some(publication.dataset_id.clone()),
        );
        info!(
            dataset_id = %publication.dataset_id,
            version = %publication.version,
            "catalog publication started"
        );

        let manifest = self.options.manifest.build(ManifestInput {
            dataset_id: publication.dataset_id.clone(),
            version: publication.version.clone(),
            name: collection.name.clone(),
            description: collection.description.clone(),
            license,
            keywords: collection.tags.clone(),
            creator,
            co_contributors,
            references,
        })?;
        let key = manifest_key(&publication.dataset_id);

        let artifacts = &self.collaborators.artifacts;
        let manifest_version = deadline
            .run(
                "save manifest",
                self.options.retry.retry("save manifest", || {
                    artifacts.save(&key, manifest.bytes.clone())
                }),
            )
            .await?;
        compensations.push(Compensation::DeleteManifestVersion {
            key: key.clone(),
            version: manifest_version.clone(),
        });
        tracker.transition(
            SagaState::ManifestWritten,
            Some(manifest_version.as_str().to_string()),
        );

        let finalize = FinalizeRequest {
            success: true,
            file_count: manifest.file_count(),
            total_size: manifest.size(),
            manifest_key: Some(key.clone()),
            manifest_version: Some(manifest_version.as_str().to_string()),
        };
        let catalog_status = deadline
            .run(
                "catalog finalize",
                self.collaborators
                    .catalog
                    .finalize(&collection.node_id, &finalize),
            )
            .await?;
        compensations.commit();
        tracker.transition(SagaState::Finalized, None);

        Ok(Finalized {
            dataset_id: publication.dataset_id,
            version: publication.version,
            manifest_key: key,
            manifest_version,
            manifest_size: manifest.size(),
            catalog_status,
        })
    }

    async fn run_unpublish(&self, request: PublishRequest) -> Result<RemovalReport, CollectionError> {
        let deadline = RequestDeadline::new(request.deadline, self.options.step_timeout);
        let mut tracker = SagaTracker::new();

        let collection = self
            .authorize(&deadline, &request.collection_node_id, &request.user_id, Role::Owner)
            .await?;

        let previous = deadline
            .run("load publish status", self.collaborators.status.get(collection.id))
            .await?;
        if !previous.as_ref().is_some_and(PublishStatus::is_published) {
            return Err(CollectionError::conflict("collection is not published"));
        }

        let claim_budget = deadline.start("claim publish status")?;
        self.collaborators
            .status
            .claim(collection.id, &request.user_id, PublishType::Removal)
            .await?;
        info!("removal claimed");
        tracker.transition(SagaState::Claimed, None);

        let mut compensations = CompensationStack::new();
        compensations.push(Compensation::FailPublishStatus {
            collection_id: collection.id,
        });

        let outcome = match claim_budget.check() {
            Ok(()) => {
                deadline
                    .run(
                        "catalog unpublish",
                        self.collaborators.catalog.unpublish(&collection.node_id),
                    )
                    .await
            }
            Err(error) => Err(error),
        };
        let catalog_status = match outcome {
            Ok(status) => status,
            Err(error) => {
                let failures = compensations
                    .unwind(&self.collaborators, self.options.compensation_timeout)
                    .await;
                tracker.transition(SagaState::Failed, Some(error.to_string()));
                return Err(with_compensation_failures(error, failures));
            }
        };
        compensations.commit();
        tracker.transition(SagaState::Finalized, None);

        let status = self
            .finish_with(&deadline, collection.id, catalog_status, &mut tracker)
            .await?;
        info!("collection unpublished");

        Ok(RemovalReport {
            collection_id: collection.id,
            catalog_status,
            status,
            transitions: tracker.into_history(),
        })
    }

    /// Record the catalog's final status on the status row
    ///
    /// A catalog status other than completed still finishes the row, as
    /// Failed, and is reported as an error.
    async fn finish_with(
        &self,
        deadline: &RequestDeadline,
        collection_id: i64,
        catalog_status: CatalogStatus,
        tracker: &mut SagaTracker,
    ) -> Result<PublishStatusKind, CollectionError> {
        let status = match catalog_status.to_publish_status() {
            PublishStatusKind::InProgress => PublishStatusKind::Failed,
            terminal => terminal,
        };

        if let Err(error) = deadline
            .run(
                "finish publish status",
                self.collaborators.status.finish(collection_id, status, true),
            )
            .await
        {
            tracker.transition(SagaState::Failed, Some(error.to_string()));
            return Err(error);
        }

        if status == PublishStatusKind::Completed {
            tracker.transition(SagaState::Completed, None);
            Ok(status)
        } else {
            let message = format!("catalog reported status {:?}", catalog_status);
            tracker.transition(SagaState::Failed, Some(message.clone()));
            Err(CollectionError::internal(message))
        }
    }

    /// Load the collection and require at least `required` for `user_id`
    ///
    /// Callers without any role cannot see the collection at all.
    async fn authorize(
        &self,
        deadline: &RequestDeadline,
        collection_node_id: &str,
        user_id: &str,
        required: Role,
    ) -> Result<Collection, CollectionError> {
        let collection = deadline
            .run(
                "load collection",
                self.collaborators.collections.find_collection(collection_node_id),
            )
            .await?
            .ok_or_else(|| CollectionError::not_found(collection_node_id))?;

        match collection.role_of(user_id) {
            None => Err(CollectionError::not_found(collection_node_id)),
            Some(role) if role < required => Err(CollectionError::forbidden(format!(
                "{} role required, caller is {}",
                required.as_str(),
                role.as_str()
            ))),
            Some(_) => Ok(collection),
        }
    }

    /// Returns the license to publish under
    fn validate(&self, collection: &Collection) -> Result<String, CollectionError> {
        if collection.description.trim().is_empty() {
            return Err(CollectionError::bad_request(
                "a description is required to publish",
            ));
        }

        let license = match collection.license.as_deref() {
            Some(license) if self.options.allowed_licenses.iter().any(|l| l == license) => {
                license.to_string()
            }
            Some(license) => {
                return Err(CollectionError::bad_request(format!(
                    "license {} is not accepted",
                    license
                )));
            }
            None => return Err(CollectionError::bad_request("a license is required to publish")),
        };

        if !collection.tags.iter().any(|tag| !tag.trim().is_empty()) {
            return Err(CollectionError::bad_request("at least one tag is required to publish"));
        }

        let values: Vec<String> = collection.dois.iter().map(|d| d.value.clone()).collect();
        let categorized = categorize_dois(&self.options.doi_prefix, &values);
        if !categorized.external.is_empty() {
            return Err(CollectionError::bad_request(format!(
                "external DOIs cannot be published: {}",
                categorized.external.join(", ")
            )));
        }

        Ok(license)
    }

    async fn check_references(
        &self,
        deadline: &RequestDeadline,
        references: &[String],
    ) -> Result<(), CollectionError> {
        if references.is_empty() {
            return Ok(());
        }

        let catalog = &self.collaborators.catalog;
        let resolved = deadline
            .run(
                "resolve dois",
                self.options
                    .retry
                    .retry("resolve dois", || catalog.resolve_dois(references)),
            )
            .await?;

        let unpublished: Vec<&str> = references
            .iter()
            .filter(|doi| {
                !resolved
                    .iter()
                    .any(|record| &record.doi == *doi && record.published)
            })
            .map(String::as_str)
            .collect();

        if unpublished.is_empty() {
            Ok(())
        } else {
            Err(CollectionError::bad_request(format!(
                "referenced DOIs are not published: {}",
                unpublished.join(", ")
            )))
        }
    }

    async fn profile(
        &self,
        deadline: &RequestDeadline,
        user_id: &str,
    ) -> Result<Option<UserProfile>, CollectionError> {
        deadline
            .run("load user profile", self.collaborators.users.profile(user_id))
            .await
    }

    /// Editors and owners other than the publisher, ordered by user id
    async fn co_contributors(
        &self,
        deadline: &RequestDeadline,
        collection: &Collection,
        user_id: &str,
    ) -> Result<Vec<UserProfile>, CollectionError> {
        let mut profiles = Vec::new();

        for (member, role) in &collection.roles {
            if member == user_id || *role < Role::Editor {
                continue;
            }
            match self.profile(deadline, member).await? {
                Some(profile) => profiles.push(profile),
                None => debug!(user = %member, "contributor has no profile, skipped"),
            }
        }

        Ok(profiles)
    }
}
