//! Publication saga scenarios against recording collaborators

use async_trait::async_trait;
use collection_publisher::orchestration::SagaState;
use collection_publisher::{
    ArtifactError, CatalogError, CatalogPublication, CatalogPublishRequest, CatalogPublisher,
    CatalogStatus, Collaborators, CollectionError, Database, DoiEntry, ErrorKind,
    FinalizeRequest, ManifestArtifactStore, ManifestBuilder, ManifestConfig, ManifestVersion,
    MemoryArtifactStore, NewCollection, OrchestratorOptions, PublicationOrchestrator,
    PublishRequest, PublishStatus, PublishStatusKind, PublishStatusStore, PublishType,
    RecordKind, ResolvedDoi, RetryManager, RetryOptions, Role, StatusStoreError, UserProfile,
    manifest_key,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DATASET_ID: &str = "10.1111/coll-1";

// ============================================================================
// Recording collaborators
// ============================================================================

#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    /// Entries recorded after the first occurrence of `marker`
    fn after(&self, marker: &str) -> Vec<String> {
        let entries = self.entries();
        match entries.iter().position(|e| e == marker) {
            Some(index) => entries[index + 1..].to_vec(),
            None => vec![],
        }
    }
}

#[derive(Clone, Default)]
struct Scenario {
    fail_publish: bool,
    publish_delay: Option<Duration>,
    /// Number of leading save attempts that fail with 503
    save_failures: u32,
    fail_finalize: bool,
    fail_failure_finalize: bool,
    finalize_status: Option<CatalogStatus>,
    fail_delete: bool,
    fail_unpublish: bool,
    unpublished: Vec<String>,
    step_timeout: Option<Duration>,
    /// Delay before a committed claim is acknowledged
    claim_delay: Option<Duration>,
}

fn unavailable() -> CatalogError {
    CatalogError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

struct RecordingStatus {
    inner: Arc<Database>,
    log: Log,
    claim_delay: Option<Duration>,
}

#[async_trait]
impl PublishStatusStore for RecordingStatus {
    async fn claim(
        &self,
        collection_id: i64,
        user_id: &str,
        publish_type: PublishType,
    ) -> Result<(), StatusStoreError> {
        self.inner.claim(collection_id, user_id, publish_type).await?;
        self.log.push(format!("claim:{}", publish_type.as_str()));
        if let Some(delay) = self.claim_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn finish(
        &self,
        collection_id: i64,
        status: PublishStatusKind,
        must_exist: bool,
    ) -> Result<(), StatusStoreError> {
        self.log.push(format!("finish:{}", status));
        self.inner.finish(collection_id, status, must_exist).await
    }

    async fn get(&self, collection_id: i64) -> Result<Option<PublishStatus>, StatusStoreError> {
        self.inner.get(collection_id).await
    }
}

struct FakeCatalog {
    scenario: Scenario,
    log: Log,
    published: Mutex<Vec<CatalogPublishRequest>>,
    versions: AtomicU32,
}

#[async_trait]
impl CatalogPublisher for FakeCatalog {
    async fn resolve_dois(&self, dois: &[String]) -> Result<Vec<ResolvedDoi>, CatalogError> {
        self.log.push("resolve");
        Ok(dois
            .iter()
            .map(|doi| ResolvedDoi {
                doi: doi.clone(),
                kind: RecordKind::Dataset,
                published: !self.scenario.unpublished.contains(doi),
            })
            .collect())
    }

    async fn publish(
        &self,
        _collection_node_id: &str,
        request: &CatalogPublishRequest,
    ) -> Result<CatalogPublication, CatalogError> {
        if let Some(delay) = self.scenario.publish_delay {
            tokio::time::sleep(delay).await;
        }
        self.log.push("publish");
        if self.scenario.fail_publish {
            return Err(unavailable());
        }

        self.published.lock().unwrap().push(request.clone());
        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CatalogPublication {
            dataset_id: DATASET_ID.to_string(),
            version: version.to_string(),
            status: CatalogStatus::InProgress,
        })
    }

    async fn finalize(
        &self,
        _collection_node_id: &str,
        request: &FinalizeRequest,
    ) -> Result<CatalogStatus, CatalogError> {
        self.log.push(format!("finalize:{}", request.success));

        if request.success {
            if self.scenario.fail_finalize {
                return Err(unavailable());
            }
            Ok(self.scenario.finalize_status.unwrap_or(CatalogStatus::Completed))
        } else if self.scenario.fail_failure_finalize {
            Err(unavailable())
        } else {
            Ok(CatalogStatus::Failed)
        }
    }

    async fn unpublish(&self, _collection_node_id: &str) -> Result<CatalogStatus, CatalogError> {
        self.log.push("unpublish");
        if self.scenario.fail_unpublish {
            return Err(unavailable());
        }
        Ok(CatalogStatus::Removed)
    }
}

struct FakeArtifacts {
    store: MemoryArtifactStore,
    log: Log,
    save_failures: AtomicU32,
    fail_delete: bool,
}

#[async_trait]
impl ManifestArtifactStore for FakeArtifacts {
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<ManifestVersion, ArtifactError> {
        self.log.push("save");
        let remaining = self.save_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.save_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ArtifactError::Status {
                status: 503,
                body: "slow down".to_string(),
            });
        }
        self.store.save(key, bytes).await
    }

    async fn delete_version(
        &self,
        key: &str,
        version: &ManifestVersion,
    ) -> Result<(), ArtifactError> {
        self.log.push(format!("delete:{}", version.as_str()));
        if self.fail_delete {
            return Err(ArtifactError::Status {
                status: 500,
                body: "connection reset".to_string(),
            });
        }
        self.store.delete_version(key, version).await
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    db: Arc<Database>,
    catalog: Arc<FakeCatalog>,
    artifacts: Arc<FakeArtifacts>,
    log: Log,
    orchestrator: PublicationOrchestrator,
    collection_id: i64,
}

fn profile(id: &str, name: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.org", id),
        orcid: None,
    }
}

fn roles() -> BTreeMap<String, Role> {
    let mut roles = BTreeMap::new();
    roles.insert("alice".to_string(), Role::Owner);
    roles.insert("bob".to_string(), Role::Editor);
    roles.insert("carol".to_string(), Role::Viewer);
    roles
}

fn publishable(node_id: &str) -> NewCollection {
    NewCollection {
        node_id: node_id.to_string(),
        name: "Coastal surveys".to_string(),
        description: "Tide gauge records".to_string(),
        license: Some("CC-BY-4.0".to_string()),
        tags: vec!["ocean".to_string()],
        banner_urls: (1..=5)
            .map(|i| format!("https://img.example.org/{}.png", i))
            .collect(),
        dois: vec![DoiEntry::internal("10.1111/A"), DoiEntry::internal("10.1111/B")],
        roles: roles(),
    }
}

async fn harness(scenario: Scenario) -> Harness {
    let db = Arc::new(Database::open_in_memory().unwrap());
    db.upsert_user(profile("alice", "Alice")).await.unwrap();
    db.upsert_user(profile("bob", "Bob")).await.unwrap();

    let collection = db.create_collection(publishable("node-1")).await.unwrap();

    let log = Log::default();
    let catalog = Arc::new(FakeCatalog {
        scenario: scenario.clone(),
        log: log.clone(),
        published: Mutex::new(vec![]),
        versions: AtomicU32::new(0),
    });
    let artifacts = Arc::new(FakeArtifacts {
        store: MemoryArtifactStore::new(),
        log: log.clone(),
        save_failures: AtomicU32::new(scenario.save_failures),
        fail_delete: scenario.fail_delete,
    });

    let collaborators = Collaborators {
        status: Arc::new(RecordingStatus {
            inner: db.clone(),
            log: log.clone(),
            claim_delay: scenario.claim_delay,
        }),
        collections: db.clone(),
        users: db.clone(),
        catalog: catalog.clone(),
        artifacts: artifacts.clone(),
    };
    let options = OrchestratorOptions {
        doi_prefix: "10.1111".to_string(),
        allowed_licenses: vec!["CC-BY-4.0".to_string(), "CC0-1.0".to_string()],
        step_timeout: scenario.step_timeout.unwrap_or(Duration::from_secs(5)),
        compensation_timeout: Duration::from_secs(5),
        retry: RetryManager::new(RetryOptions {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }),
        manifest: ManifestBuilder::new(ManifestConfig::default(), "Collections Catalog"),
    };

    Harness {
        db,
        catalog,
        artifacts,
        log,
        orchestrator: PublicationOrchestrator::new(collaborators, options),
        collection_id: collection.id,
    }
}

fn publish_by(user: &str) -> PublishRequest {
    PublishRequest::new("node-1", user)
}

impl Harness {
    async fn row(&self, collection_id: i64) -> Option<PublishStatus> {
        self.db.get(collection_id).await.unwrap()
    }

    /// Seed another collection, publishable unless `edit` breaks it
    async fn add_collection(&self, node_id: &str, edit: impl FnOnce(&mut NewCollection)) -> i64 {
        let mut collection = publishable(node_id);
        edit(&mut collection);
        self.db.create_collection(collection).await.unwrap().id
    }

    /// Publish `node_id` and expect a BadRequest raised after the claim
    async fn assert_rejected_after_claim(&self, node_id: &str, collection_id: i64, needle: &str) {
        let error = self
            .orchestrator
            .publish(PublishRequest::new(node_id, "alice"))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::BadRequest);
        assert!(
            error.to_string().contains(needle),
            "{} does not mention {}",
            error,
            needle
        );
        assert_eq!(self.log.entries(), vec!["claim:publication", "finish:failed"]);
        assert_eq!(
            self.row(collection_id).await.unwrap().status,
            PublishStatusKind::Failed
        );
    }
}

// ============================================================================
// Publish
// ============================================================================

#[tokio::test]
async fn test_successful_publication() {
    let h = harness(Scenario::default()).await;

    let report = h.orchestrator.publish(publish_by("alice")).await.unwrap();

    assert_eq!(report.publish_type, PublishType::Publication);
    assert_eq!(report.status, PublishStatusKind::Completed);
    assert_eq!(report.dataset_id, DATASET_ID);
    assert_eq!(report.manifest_key, manifest_key(DATASET_ID));
    assert_eq!(
        h.log.entries(),
        vec![
            "claim:publication",
            "resolve",
            "publish",
            "save",
            "finalize:true",
            "finish:completed"
        ]
    );

    let states: Vec<SagaState> = report.transitions.iter().map(|t| t.to).collect();
    assert_eq!(
        states,
        vec![
            SagaState::Claimed,
            SagaState::ExternallyPublished,
            SagaState::ManifestWritten,
            SagaState::Finalized,
            SagaState::Completed
        ]
    );

    let row = h.row(h.collection_id).await.unwrap();
    assert_eq!(row.status, PublishStatusKind::Completed);
    assert_eq!(row.user_id, "alice");
    assert!(row.finished_at.is_some());
}

#[tokio::test]
async fn test_published_manifest_and_catalog_request() {
    let h = harness(Scenario::default()).await;

    let report = h.orchestrator.publish(publish_by("alice")).await.unwrap();

    let bytes = h
        .artifacts
        .store
        .get(&report.manifest_key, &report.manifest_version)
        .unwrap();
    assert_eq!(bytes.len() as u64, report.manifest_size);

    let manifest: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(manifest["@id"], DATASET_ID);
    assert_eq!(manifest["files"][0]["size"], report.manifest_size);
    assert_eq!(manifest["contributors"][0]["name"], "Alice");
    assert_eq!(manifest["contributors"][1]["name"], "Bob");
    assert_eq!(manifest["references"], serde_json::json!(["10.1111/A", "10.1111/B"]));

    let published = h.catalog.published.lock().unwrap();
    assert_eq!(published[0].banner_urls.len(), 4);
    assert_eq!(published[0].owner.id, "alice");
    assert_eq!(
        published[0]
            .contributors
            .iter()
            .map(|c| c.id.as_str())
            .collect::<Vec<_>>(),
        vec!["bob"]
    );
}

#[tokio::test]
async fn test_manifest_save_failure_unwinds_catalog_then_status() {
    let h = harness(Scenario {
        save_failures: u32::MAX,
        ..Default::default()
    })
    .await;

    let error = h.orchestrator.publish(publish_by("alice")).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Internal);
    assert!(!matches!(error, CollectionError::WithCompensationFailures { .. }));
    assert_eq!(h.log.count("finalize:false"), 1);
    assert_eq!(h.log.count("finish:failed"), 1);
    assert!(!h.log.entries().iter().any(|e| e.starts_with("delete:")));
    assert_eq!(
        h.log.after("publish"),
        vec!["save", "save", "save", "finalize:false", "finish:failed"]
    );
    assert_eq!(
        h.row(h.collection_id).await.unwrap().status,
        PublishStatusKind::Failed
    );
}

#[tokio::test]
async fn test_finalize_failure_deletes_manifest_version_first() {
    let h = harness(Scenario {
        fail_finalize: true,
        ..Default::default()
    })
    .await;

    let error = h.orchestrator.publish(publish_by("alice")).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Internal);

    let key = manifest_key(DATASET_ID);
    let unwound = h.log.after("finalize:true");
    assert_eq!(unwound.len(), 3);
    assert!(unwound[0].starts_with("delete:"));
    assert_eq!(unwound[1], "finalize:false");
    assert_eq!(unwound[2], "finish:failed");
    assert!(h.artifacts.store.versions(&key).is_empty());
    assert_eq!(
        h.row(h.collection_id).await.unwrap().status,
        PublishStatusKind::Failed
    );
}

#[tokio::test]
async fn test_compensation_failures_annotate_primary_error() {
    let h = harness(Scenario {
        fail_finalize: true,
        fail_delete: true,
        fail_failure_finalize: true,
        ..Default::default()
    })
    .await;

    let error = h.orchestrator.publish(publish_by("alice")).await.unwrap_err();

    match &error {
        CollectionError::WithCompensationFailures { error, summary } => {
            assert!(error.to_string().contains("503"));
            assert!(summary.contains("delete manifest"));
            assert!(summary.contains("fail catalog publication"));
        }
        other => panic!("expected annotated error, got {:?}", other),
    }
    assert_eq!(error.kind(), ErrorKind::Internal);
    assert_eq!(h.log.count("finish:failed"), 1);
    assert_eq!(
        h.row(h.collection_id).await.unwrap().status,
        PublishStatusKind::Failed
    );
}

#[tokio::test]
async fn test_transient_save_failure_is_retried() {
    let h = harness(Scenario {
        save_failures: 1,
        ..Default::default()
    })
    .await;

    let report = h.orchestrator.publish(publish_by("alice")).await.unwrap();

    assert_eq!(report.status, PublishStatusKind::Completed);
    assert_eq!(h.log.count("save"), 2);
    assert_eq!(h.log.count("publish"), 1);
}

#[tokio::test]
async fn test_publish_in_progress_conflicts() {
    let h = harness(Scenario::default()).await;
    h.db.claim(h.collection_id, "bob", PublishType::Publication)
        .await
        .unwrap();

    let error = h.orchestrator.publish(publish_by("alice")).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert!(h.log.entries().is_empty());
    let row = h.row(h.collection_id).await.unwrap();
    assert_eq!(row.status, PublishStatusKind::InProgress);
    assert_eq!(row.user_id, "bob");
}

#[tokio::test]
async fn test_publish_after_failed_attempt_succeeds() {
    let h = harness(Scenario::default()).await;
    h.db.claim(h.collection_id, "alice", PublishType::Publication)
        .await
        .unwrap();
    h.db.finish(h.collection_id, PublishStatusKind::Failed, true)
        .await
        .unwrap();

    let report = h.orchestrator.publish(publish_by("alice")).await.unwrap();

    assert_eq!(report.publish_type, PublishType::Publication);
    assert_eq!(report.status, PublishStatusKind::Completed);
}

#[tokio::test]
async fn test_republish_is_a_revision_with_new_manifest_version() {
    let h = harness(Scenario::default()).await;

    let first = h.orchestrator.publish(publish_by("alice")).await.unwrap();
    let second = h.orchestrator.publish(publish_by("alice")).await.unwrap();

    assert_eq!(first.publish_type, PublishType::Publication);
    assert_eq!(second.publish_type, PublishType::Revision);
    assert_ne!(first.manifest_version, second.manifest_version);
    assert_eq!(h.artifacts.store.versions(&second.manifest_key).len(), 2);
    assert_eq!(
        h.row(h.collection_id).await.unwrap().publish_type,
        PublishType::Revision
    );
}

#[tokio::test]
async fn test_only_owners_may_publish() {
    let h = harness(Scenario::default()).await;

    let editor = h.orchestrator.publish(publish_by("bob")).await.unwrap_err();
    let stranger = h.orchestrator.publish(publish_by("mallory")).await.unwrap_err();
    let missing = h
        .orchestrator
        .publish(PublishRequest::new("node-404", "alice"))
        .await
        .unwrap_err();

    assert_eq!(editor.kind(), ErrorKind::Forbidden);
    assert_eq!(stranger.kind(), ErrorKind::NotFound);
    assert_eq!(missing.kind(), ErrorKind::NotFound);
    assert!(h.log.entries().is_empty());
    assert!(h.row(h.collection_id).await.is_none());
}

#[tokio::test]
async fn test_untagged_collection_fails_claimed_status() {
    let h = harness(Scenario::default()).await;
    let id = h
        .add_collection("node-2", |c| c.tags = vec!["  ".to_string()])
        .await;

    h.assert_rejected_after_claim("node-2", id, "tag").await;
}

#[tokio::test]
async fn test_blank_description_fails_claimed_status() {
    let h = harness(Scenario::default()).await;
    let id = h
        .add_collection("node-2", |c| c.description = " \t ".to_string())
        .await;

    h.assert_rejected_after_claim("node-2", id, "description").await;
}

#[tokio::test]
async fn test_missing_license_fails_claimed_status() {
    let h = harness(Scenario::default()).await;
    let id = h.add_collection("node-2", |c| c.license = None).await;

    h.assert_rejected_after_claim("node-2", id, "license is required").await;
}

#[tokio::test]
async fn test_unaccepted_license_fails_claimed_status() {
    let h = harness(Scenario::default()).await;
    let id = h
        .add_collection("node-2", |c| c.license = Some("GPL-3.0".to_string()))
        .await;

    h.assert_rejected_after_claim("node-2", id, "GPL-3.0").await;
}

#[tokio::test]
async fn test_external_doi_fails_claimed_status() {
    let h = harness(Scenario::default()).await;
    let id = h
        .add_collection("node-2", |c| c.dois.push(DoiEntry::external("10.9999/X")))
        .await;

    h.assert_rejected_after_claim("node-2", id, "10.9999/X").await;
}

#[tokio::test]
async fn test_unpublished_reference_is_rejected() {
    let h = harness(Scenario {
        unpublished: vec!["10.1111/B".to_string()],
        ..Default::default()
    })
    .await;

    let error = h.orchestrator.publish(publish_by("alice")).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::BadRequest);
    assert!(error.to_string().contains("10.1111/B"));
    assert!(!error.to_string().contains("10.1111/A"));
    assert_eq!(
        h.log.entries(),
        vec!["claim:publication", "resolve", "finish:failed"]
    );
}

#[tokio::test]
async fn test_step_timeout_unwinds_claim() {
    let h = harness(Scenario {
        publish_delay: Some(Duration::from_secs(5)),
        step_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    })
    .await;

    let error = h.orchestrator.publish(publish_by("alice")).await.unwrap_err();

    assert!(matches!(error, CollectionError::Timeout { .. }));
    assert_eq!(
        h.log.entries(),
        vec!["claim:publication", "resolve", "finish:failed"]
    );
    assert_eq!(
        h.row(h.collection_id).await.unwrap().status,
        PublishStatusKind::Failed
    );
}

#[tokio::test]
async fn test_late_claim_acknowledgement_is_unwound() {
    let h = harness(Scenario {
        claim_delay: Some(Duration::from_millis(200)),
        step_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    })
    .await;

    let error = h.orchestrator.publish(publish_by("alice")).await.unwrap_err();

    assert!(
        matches!(&error, CollectionError::Timeout { operation } if operation == "claim publish status")
    );
    assert_eq!(h.log.entries(), vec!["claim:publication", "finish:failed"]);
    assert_eq!(
        h.row(h.collection_id).await.unwrap().status,
        PublishStatusKind::Failed
    );

    // The row is terminal, so the next attempt claims again instead of conflicting
    let retry = h.orchestrator.publish(publish_by("alice")).await.unwrap_err();
    assert!(matches!(retry, CollectionError::Timeout { .. }));
    assert_eq!(h.log.count("claim:publication"), 2);
}

#[tokio::test]
async fn test_late_removal_claim_is_unwound() {
    let h = harness(Scenario {
        claim_delay: Some(Duration::from_millis(200)),
        step_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    })
    .await;
    h.db.claim(h.collection_id, "alice", PublishType::Publication)
        .await
        .unwrap();
    h.db.finish(h.collection_id, PublishStatusKind::Completed, true)
        .await
        .unwrap();

    let error = h.orchestrator.unpublish(publish_by("alice")).await.unwrap_err();

    assert!(matches!(error, CollectionError::Timeout { .. }));
    assert_eq!(h.log.entries(), vec!["claim:removal", "finish:failed"]);
    let row = h.row(h.collection_id).await.unwrap();
    assert_eq!(row.publish_type, PublishType::Removal);
    assert_eq!(row.status, PublishStatusKind::Failed);
}

#[tokio::test]
async fn test_failed_finalize_status_finishes_failed_without_unwind() {
    let h = harness(Scenario {
        finalize_status: Some(CatalogStatus::Failed),
        ..Default::default()
    })
    .await;

    let error = h.orchestrator.publish(publish_by("alice")).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Internal);
    assert_eq!(h.log.after("finalize:true"), vec!["finish:failed"]);
    assert_eq!(h.artifacts.store.versions(&manifest_key(DATASET_ID)).len(), 1);
}

// ============================================================================
// Unpublish and status
// ============================================================================

#[tokio::test]
async fn test_unpublish_after_publication() {
    let h = harness(Scenario::default()).await;
    h.orchestrator.publish(publish_by("alice")).await.unwrap();

    let report = h.orchestrator.unpublish(publish_by("alice")).await.unwrap();

    assert_eq!(report.catalog_status, CatalogStatus::Removed);
    assert_eq!(report.status, PublishStatusKind::Completed);
    let row = h.row(h.collection_id).await.unwrap();
    assert_eq!(row.publish_type, PublishType::Removal);
    assert!(!row.is_published());

    let again = h.orchestrator.unpublish(publish_by("alice")).await.unwrap_err();
    assert_eq!(again.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_unpublish_never_published_conflicts() {
    let h = harness(Scenario::default()).await;

    let error = h.orchestrator.unpublish(publish_by("alice")).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert!(h.log.entries().is_empty());
}

#[tokio::test]
async fn test_unpublish_failure_marks_removal_failed() {
    let h = harness(Scenario {
        fail_unpublish: true,
        ..Default::default()
    })
    .await;
    h.orchestrator.publish(publish_by("alice")).await.unwrap();

    let error = h.orchestrator.unpublish(publish_by("alice")).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Internal);
    assert_eq!(
        h.log.after("unpublish"),
        vec!["finish:failed"]
    );
    let row = h.row(h.collection_id).await.unwrap();
    assert_eq!(row.publish_type, PublishType::Removal);
    assert_eq!(row.status, PublishStatusKind::Failed);
    assert!(row.is_published());
}

#[tokio::test]
async fn test_publish_status_visibility() {
    let h = harness(Scenario::default()).await;

    let none = h
        .orchestrator
        .publish_status("node-1", "carol")
        .await
        .unwrap_err();
    assert_eq!(none.kind(), ErrorKind::NotFound);

    h.orchestrator.publish(publish_by("alice")).await.unwrap();

    let status = h
        .orchestrator
        .publish_status("node-1", "carol")
        .await
        .unwrap();
    assert_eq!(status.status, PublishStatusKind::Completed);

    let stranger = h
        .orchestrator
        .publish_status("node-1", "mallory")
        .await
        .unwrap_err();
    assert_eq!(stranger.kind(), ErrorKind::NotFound);
}
