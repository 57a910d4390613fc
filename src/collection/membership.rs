//! Adding and removing DOIs on a collection

use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, info, info_span};

use super::doi::{MembershipDiff, categorize_dois, diff_membership};
use crate::core::error::CollectionError;
use crate::core::model::{Collection, Role};
use crate::core::retry::RetryManager;
use crate::core::traits::{CatalogPublisher, CollectionRepository, RecordKind};
use crate::orchestration::deadline::bounded;

/// DOIs to add to and remove from a collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoiUpdate {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

/// Applies membership updates with the add-list policy checks
pub struct MembershipService {
    collections: Arc<dyn CollectionRepository>,
    catalog: Arc<dyn CatalogPublisher>,
    doi_prefix: String,
    retry: RetryManager,
    call_timeout: Duration,
}

impl MembershipService {
    pub fn new(
        collections: Arc<dyn CollectionRepository>,
        catalog: Arc<dyn CatalogPublisher>,
        doi_prefix: impl Into<String>,
        retry: RetryManager,
        call_timeout: Duration,
    ) -> Self {
        Self {
            collections,
            catalog,
            doi_prefix: doi_prefix.into(),
            retry,
            call_timeout,
        }
    }

    /// Apply `update` to the collection on behalf of `user_id`
    pub async fn update_dois(
        &self,
        node_id: &str,
        user_id: &str,
        update: DoiUpdate,
    ) -> Result<MembershipDiff, CollectionError> {
        let span = info_span!("update_dois", collection = %node_id, user = %user_id);
        self.update_dois_inner(node_id, user_id, update)
            .instrument(span)
            .await
    }

    async fn update_dois_inner(
        &self,
        node_id: &str,
        user_id: &str,
        update: DoiUpdate,
    ) -> Result<MembershipDiff, CollectionError> {
        let collection = self.authorize(node_id, user_id).await?;

        let additions = categorize_dois(&self.doi_prefix, &update.add);
        if !additions.external.is_empty() {
            return Err(CollectionError::bad_request(format!(
                "external DOIs cannot be added to a collection: {}",
                additions.external.join(", ")
            )));
        }

        let new_dois: Vec<String> = additions
            .internal
            .iter()
            .filter(|doi| !collection.contains_doi(doi))
            .cloned()
            .collect();
        self.reject_nested_collections(&new_dois).await?;

        let removals = categorize_dois(&self.doi_prefix, &update.remove);
        let mut remove = removals.internal;
        remove.extend(removals.external);

        // Adds are judged against the membership left after removals
        let diff = diff_membership(&collection.dois, &additions.internal, &remove);
        if diff.is_noop() {
            return Ok(diff);
        }

        bounded(
            "replace collection dois",
            self.call_timeout,
            self.collections.replace_dois(collection.id, &diff.entries),
        )
        .await?;

        info!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            size = diff.entries.len(),
            "collection membership updated"
        );

        Ok(diff)
    }

    async fn authorize(&self, node_id: &str, user_id: &str) -> Result<Collection, CollectionError> {
        let collection = bounded(
            "load collection",
            self.call_timeout,
            self.collections.find_collection(node_id),
        )
        .await?
        .ok_or_else(|| CollectionError::not_found(node_id))?;

        match collection.role_of(user_id) {
            None => Err(CollectionError::not_found(node_id)),
            Some(role) if role < Role::Editor => Err(CollectionError::forbidden(
                "editing a collection requires the editor role",
            )),
            Some(_) => Ok(collection),
        }
    }

    async fn reject_nested_collections(&self, dois: &[String]) -> Result<(), CollectionError> {
        if dois.is_empty() {
            return Ok(());
        }

        let resolved = bounded(
            "resolve dois",
            self.call_timeout,
            self.retry
                .retry("resolve dois", || self.catalog.resolve_dois(dois)),
        )
        .await?;

        let nested: Vec<&str> = resolved
            .iter()
            .filter(|record| record.kind == RecordKind::Collection)
            .map(|record| record.doi.as_str())
            .collect();

        if nested.is_empty() {
            Ok(())
        } else {
            Err(CollectionError::bad_request(format!(
                "collections cannot contain other collections: {}",
                nested.join(", ")
            )))
        }
    }
}
