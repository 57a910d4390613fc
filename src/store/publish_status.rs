//! Publish status rows
//!
//! The claim is a single conditional upsert: it inserts a fresh row or
//! overwrites a terminal one, and touches nothing while the existing row is
//! still in progress. SQLite serializes writers, so two claims racing from
//! different connections can never both report a changed row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use super::Database;
use crate::core::error::StatusStoreError;
use crate::core::model::{PublishStatus, PublishStatusKind, PublishType};
use crate::core::traits::PublishStatusStore;

const CLAIM_SQL: &str = "
    INSERT INTO publish_status (collection_id, type, status, user_id, started_at, finished_at)
    VALUES (?1, ?2, ?3, ?4, ?5, NULL)
    ON CONFLICT(collection_id) DO UPDATE SET
        type = excluded.type,
        status = excluded.status,
        user_id = excluded.user_id,
        started_at = excluded.started_at,
        finished_at = NULL
    WHERE publish_status.status != ?3";

const FINISH_SQL: &str =
    "UPDATE publish_status SET status = ?2, finished_at = ?3 WHERE collection_id = ?1";

const SELECT_SQL: &str = "
    SELECT collection_id, type, status, user_id, started_at, finished_at
    FROM publish_status WHERE collection_id = ?1";

fn claim(
    conn: &Connection,
    collection_id: i64,
    user_id: &str,
    publish_type: PublishType,
) -> Result<(), StatusStoreError> {
    let changed = conn.execute(
        CLAIM_SQL,
        params![
            collection_id,
            publish_type.as_str(),
            PublishStatusKind::InProgress.as_str(),
            user_id,
            Utc::now().to_rfc3339(),
        ],
    )?;

    if changed == 0 {
        return Err(StatusStoreError::AlreadyInProgress { collection_id });
    }
    Ok(())
}

fn finish(
    conn: &Connection,
    collection_id: i64,
    status: PublishStatusKind,
    must_exist: bool,
) -> Result<(), StatusStoreError> {
    if !status.is_terminal() {
        return Err(StatusStoreError::InvalidStatus {
            status: status.to_string(),
        });
    }

    let changed = conn.execute(
        FINISH_SQL,
        params![collection_id, status.as_str(), Utc::now().to_rfc3339()],
    )?;

    if changed == 0 && must_exist {
        return Err(StatusStoreError::NoPublishStatus { collection_id });
    }
    Ok(())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StatusStoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StatusStoreError::Corrupt(format!("bad timestamp {}: {}", value, e)))
}

/// Raw column values of a publish status row
struct StatusRow {
    collection_id: i64,
    publish_type: String,
    status: String,
    user_id: String,
    started_at: String,
    finished_at: Option<String>,
}

impl StatusRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            collection_id: row.get(0)?,
            publish_type: row.get(1)?,
            status: row.get(2)?,
            user_id: row.get(3)?,
            started_at: row.get(4)?,
            finished_at: row.get(5)?,
        })
    }

    fn into_status(self) -> Result<PublishStatus, StatusStoreError> {
        Ok(PublishStatus {
            collection_id: self.collection_id,
            publish_type: self.publish_type.parse().map_err(StatusStoreError::Corrupt)?,
            status: self.status.parse().map_err(StatusStoreError::Corrupt)?,
            user_id: self.user_id,
            started_at: parse_timestamp(&self.started_at)?,
            finished_at: self
                .finished_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

#[async_trait]
impl PublishStatusStore for Database {
    async fn claim(
        &self,
        collection_id: i64,
        user_id: &str,
        publish_type: PublishType,
    ) -> Result<(), StatusStoreError> {
        let user_id = user_id.to_string();
        self.call(move |conn| claim(conn, collection_id, &user_id, publish_type))
            .await?;

        debug!(collection_id, publish_type = publish_type.as_str(), "publish status claimed");
        Ok(())
    }

    async fn finish(
        &self,
        collection_id: i64,
        status: PublishStatusKind,
        must_exist: bool,
    ) -> Result<(), StatusStoreError> {
        self.call(move |conn| finish(conn, collection_id, status, must_exist))
            .await?;

        debug!(collection_id, %status, "publish status finished");
        Ok(())
    }

    async fn get(&self, collection_id: i64) -> Result<Option<PublishStatus>, StatusStoreError> {
        self.call(move |conn| {
            conn.query_row(SELECT_SQL, [collection_id], StatusRow::from_row)
                .optional()?
                .map(StatusRow::into_status)
                .transpose()
        })
        .await
    }
}
