//! Collection rows, ordered DOI membership and roles

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::Database;
use crate::core::error::{CollectionError, StatusStoreError};
use crate::core::model::{Collection, DoiEntry, Role};
use crate::core::traits::CollectionRepository;

/// Fields of a collection being created
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewCollection {
    pub node_id: String,
    pub name: String,
    pub description: String,
    pub license: Option<String>,
    pub tags: Vec<String>,
    pub banner_urls: Vec<String>,
    pub dois: Vec<DoiEntry>,
    pub roles: BTreeMap<String, Role>,
}

fn encode_list(values: &[String]) -> Result<String, StatusStoreError> {
    serde_json::to_string(values).map_err(|e| StatusStoreError::Corrupt(e.to_string()))
}

fn decode_list(column: &str, value: &str) -> Result<Vec<String>, StatusStoreError> {
    serde_json::from_str(value)
        .map_err(|e| StatusStoreError::Corrupt(format!("bad {} list: {}", column, e)))
}

fn write_dois(
    tx: &Transaction<'_>,
    collection_id: i64,
    dois: &[DoiEntry],
) -> Result<(), StatusStoreError> {
    tx.execute(
        "DELETE FROM collection_dois WHERE collection_id = ?1",
        [collection_id],
    )?;

    let mut stmt = tx.prepare(
        "INSERT INTO collection_dois (collection_id, position, doi, datasource)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, entry) in dois.iter().enumerate() {
        stmt.execute(params![
            collection_id,
            position as i64,
            entry.value,
            entry.datasource.as_str()
        ])?;
    }
    Ok(())
}

fn insert_collection(conn: &mut Connection, new: &NewCollection) -> Result<i64, StatusStoreError> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO collections (node_id, name, description, license, tags, banner_urls, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.node_id,
            new.name,
            new.description,
            new.license,
            encode_list(&new.tags)?,
            encode_list(&new.banner_urls)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    let id = tx.last_insert_rowid();

    write_dois(&tx, id, &new.dois)?;
    for (user_id, role) in &new.roles {
        tx.execute(
            "INSERT INTO collection_roles (collection_id, user_id, role) VALUES (?1, ?2, ?3)",
            params![id, user_id, role.as_str()],
        )?;
    }

    tx.commit()?;
    Ok(id)
}

fn load_collection(conn: &Connection, node_id: &str) -> Result<Option<Collection>, StatusStoreError> {
    let row = conn
        .query_row(
            "SELECT id, node_id, name, description, license, tags, banner_urls
             FROM collections WHERE node_id = ?1",
            [node_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;

    let Some((id, node_id, name, description, license, tags, banner_urls)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT doi, datasource FROM collection_dois WHERE collection_id = ?1 ORDER BY position",
    )?;
    let dois = stmt
        .query_map([id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .map(|row| -> Result<DoiEntry, StatusStoreError> {
            let (value, datasource) = row?;
            Ok(DoiEntry {
                value,
                datasource: datasource.parse().map_err(StatusStoreError::Corrupt)?,
            })
        })
        .collect::<Result<Vec<_>, StatusStoreError>>()?;

    let mut stmt =
        conn.prepare("SELECT user_id, role FROM collection_roles WHERE collection_id = ?1")?;
    let roles = stmt
        .query_map([id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .map(|row| -> Result<(String, Role), StatusStoreError> {
            let (user_id, role) = row?;
            Ok((user_id, role.parse().map_err(StatusStoreError::Corrupt)?))
        })
        .collect::<Result<BTreeMap<_, _>, StatusStoreError>>()?;

    Ok(Some(Collection {
        id,
        node_id,
        name,
        description,
        license,
        tags: decode_list("tags", &tags)?,
        banner_urls: decode_list("banner_urls", &banner_urls)?,
        dois,
        roles,
    }))
}

impl Database {
    /// Insert a collection with its membership and roles
    pub async fn create_collection(&self, new: NewCollection) -> Result<Collection, CollectionError> {
        let node_id = new.node_id.clone();
        let collection = self
            .call(move |conn| {
                insert_collection(conn, &new)?;
                load_collection(conn, &new.node_id)
            })
            .await?;

        collection.ok_or_else(|| CollectionError::not_found(node_id))
    }
}

#[async_trait]
impl CollectionRepository for Database {
    async fn find_collection(&self, node_id: &str) -> Result<Option<Collection>, CollectionError> {
        let node_id = node_id.to_string();
        Ok(self.call(move |conn| load_collection(conn, &node_id)).await?)
    }

    async fn replace_dois(
        &self,
        collection_id: i64,
        dois: &[DoiEntry],
    ) -> Result<(), CollectionError> {
        let dois = dois.to_vec();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            write_dois(&tx, collection_id, &dois)?;
            tx.commit()?;
            Ok(())
        })
        .await?;
        Ok(())
    }
}
