//! User profiles

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};

use super::Database;
use crate::core::error::CollectionError;
use crate::core::model::UserProfile;
use crate::core::traits::UserDirectory;

impl Database {
    /// Insert or update a user profile
    pub async fn upsert_user(&self, profile: UserProfile) -> Result<(), CollectionError> {
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, orcid) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name, email = excluded.email, orcid = excluded.orcid",
                params![profile.id, profile.name, profile.email, profile.orcid],
            )?;
            Ok(())
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for Database {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, CollectionError> {
        let user_id = user_id.to_string();
        let profile = self
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, name, email, orcid FROM users WHERE id = ?1",
                        [&user_id],
                        |row| {
                            Ok(UserProfile {
                                id: row.get(0)?,
                                name: row.get(1)?,
                                email: row.get(2)?,
                                orcid: row.get(3)?,
                            })
                        },
                    )
                    .optional()?)
            })
            .await?;
        Ok(profile)
    }
}
