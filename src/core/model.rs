//! Domain types shared by the stores, clients and orchestration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Collections
// ============================================================================

/// Where a DOI is catalogued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Native to the internal catalog (carries the configured prefix)
    Internal,
    External,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(Self::Internal),
            "external" => Ok(Self::External),
            other => Err(format!("unknown datasource {}", other)),
        }
    }
}

/// A DOI held by a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoiEntry {
    pub value: String,
    pub datasource: DataSource,
}

impl DoiEntry {
    pub fn internal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datasource: DataSource::Internal,
        }
    }

    pub fn external(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datasource: DataSource::External,
        }
    }
}

/// Per-user role on a collection, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Viewer,
    Editor,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Owner => "owner",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Self::Guest),
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "owner" => Ok(Self::Owner),
            other => Err(format!("unknown role {}", other)),
        }
    }
}

/// A named, owned, ordered set of unique DOIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Internal numeric id
    pub id: i64,
    /// Public opaque identifier
    pub node_id: String,
    pub name: String,
    pub description: String,
    pub license: Option<String>,
    pub tags: Vec<String>,
    pub banner_urls: Vec<String>,
    pub dois: Vec<DoiEntry>,
    pub roles: BTreeMap<String, Role>,
}

impl Collection {
    pub fn role_of(&self, user_id: &str) -> Option<Role> {
        self.roles.get(user_id).copied()
    }

    pub fn size(&self) -> usize {
        self.dois.len()
    }

    pub fn contains_doi(&self, doi: &str) -> bool {
        self.dois.iter().any(|entry| entry.value == doi)
    }
}

/// Profile of a user taking part in a publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
}

// ============================================================================
// Publish status
// ============================================================================

/// What a publish status row records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishType {
    Publication,
    Revision,
    Removal,
}

impl PublishType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publication => "publication",
            Self::Revision => "revision",
            Self::Removal => "removal",
        }
    }
}

impl FromStr for PublishType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publication" => Ok(Self::Publication),
            "revision" => Ok(Self::Revision),
            "removal" => Ok(Self::Removal),
            other => Err(format!("unknown publish type {}", other)),
        }
    }
}

/// Lifecycle state of a publish status row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatusKind {
    InProgress,
    Completed,
    Failed,
}

impl PublishStatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for PublishStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStatusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown publish status {}", other)),
        }
    }
}

/// The single publication lifecycle record of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishStatus {
    pub collection_id: i64,
    #[serde(rename = "type")]
    pub publish_type: PublishType,
    pub status: PublishStatusKind,
    pub user_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl PublishStatus {
    /// True when the collection currently has a live catalog record
    pub fn is_published(&self) -> bool {
        match (self.publish_type, self.status) {
            (PublishType::Publication, PublishStatusKind::Completed) => true,
            (PublishType::Revision, _) => true,
            (PublishType::Removal, PublishStatusKind::Completed) => false,
            (PublishType::Removal, _) => true,
            (PublishType::Publication, _) => false,
        }
    }
}
