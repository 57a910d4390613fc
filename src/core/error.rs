//! Error handling for collection publication
//!
//! This module provides the error taxonomy surfaced to callers plus the
//! narrower error types of each collaborator, using the thiserror crate.

use thiserror::Error;

/// Taxonomy class of a [`CollectionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    BadRequest,
    Forbidden,
    Internal,
}

/// Main error type for collection operations
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("collection {collection} not found")]
    NotFound { collection: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// The triggering error of an unwound saga, annotated with the
    /// compensations that could not be completed.
    #[error("{error} (compensation failures: {summary})")]
    WithCompensationFailures {
        error: Box<CollectionError>,
        summary: String,
    },
}

impl CollectionError {
    pub fn not_found(collection: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the taxonomy class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Internal { .. } | Self::Timeout { .. } => ErrorKind::Internal,
            Self::WithCompensationFailures { error, .. } => error.kind(),
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Internal { .. } => "INTERNAL",
            Self::Timeout { .. } => "TIMEOUT",
            Self::WithCompensationFailures { error, .. } => error.code(),
        }
    }

    /// HTTP status an outer request layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Timeout { .. } => 504,
            Self::WithCompensationFailures { error, .. } => error.http_status(),
            _ => match self.kind() {
                ErrorKind::NotFound => 404,
                ErrorKind::Conflict => 409,
                ErrorKind::BadRequest => 400,
                ErrorKind::Forbidden => 403,
                ErrorKind::Internal => 500,
            },
        }
    }

    /// The error that triggered an unwind, without compensation annotations
    pub fn primary(&self) -> &CollectionError {
        match self {
            Self::WithCompensationFailures { error, .. } => error.primary(),
            other => other,
        }
    }
}

/// Errors from the publish status store
#[derive(Error, Debug)]
pub enum StatusStoreError {
    #[error("publish already in progress for collection {collection_id}")]
    AlreadyInProgress { collection_id: i64 },

    #[error("no publish status for collection {collection_id}")]
    NoPublishStatus { collection_id: i64 },

    #[error("{status} is not a terminal publish status")]
    InvalidStatus { status: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("corrupt publish status row: {0}")]
    Corrupt(String),

    #[error("database task failed: {0}")]
    Task(String),
}

/// Errors from the catalog service client
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to sign service token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("unexpected catalog response: {0}")]
    Decode(String),
}

/// Errors from the manifest artifact store
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("artifact store responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("artifact store returned no version for {key}")]
    MissingVersion { key: String },

    #[error("no version {version} stored under {key}")]
    NotFound { key: String, version: String },
}

/// Errors from manifest construction
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("manifest declares {declared} bytes but serializes to {actual}")]
    SizeMismatch { declared: u64, actual: usize },
}

/// Errors from configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("undefined environment variable: {0}")]
    UndefinedVariable(String),

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Classifies whether a failed remote call may be attempted again
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for CatalogError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Token(_) | Self::Decode(_) => false,
        }
    }
}

impl Retryable for ArtifactError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::MissingVersion { .. } | Self::NotFound { .. } => false,
        }
    }
}

impl From<StatusStoreError> for CollectionError {
    fn from(error: StatusStoreError) -> Self {
        match error {
            StatusStoreError::AlreadyInProgress { .. } => {
                Self::conflict("publish already in progress")
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<CatalogError> for CollectionError {
    fn from(error: CatalogError) -> Self {
        Self::internal(error.to_string())
    }
}

impl From<ArtifactError> for CollectionError {
    fn from(error: ArtifactError) -> Self {
        Self::internal(error.to_string())
    }
}

impl From<ManifestError> for CollectionError {
    fn from(error: ManifestError) -> Self {
        Self::internal(error.to_string())
    }
}
