//! Error types for the sync pipeline
//!
//! Every stage fails fast with its own error type. The orchestrator folds
//! them into [`SyncError`], which always keeps the distinguishing stage so
//! operators can tell an upstream outage from a bad record or a database
//! problem.

use spares_common::ValidationError;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Fetching the catalog from the upstream system failed
#[derive(Error, Debug)]
pub enum IngestionError {
    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {status} for page {page}: {body}")]
    Status { page: u32, status: u16, body: String },

    /// No response was received
    #[error("Upstream unreachable while fetching page {page}: {message}. Check SPARES_UPSTREAM_URL and that the integration workflow is running.")]
    Unreachable { page: u32, message: String },

    /// The body could not be interpreted as a page of records
    #[error("Malformed upstream response for page {page}: {reason}")]
    MalformedResponse { page: u32, reason: String },
}

impl IngestionError {
    /// Page index the failure happened on
    pub fn page(&self) -> u32 {
        match self {
            IngestionError::Status { page, .. }
            | IngestionError::Unreachable { page, .. }
            | IngestionError::MalformedResponse { page, .. } => *page,
        }
    }

    pub fn malformed(page: u32, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            page,
            reason: reason.into(),
        }
    }
}

/// Persistence failure in the record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}. Check DATABASE_URL and that migrations have been applied.")]
    Database(#[from] sqlx::Error),

    #[error("Failed to encode extra fields: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record was rejected before touching storage
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// The downstream report system did not accept the published table
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Report API rejected the upload with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Report API unreachable: {0}")]
    Unreachable(String),
}

/// Reading back the downstream results failed
///
/// This is never fatal to a full run; the orchestrator degrades to the
/// publish acknowledgment instead.
#[derive(Error, Debug)]
pub enum ConfirmationError {
    #[error("Report API returned HTTP {status} for results: {body}")]
    Rejected { status: u16, body: String },

    #[error("Report API unreachable while reading results: {0}")]
    Unreachable(String),
}

/// Stage-level classification of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Ingestion,
    Store,
    Publish,
    Config,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Ingestion => "ingestion",
            Self::Store => "store",
            Self::Publish => "publish",
            Self::Config => "config",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by a pipeline run
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Store failed: {0}")]
    Store(StoreError),

    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            SyncError::Validation(_) => FailureKind::Validation,
            SyncError::Ingestion(_) => FailureKind::Ingestion,
            SyncError::Store(_) => FailureKind::Store,
            SyncError::Publish(_) => FailureKind::Publish,
            SyncError::Config(_) => FailureKind::Config,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(inner) => SyncError::Validation(inner),
            other => SyncError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_validation_surfaces_as_validation() {
        let err: SyncError = StoreError::Validation(ValidationError::MissingCode).into();
        assert_eq!(err.kind(), FailureKind::Validation);
    }

    #[test]
    fn test_kinds_are_distinct() {
        let ingestion: SyncError = IngestionError::malformed(2, "not json").into();
        let publish: SyncError = PublishError::Unreachable("refused".to_string()).into();

        assert_eq!(ingestion.kind(), FailureKind::Ingestion);
        assert_eq!(publish.kind(), FailureKind::Publish);
        assert_eq!(SyncError::config("bad").kind().as_str(), "config");
    }

    #[test]
    fn test_ingestion_error_page() {
        let err = IngestionError::Status {
            page: 3,
            status: 502,
            body: String::new(),
        };
        assert_eq!(err.page(), 3);
        assert!(err.to_string().contains("HTTP 502"));
    }
}
