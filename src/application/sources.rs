//! Source adapter traits describing content origins.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::types::Source;

/// One raw document as fetched from a source, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Identifier used in diagnostics: a relative path, URL, or key.
    pub origin: String,
    pub text: String,
}

#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("source unavailable: {detail}")]
    Unavailable { detail: String },
    #[error("source timed out: {detail}")]
    Timeout { detail: String },
    #[error("source rejected the request: {detail}")]
    Rejected { detail: String },
    #[error("source returned malformed data: {detail}")]
    Malformed { detail: String },
}

impl SourceError {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::Unavailable {
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::Timeout {
            detail: detail.into(),
        }
    }

    pub fn rejected(detail: impl Into<String>) -> Self {
        Self::Rejected {
            detail: detail.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }
}

/// Contract implemented by every content origin.
///
/// Failure isolation happens above this trait: one adapter's error never
/// aborts resolution unless every adapter fails.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The fixed origin this adapter serves.
    fn source(&self) -> Source;

    /// Fetch every candidate document this origin currently holds.
    async fn fetch_all(&self) -> Result<Vec<RawDocument>, SourceError>;

    /// Fetch one document by slug, for origins that address documents
    /// directly. `Ok(None)` is authoritative absence.
    async fn fetch_by_key(&self, slug: &str) -> Result<Option<RawDocument>, SourceError> {
        let _ = slug;
        Ok(None)
    }

    /// Pre-flight probe with a bounded timeout.
    async fn check_availability(&self) -> bool {
        true
    }

    /// Whether [`SourceAdapter::fetch_by_key`] is implemented.
    fn supports_direct_lookup(&self) -> bool {
        false
    }
}
