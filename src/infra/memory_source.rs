//! In-memory overrides source for operator-pinned documents.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::application::sources::{RawDocument, SourceAdapter, SourceError};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::types::Source;

const SOURCE: &str = "infra::memory_source";

/// Holds override documents keyed by origin. Fetches enumerate in origin
/// order, so resolution stays deterministic.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: RwLock<BTreeMap<String, String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one override. The resolver's cache is not touched
    /// here; the caller invalidates after mutating.
    pub fn upsert(&self, origin: impl Into<String>, text: impl Into<String>) {
        rw_write(&self.documents, SOURCE, "upsert").insert(origin.into(), text.into());
    }

    /// Remove one override, reporting whether it existed.
    pub fn remove(&self, origin: &str) -> bool {
        rw_write(&self.documents, SOURCE, "remove")
            .remove(origin)
            .is_some()
    }

    pub fn clear(&self) {
        rw_write(&self.documents, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.documents, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SourceAdapter for MemorySource {
    fn source(&self) -> Source {
        Source::Overrides
    }

    async fn fetch_all(&self) -> Result<Vec<RawDocument>, SourceError> {
        let documents = rw_read(&self.documents, SOURCE, "fetch_all");
        Ok(documents
            .iter()
            .map(|(origin, text)| RawDocument {
                origin: origin.clone(),
                text: text.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_all_enumerates_in_origin_order() {
        let source = MemorySource::new();
        source.upsert("b.md", "second");
        source.upsert("a.md", "first");

        let documents = source.fetch_all().await.unwrap();
        let origins: Vec<&str> = documents
            .iter()
            .map(|document| document.origin.as_str())
            .collect();
        assert_eq!(origins, ["a.md", "b.md"]);
    }

    #[tokio::test]
    async fn upsert_replaces_and_remove_reports() {
        let source = MemorySource::new();
        source.upsert("a.md", "old");
        source.upsert("a.md", "new");
        assert_eq!(source.len(), 1);

        let documents = source.fetch_all().await.unwrap();
        assert_eq!(documents[0].text, "new");

        assert!(source.remove("a.md"));
        assert!(!source.remove("a.md"));
        assert!(source.is_empty());
    }
}
