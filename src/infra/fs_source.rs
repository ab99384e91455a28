//! Filesystem source adapter reading manifest-listed documents.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use crate::application::sources::{RawDocument, SourceAdapter, SourceError};
use crate::domain::types::Source;

/// Manifest expected at the root of the content directory.
pub const MANIFEST_FILE: &str = "manifest.toml";

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    documents: Vec<String>,
}

/// Serves documents listed by a TOML manifest under a root directory.
///
/// A missing manifest is an empty layer, not a failure; a present but
/// unreadable or invalid manifest fails the whole source. Individual
/// entries that cannot be read are skipped.
#[derive(Debug)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn read_manifest(&self) -> Result<Option<Manifest>, SourceError> {
        let path = self.root.join(MANIFEST_FILE);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(SourceError::unavailable(format!(
                    "failed to read {}: {err}",
                    path.display()
                )));
            }
        };
        let manifest = toml::from_str(&text).map_err(|err| {
            SourceError::malformed(format!("invalid manifest: {}", err.message()))
        })?;
        Ok(Some(manifest))
    }

    /// Resolve a manifest entry under the root, refusing escapes.
    fn resolve(&self, entry: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(entry);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(SourceError::rejected(format!(
                "manifest entry `{entry}` escapes the content root"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl SourceAdapter for FsSource {
    fn source(&self) -> Source {
        Source::Files
    }

    async fn fetch_all(&self) -> Result<Vec<RawDocument>, SourceError> {
        let Some(manifest) = self.read_manifest().await? else {
            return Ok(Vec::new());
        };

        let mut documents = Vec::with_capacity(manifest.documents.len());
        for entry in &manifest.documents {
            let path = match self.resolve(entry) {
                Ok(path) => path,
                Err(error) => {
                    warn!(entry = %entry, error = %error, "Skipping manifest entry");
                    continue;
                }
            };
            match fs::read_to_string(&path).await {
                Ok(text) => documents.push(RawDocument {
                    origin: entry.clone(),
                    text,
                }),
                Err(error) => {
                    warn!(entry = %entry, error = %error, "Skipping unreadable manifest entry");
                }
            }
        }
        Ok(documents)
    }

    async fn check_availability(&self) -> bool {
        fs::metadata(&self.root).await.is_ok()
    }
}
