//! Remote HTTP source adapter.
//!
//! Expects a service exposing `documents` (full listing), `documents/{slug}`
//! (single record, 404 for absent), and `health` under the configured base
//! URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::application::sources::{RawDocument, SourceAdapter, SourceError};
use crate::domain::types::Source;
use crate::infra::error::InfraError;

/// Per-request ceiling for availability probes, independent of the
/// configured fetch timeout.
const PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

#[derive(Debug, Deserialize)]
struct RemoteDocument {
    id: String,
    text: String,
}

pub struct HttpSource {
    base: Url,
    client: Client,
}

impl HttpSource {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, InfraError> {
        // Join semantics drop the last path segment unless the base ends
        // with a slash.
        let mut base = base;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(concat!("confluo/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { base, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base
            .join(path)
            .map_err(|err| SourceError::rejected(format!("invalid endpoint `{path}`: {err}")))
    }
}

fn classify(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::timeout(err.to_string())
    } else if err.is_connect() {
        SourceError::unavailable(err.to_string())
    } else if err.is_decode() {
        SourceError::malformed(err.to_string())
    } else {
        SourceError::rejected(err.to_string())
    }
}

fn reject_status(status: StatusCode) -> SourceError {
    if status.is_server_error() {
        SourceError::unavailable(format!("remote returned {status}"))
    } else {
        SourceError::rejected(format!("remote returned {status}"))
    }
}

#[async_trait]
impl SourceAdapter for HttpSource {
    fn source(&self) -> Source {
        Source::Remote
    }

    async fn fetch_all(&self) -> Result<Vec<RawDocument>, SourceError> {
        let url = self.endpoint("documents")?;
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(reject_status(status));
        }

        let documents: Vec<RemoteDocument> = response.json().await.map_err(classify)?;
        Ok(documents
            .into_iter()
            .map(|document| RawDocument {
                origin: document.id,
                text: document.text,
            })
            .collect())
    }

    async fn fetch_by_key(&self, slug: &str) -> Result<Option<RawDocument>, SourceError> {
        let url = self.endpoint(&format!("documents/{slug}"))?;
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(reject_status(status));
        }

        let document: RemoteDocument = response.json().await.map_err(classify)?;
        Ok(Some(RawDocument {
            origin: document.id,
            text: document.text,
        }))
    }

    async fn check_availability(&self) -> bool {
        let Ok(url) = self.base.join("health") else {
            return false;
        };
        match self.client.get(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn supports_direct_lookup(&self) -> bool {
        true
    }
}
