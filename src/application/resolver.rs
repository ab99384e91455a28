//! Resolution facade orchestrating fetch, parse, merge, sort, and cache.
//!
//! This is the only entry point the rest of the application consumes.
//! Source failures are isolated per adapter, parse failures per document;
//! only an all-sources failure surfaces to the caller.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::merge::merge_by_priority;
use crate::application::pagination::{self, Page};
use crate::application::query::{self, CollectionStats};
use crate::application::sources::{RawDocument, SourceAdapter, SourceError};
use crate::cache::{ContentCache, FlightGroup, Generation};
use crate::domain::entities::{Post, PostSummary};
use crate::domain::frontmatter;
use crate::domain::types::{Category, PostStatus, Source};

const METRIC_RESOLVE_MS: &str = "confluo_resolve_ms";
const METRIC_SEARCH_MS: &str = "confluo_search_ms";
const METRIC_SOURCE_FAILURE: &str = "confluo_source_failure_total";
const METRIC_DOCUMENTS_SKIPPED: &str = "confluo_documents_skipped_total";

/// Flight key for whole-collection loads. The group is keyed by operation
/// kind; only one kind exists today.
const COLLECTION_FLIGHT: &str = "collection";

type CollectionResult = Result<Arc<Vec<Post>>, AggregateLoadError>;

/// Every source failed on one load attempt. The cache is left untouched, so
/// a still-valid prior entry keeps serving reads.
#[derive(Debug, Clone, Error)]
#[error("all {} content sources failed", .failures.len())]
pub struct AggregateLoadError {
    pub failures: Vec<SourceFailure>,
}

/// One source's contribution to an [`AggregateLoadError`].
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub source: Source,
    pub error: SourceError,
}

/// Search hits plus how long the search took.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub posts: Vec<PostSummary>,
    pub elapsed: Duration,
}

/// Facade over the source adapters, the parser, the merge, and the cache.
pub struct ContentResolver {
    sources: Arc<Vec<Arc<dyn SourceAdapter>>>,
    cache: Arc<ContentCache>,
    flight: FlightGroup<&'static str, CollectionResult>,
    words_per_minute: NonZeroU32,
}

impl ContentResolver {
    /// Build a resolver over the given adapters. Adapters are reordered by
    /// their fixed source priority; callers may pass them in any order.
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        cache: Arc<ContentCache>,
        words_per_minute: NonZeroU32,
    ) -> Self {
        let mut sources = adapters;
        sources.sort_by_key(|adapter| adapter.source().rank());
        Self {
            sources: Arc::new(sources),
            cache,
            flight: FlightGroup::new(),
            words_per_minute,
        }
    }

    // ========================================================================
    // Load paths
    // ========================================================================

    /// Posts visible to a caller, date-descending. Drafts require
    /// `privileged`; archived posts are excluded from listings entirely but
    /// stay retrievable through [`ContentResolver::load_by_slug`].
    pub async fn load_all(&self, privileged: bool) -> Result<Vec<Post>, AggregateLoadError> {
        let posts = self.resolve_collection().await?;
        Ok(posts
            .iter()
            .filter(|post| post.status != PostStatus::Archived)
            .filter(|post| privileged || post.status == PostStatus::Published)
            .cloned()
            .collect())
    }

    /// Look one post up by slug. Absence is a normal empty result, never an
    /// error; drafts and archived posts are retrievable by key.
    pub async fn load_by_slug(&self, slug: &str) -> Result<Option<Post>, AggregateLoadError> {
        if let Some(post) = self.cache.get_post(slug) {
            return Ok(Some(post));
        }

        let generation = self.cache.generation();

        // A fresh collection answers authoritatively, including absence.
        if let Some(posts) = self.cache.get_collection() {
            let found = posts.iter().find(|post| post.slug == slug).cloned();
            if let Some(post) = &found {
                self.cache.set_post(generation, post.clone());
            }
            return Ok(found);
        }

        if let Some(post) = self.direct_lookup(slug, generation).await {
            return Ok(Some(post));
        }

        let posts = self.resolve_collection().await?;
        let found = posts.iter().find(|post| post.slug == slug).cloned();
        if let Some(post) = &found {
            self.cache.set_post(generation, post.clone());
        }
        Ok(found)
    }

    /// The full merged collection, drafts and archived included. Serves the
    /// fresh cache when possible; otherwise joins the single-flight load.
    async fn resolve_collection(&self) -> CollectionResult {
        if let Some(posts) = self.cache.get_collection() {
            return Ok(posts);
        }

        let sources = Arc::clone(&self.sources);
        let cache = Arc::clone(&self.cache);
        let words_per_minute = self.words_per_minute;
        self.flight
            .run(COLLECTION_FLIGHT, move || async move {
                // Re-check inside the flight: a finished leader may have
                // populated the cache while this caller queued.
                if let Some(posts) = cache.get_collection() {
                    return Ok(posts);
                }
                load_collection(sources, cache, words_per_minute).await
            })
            .await
    }

    /// Ask the authoritative source for one document without resolving the
    /// whole collection. Any failure or mismatch falls through to the full
    /// load path.
    async fn direct_lookup(&self, slug: &str, generation: Generation) -> Option<Post> {
        let adapter = self
            .sources
            .iter()
            .find(|adapter| adapter.supports_direct_lookup())?;

        let document = match adapter.fetch_by_key(slug).await {
            Ok(Some(document)) => document,
            Ok(None) => return None,
            Err(error) => {
                warn!(
                    source = %adapter.source(),
                    error = %error,
                    "Direct lookup failed; falling back to full resolve"
                );
                return None;
            }
        };

        let parsed = frontmatter::parse(&document.origin, &document.text)
            .and_then(|parsed| Post::from_document(parsed, self.words_per_minute));
        match parsed {
            Ok(post) if post.slug == slug => {
                self.cache.set_post(generation, post.clone());
                Some(post)
            }
            Ok(post) => {
                warn!(
                    requested = slug,
                    resolved = %post.slug,
                    source = %adapter.source(),
                    "Direct lookup resolved a different slug; falling back to full resolve"
                );
                None
            }
            Err(error) => {
                warn!(
                    source = %adapter.source(),
                    error = %error,
                    "Direct lookup document failed to parse"
                );
                None
            }
        }
    }

    // ========================================================================
    // Query surface
    // ========================================================================

    pub async fn by_category(
        &self,
        category: Category,
    ) -> Result<Vec<PostSummary>, AggregateLoadError> {
        let posts = self.load_all(false).await?;
        Ok(query::by_category(&posts, category))
    }

    pub async fn by_tag(&self, tag: &str) -> Result<Vec<PostSummary>, AggregateLoadError> {
        let posts = self.load_all(false).await?;
        Ok(query::by_tag(&posts, tag))
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<PostSummary>, AggregateLoadError> {
        let posts = self.load_all(false).await?;
        Ok(query::recent(&posts, limit))
    }

    /// Search the resolved collection. A blank term short-circuits without
    /// touching any source or the cache, but still reports elapsed time.
    pub async fn search(&self, term: &str) -> Result<SearchOutcome, AggregateLoadError> {
        let started_at = Instant::now();

        if term.trim().is_empty() {
            let elapsed = started_at.elapsed();
            histogram!(METRIC_SEARCH_MS).record(elapsed.as_secs_f64() * 1000.0);
            return Ok(SearchOutcome {
                posts: Vec::new(),
                elapsed,
            });
        }

        let posts = self.load_all(false).await?;
        let posts = query::search(&posts, term);
        let elapsed = started_at.elapsed();
        histogram!(METRIC_SEARCH_MS).record(elapsed.as_secs_f64() * 1000.0);
        Ok(SearchOutcome { posts, elapsed })
    }

    pub async fn paginate(
        &self,
        page: usize,
        per_page: usize,
    ) -> Result<Page<PostSummary>, AggregateLoadError> {
        let posts = self.load_all(false).await?;
        let summaries: Vec<PostSummary> = posts.iter().map(Post::summary).collect();
        Ok(pagination::paginate(&summaries, page, per_page))
    }

    pub async fn stats(&self) -> Result<CollectionStats, AggregateLoadError> {
        let posts = self.load_all(false).await?;
        Ok(query::stats(&posts))
    }

    // ========================================================================
    // Invalidation hooks for the write path
    // ========================================================================

    /// Must be called after any external mutation of one record.
    pub fn clear(&self, slug: &str) {
        self.cache.clear_post(slug);
    }

    /// Must be called after any external bulk mutation.
    pub fn clear_all(&self) {
        self.cache.clear_all();
    }
}

/// One full fetch-parse-merge-sort pass over every source.
async fn load_collection(
    sources: Arc<Vec<Arc<dyn SourceAdapter>>>,
    cache: Arc<ContentCache>,
    words_per_minute: NonZeroU32,
) -> CollectionResult {
    // Snapshot before any fetch so an invalidation racing this load keeps
    // the result out of the cache.
    let generation = cache.generation();
    let started_at = Instant::now();

    // All sources are joined before merging; arrival order is not priority
    // order, so folding results in as they complete would let a fast
    // low-priority source win slugs it must not own.
    let outcomes = join_all(sources.iter().map(|adapter| {
        let adapter = Arc::clone(adapter);
        async move { (adapter.source(), adapter.fetch_all().await) }
    }))
    .await;

    let mut layers = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (source, outcome) in outcomes {
        match outcome {
            Ok(documents) => {
                layers.push((source, parse_documents(source, documents, words_per_minute)));
            }
            Err(error) => {
                warn!(source = %source, error = %error, "Source failed; continuing without it");
                counter!(METRIC_SOURCE_FAILURE, "source" => source.as_str()).increment(1);
                failures.push(SourceFailure { source, error });
            }
        }
    }

    if !sources.is_empty() && failures.len() == sources.len() {
        return Err(AggregateLoadError { failures });
    }

    let mut posts = merge_by_priority(layers);
    posts.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.slug.cmp(&b.slug))
    });

    histogram!(METRIC_RESOLVE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

    let posts = Arc::new(posts);
    if !cache.set_collection(generation, Arc::clone(&posts)) {
        debug!("Resolved collection superseded by an invalidation; serving without caching");
    }

    Ok(posts)
}

/// Parse a source's documents, skipping the ones that fail.
fn parse_documents(
    source: Source,
    documents: Vec<RawDocument>,
    words_per_minute: NonZeroU32,
) -> Vec<Post> {
    let mut posts = Vec::with_capacity(documents.len());
    for document in documents {
        match frontmatter::parse(&document.origin, &document.text)
            .and_then(|parsed| Post::from_document(parsed, words_per_minute))
        {
            Ok(post) => posts.push(post),
            Err(error) => {
                warn!(source = %source, error = %error, "Skipping document that failed to parse");
                counter!(METRIC_DOCUMENTS_SKIPPED, "source" => source.as_str()).increment(1);
            }
        }
    }
    posts
}
