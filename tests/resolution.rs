//! End-to-end resolution behavior over scriptable in-memory sources:
//! layering, failure isolation, TTL expiry, invalidation, and the query
//! surface.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::Duration;
use time::macros::datetime;

use confluo::application::resolver::ContentResolver;
use confluo::application::sources::{RawDocument, SourceAdapter, SourceError};
use confluo::cache::{CacheConfig, ContentCache, ManualClock};
use confluo::domain::types::{Category, PostStatus, Source};

/// Scriptable source. Documents and the failure mode can be swapped
/// mid-test; fetches are counted so tests can assert cache behavior.
struct StubSource {
    source: Source,
    documents: RwLock<Vec<RawDocument>>,
    direct: RwLock<HashMap<String, String>>,
    fail_with: RwLock<Option<SourceError>>,
    fetch_calls: AtomicUsize,
    direct_calls: AtomicUsize,
    direct_lookup: bool,
}

impl StubSource {
    fn new(source: Source) -> Self {
        Self {
            source,
            documents: RwLock::new(Vec::new()),
            direct: RwLock::new(HashMap::new()),
            fail_with: RwLock::new(None),
            fetch_calls: AtomicUsize::new(0),
            direct_calls: AtomicUsize::new(0),
            direct_lookup: false,
        }
    }

    fn with_document(self, origin: &str, text: &str) -> Self {
        self.documents.write().unwrap().push(RawDocument {
            origin: origin.to_string(),
            text: text.to_string(),
        });
        self
    }

    fn with_direct(mut self, slug: &str, text: &str) -> Self {
        self.direct_lookup = true;
        self.direct
            .write()
            .unwrap()
            .insert(slug.to_string(), text.to_string());
        self
    }

    fn failing(self, error: SourceError) -> Self {
        *self.fail_with.write().unwrap() = Some(error);
        self
    }

    fn set_failure(&self, error: Option<SourceError>) {
        *self.fail_with.write().unwrap() = error;
    }

    fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn direct_fetches(&self) -> usize {
        self.direct_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StubSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch_all(&self) -> Result<Vec<RawDocument>, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fail_with.read().unwrap().clone() {
            return Err(error);
        }
        Ok(self.documents.read().unwrap().clone())
    }

    async fn fetch_by_key(&self, slug: &str) -> Result<Option<RawDocument>, SourceError> {
        self.direct_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .direct
            .read()
            .unwrap()
            .get(slug)
            .map(|text| RawDocument {
                origin: format!("direct:{slug}"),
                text: text.clone(),
            }))
    }

    fn supports_direct_lookup(&self) -> bool {
        self.direct_lookup
    }
}

fn document(title: &str, date: &str, extra: &str, body: &str) -> String {
    format!(
        "+++\ntitle = \"{title}\"\ndate = \"{date}\"\nexcerpt = \"About {title}\"\nauthor = \"devrel\"\ncategory = \"engineering\"\n{extra}+++\n{body}"
    )
}

fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(datetime!(2024-06-01 00:00 UTC)))
}

fn resolver_with(
    adapters: Vec<Arc<dyn SourceAdapter>>,
    clock: Arc<ManualClock>,
) -> ContentResolver {
    let cache = Arc::new(ContentCache::new(&CacheConfig::default(), clock));
    ContentResolver::new(adapters, cache, NonZeroU32::new(200).expect("wpm"))
}

#[tokio::test]
async fn higher_priority_source_owns_contested_slug() {
    let remote = Arc::new(StubSource::new(Source::Remote).with_document(
        "remote/pipelines",
        &document(
            "Shipping Pipelines",
            "2024-03-01",
            "tags = [\"remote\"]\n",
            "Remote body.",
        ),
    ));
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/pipelines.md",
        &document(
            "Shipping Pipelines",
            "2024-03-01",
            "tags = [\"files\"]\n",
            "File body.",
        ),
    ));
    let resolver = resolver_with(vec![remote, files], manual_clock());

    let posts = resolver.load_all(false).await.expect("load");
    assert_eq!(posts.len(), 1, "contested slug collapses to one record");
    assert_eq!(posts[0].slug, "shipping-pipelines");
    assert_eq!(posts[0].body, "Remote body.");
    assert_eq!(posts[0].tags, vec!["remote"], "no field-level merging");
}

#[tokio::test]
async fn registration_order_does_not_override_priority() {
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/pipelines.md",
        &document("Shipping Pipelines", "2024-03-01", "", "File body."),
    ));
    let remote = Arc::new(StubSource::new(Source::Remote).with_document(
        "remote/pipelines",
        &document("Shipping Pipelines", "2024-03-01", "", "Remote body."),
    ));

    // Files first; the resolver must still rank Remote above it.
    let resolver = resolver_with(vec![files, remote], manual_clock());

    let posts = resolver.load_all(false).await.expect("load");
    assert_eq!(posts[0].body, "Remote body.");
}

#[tokio::test]
async fn override_layer_sits_between_remote_and_files() {
    let remote = Arc::new(StubSource::new(Source::Remote).with_document(
        "remote/beta",
        &document("Beta", "2024-03-01", "", "Remote beta."),
    ));
    let overrides = Arc::new(
        StubSource::new(Source::Overrides)
            .with_document("alpha", &document("Alpha", "2024-03-02", "", "Override alpha."))
            .with_document("beta", &document("Beta", "2024-03-01", "", "Override beta.")),
    );
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/alpha.md",
        &document("Alpha", "2024-03-02", "", "File alpha."),
    ));
    let resolver = resolver_with(vec![remote, overrides, files], manual_clock());

    let posts = resolver.load_all(false).await.expect("load");
    assert_eq!(posts.len(), 2);

    let alpha = posts.iter().find(|post| post.slug == "alpha").expect("alpha");
    let beta = posts.iter().find(|post| post.slug == "beta").expect("beta");
    assert_eq!(alpha.body, "Override alpha.", "overrides beat files");
    assert_eq!(beta.body, "Remote beta.", "remote beats overrides");
}

#[tokio::test]
async fn failing_source_is_tolerated() {
    let remote = Arc::new(
        StubSource::new(Source::Remote).failing(SourceError::unavailable("connection refused")),
    );
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/alpha.md",
        &document("Alpha", "2024-03-01", "", "File alpha."),
    ));
    let resolver = resolver_with(vec![remote, files], manual_clock());

    let posts = resolver.load_all(false).await.expect("load");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].slug, "alpha");
}

#[tokio::test]
async fn all_sources_failing_surface_aggregate_error() {
    let remote =
        Arc::new(StubSource::new(Source::Remote).failing(SourceError::timeout("deadline")));
    let files =
        Arc::new(StubSource::new(Source::Files).failing(SourceError::unavailable("no root")));
    let resolver = resolver_with(vec![files.clone(), remote.clone()], manual_clock());

    let error = resolver.load_all(false).await.expect_err("must fail");
    assert_eq!(error.failures.len(), 2);
    assert_eq!(error.failures[0].source, Source::Remote, "priority order");
    assert_eq!(error.failures[1].source, Source::Files);
    assert_eq!(error.to_string(), "all 2 content sources failed");
}

#[tokio::test]
async fn no_sources_resolve_to_an_empty_collection() {
    let resolver = resolver_with(Vec::new(), manual_clock());

    let posts = resolver.load_all(false).await.expect("empty is not an error");
    assert!(posts.is_empty());
    assert_eq!(resolver.load_by_slug("anything").await.expect("load"), None);
}

#[tokio::test]
async fn sources_without_documents_resolve_to_an_empty_collection() {
    let remote = Arc::new(StubSource::new(Source::Remote));
    let files = Arc::new(StubSource::new(Source::Files));
    let resolver = resolver_with(vec![remote, files], manual_clock());

    let posts = resolver.load_all(false).await.expect("empty is not an error");
    assert!(posts.is_empty());
}

#[tokio::test]
async fn draft_posts_require_privileged_view() {
    let files = Arc::new(
        StubSource::new(Source::Files)
            .with_document(
                "posts/live.md",
                &document("Live", "2024-03-01", "", "Live body."),
            )
            .with_document(
                "posts/wip.md",
                &document("Wip", "2024-03-02", "status = \"draft\"\n", "Draft body."),
            ),
    );
    let resolver = resolver_with(vec![files], manual_clock());

    let public = resolver.load_all(false).await.expect("load");
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].slug, "live");

    let privileged = resolver.load_all(true).await.expect("load");
    assert_eq!(privileged.len(), 2);
}

#[tokio::test]
async fn archived_posts_hide_from_listings_but_resolve_by_slug() {
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/old.md",
        &document("Old", "2020-01-01", "status = \"archived\"\n", "Old body."),
    ));
    let resolver = resolver_with(vec![files], manual_clock());

    assert!(resolver.load_all(true).await.expect("load").is_empty());

    let post = resolver
        .load_by_slug("old")
        .await
        .expect("load")
        .expect("archived posts stay addressable");
    assert_eq!(post.status, PostStatus::Archived);
}

#[tokio::test]
async fn malformed_documents_are_skipped() {
    let files = Arc::new(
        StubSource::new(Source::Files)
            .with_document(
                "posts/good.md",
                &document("Good", "2024-03-01", "", "Good body."),
            )
            .with_document("posts/bad.md", "no header fence at all")
            .with_document(
                "posts/unfinished.md",
                "+++\ntitle = \"Unfinished\"\ndate = \"2024-03-01\"\n+++\nmissing fields",
            ),
    );
    let resolver = resolver_with(vec![files], manual_clock());

    let posts = resolver.load_all(false).await.expect("load");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].slug, "good");
}

#[tokio::test]
async fn collection_is_cached_until_ttl_expires() {
    let clock = manual_clock();
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/alpha.md",
        &document("Alpha", "2024-03-01", "", "File alpha."),
    ));
    let resolver = resolver_with(vec![files.clone()], clock.clone());

    resolver.load_all(false).await.expect("load");
    resolver.load_all(false).await.expect("load");
    assert_eq!(files.fetches(), 1, "second read served from cache");

    clock.advance(Duration::seconds(299));
    resolver.load_all(false).await.expect("load");
    assert_eq!(files.fetches(), 1, "entry is fresh until the ttl elapses");

    clock.advance(Duration::seconds(2));
    resolver.load_all(false).await.expect("load");
    assert_eq!(files.fetches(), 2, "stale entry forces a refetch");
}

#[tokio::test]
async fn failed_reload_is_retryable() {
    let clock = manual_clock();
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/alpha.md",
        &document("Alpha", "2024-03-01", "", "File alpha."),
    ));
    let resolver = resolver_with(vec![files.clone()], clock.clone());

    resolver.load_all(false).await.expect("load");
    clock.advance(Duration::seconds(301));

    files.set_failure(Some(SourceError::unavailable("flaky")));
    resolver.load_all(false).await.expect_err("reload fails");
    assert_eq!(files.fetches(), 2);

    // Errors are not cached; the next call retries immediately.
    files.set_failure(None);
    let posts = resolver.load_all(false).await.expect("retry succeeds");
    assert_eq!(posts.len(), 1);
    assert_eq!(files.fetches(), 3);
}

#[tokio::test]
async fn fresh_slug_entry_serves_while_sources_fail() {
    let clock = manual_clock();
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/alpha.md",
        &document("Alpha", "2024-03-01", "", "File alpha."),
    ));
    let resolver = resolver_with(vec![files.clone()], clock.clone());

    resolver.load_all(false).await.expect("load");
    clock.advance(Duration::seconds(100));
    // Served from the still-fresh collection; rewrites the slug entry now.
    resolver.load_by_slug("alpha").await.expect("load").expect("found");

    // Collection written at t=0 is stale, the slug entry from t=100 is not.
    clock.advance(Duration::seconds(201));
    files.set_failure(Some(SourceError::unavailable("down")));

    let post = resolver
        .load_by_slug("alpha")
        .await
        .expect("slug entry still fresh")
        .expect("found");
    assert_eq!(post.slug, "alpha");
    assert_eq!(files.fetches(), 1, "no fetch happened for the slug read");

    resolver.load_all(false).await.expect_err("collection reload fails");
}

#[tokio::test]
async fn absent_slug_is_a_normal_empty_result() {
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/alpha.md",
        &document("Alpha", "2024-03-01", "", "File alpha."),
    ));
    let resolver = resolver_with(vec![files.clone()], manual_clock());

    resolver.load_all(false).await.expect("load");
    let found = resolver.load_by_slug("missing").await.expect("load");
    assert_eq!(found, None);
    assert_eq!(files.fetches(), 1, "fresh collection answers absence too");
}

#[tokio::test]
async fn blank_search_term_never_touches_sources() {
    let files =
        Arc::new(StubSource::new(Source::Files).failing(SourceError::unavailable("down")));
    let resolver = resolver_with(vec![files.clone()], manual_clock());

    let outcome = resolver.search("   ").await.expect("blank search succeeds");
    assert!(outcome.posts.is_empty());
    assert_eq!(files.fetches(), 0);
}

#[tokio::test]
async fn search_matches_across_fields_case_insensitively() {
    let files = Arc::new(
        StubSource::new(Source::Files)
            .with_document(
                "posts/caching.md",
                &document("Caching Deep Dive", "2024-03-01", "", "Layered lookups."),
            )
            .with_document(
                "posts/infra.md",
                &document(
                    "Rollouts",
                    "2024-03-02",
                    "tags = [\"infrastructure\"]\n",
                    "Gradual rollouts.",
                ),
            )
            .with_document(
                "posts/other.md",
                &document("Unrelated", "2024-03-03", "", "Nothing here."),
            ),
    );
    let resolver = resolver_with(vec![files], manual_clock());

    let hits = resolver.search("CACHING").await.expect("search");
    assert_eq!(hits.posts.len(), 1);
    assert_eq!(hits.posts[0].slug, "caching-deep-dive");

    let hits = resolver.search("Infrastructure").await.expect("search");
    assert_eq!(hits.posts.len(), 1, "tags are searched too");
    assert_eq!(hits.posts[0].slug, "rollouts");
}

#[tokio::test]
async fn direct_lookup_skips_the_collection_fetch() {
    let remote = Arc::new(StubSource::new(Source::Remote).with_direct(
        "shipping-pipelines",
        &document("Shipping Pipelines", "2024-03-01", "", "Remote body."),
    ));
    let resolver = resolver_with(vec![remote.clone()], manual_clock());

    let post = resolver
        .load_by_slug("shipping-pipelines")
        .await
        .expect("load")
        .expect("found");
    assert_eq!(post.body, "Remote body.");
    assert_eq!(remote.fetches(), 0, "no full collection fetch");
    assert_eq!(remote.direct_fetches(), 1);

    // The direct hit is cached under its slug.
    resolver
        .load_by_slug("shipping-pipelines")
        .await
        .expect("load")
        .expect("found");
    assert_eq!(remote.direct_fetches(), 1);
}

#[tokio::test]
async fn direct_lookup_slug_mismatch_falls_back_to_full_resolve() {
    // The source answers the key with a document that resolves to a
    // different slug. The resolver must discard it and take the full path.
    let remote = Arc::new(
        StubSource::new(Source::Remote)
            .with_direct(
                "wanted-slug",
                &document("Different Title", "2024-03-01", "", "Wrong record."),
            )
            .with_document(
                "remote/wanted",
                &document(
                    "Wanted",
                    "2024-03-01",
                    "slug = \"wanted-slug\"\n",
                    "Right record.",
                ),
            ),
    );
    let resolver = resolver_with(vec![remote.clone()], manual_clock());

    let post = resolver
        .load_by_slug("wanted-slug")
        .await
        .expect("load")
        .expect("found");
    assert_eq!(post.body, "Right record.");
    assert_eq!(remote.fetches(), 1, "fell back to the collection load");
}

#[tokio::test]
async fn clearing_one_slug_forces_a_refetch() {
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/alpha.md",
        &document("Alpha", "2024-03-01", "", "File alpha."),
    ));
    let resolver = resolver_with(vec![files.clone()], manual_clock());

    resolver.load_all(false).await.expect("load");
    resolver.load_by_slug("alpha").await.expect("load").expect("found");
    assert_eq!(files.fetches(), 1);

    resolver.clear("alpha");
    resolver.load_by_slug("alpha").await.expect("load").expect("found");
    assert_eq!(files.fetches(), 2, "invalidation reaches the sources");
}

#[tokio::test]
async fn clear_all_forces_a_refetch() {
    let files = Arc::new(StubSource::new(Source::Files).with_document(
        "posts/alpha.md",
        &document("Alpha", "2024-03-01", "", "File alpha."),
    ));
    let resolver = resolver_with(vec![files.clone()], manual_clock());

    resolver.load_all(false).await.expect("load");
    resolver.load_all(false).await.expect("load");
    assert_eq!(files.fetches(), 1);

    resolver.clear_all();
    resolver.load_all(false).await.expect("load");
    assert_eq!(files.fetches(), 2);
}

#[tokio::test]
async fn collection_sorts_newest_first_with_slug_tiebreak() {
    let files = Arc::new(
        StubSource::new(Source::Files)
            .with_document(
                "posts/beta.md",
                &document("Beta Post", "2024-03-01", "", "b"),
            )
            .with_document(
                "posts/alpha.md",
                &document("Alpha Post", "2024-03-01", "", "a"),
            )
            .with_document(
                "posts/gamma.md",
                &document("Gamma Post", "2024-04-01", "", "c"),
            ),
    );
    let resolver = resolver_with(vec![files], manual_clock());

    let posts = resolver.load_all(false).await.expect("load");
    let slugs: Vec<&str> = posts.iter().map(|post| post.slug.as_str()).collect();
    assert_eq!(slugs, vec!["gamma-post", "alpha-post", "beta-post"]);

    let recent = resolver.recent(2).await.expect("recent");
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].slug, "gamma-post");
}

#[tokio::test]
async fn pagination_splits_summaries() {
    let files = Arc::new(
        StubSource::new(Source::Files)
            .with_document("a", &document("Alpha", "2024-03-03", "", "a"))
            .with_document("b", &document("Beta", "2024-03-02", "", "b"))
            .with_document("c", &document("Gamma", "2024-03-01", "", "c")),
    );
    let resolver = resolver_with(vec![files], manual_clock());

    let page = resolver.paginate(1, 2).await.expect("paginate");
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.descriptor.total_posts, 3);
    assert_eq!(page.descriptor.total_pages, 2);
    assert!(page.descriptor.has_next);
    assert!(!page.descriptor.has_previous);

    let page = resolver.paginate(2, 2).await.expect("paginate");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].slug, "gamma");
    assert_eq!(page.descriptor.next_page, None);
}

#[tokio::test]
async fn query_surface_reads_through_one_cached_collection() {
    let files = Arc::new(
        StubSource::new(Source::Files)
            .with_document(
                "a",
                &document("Alpha", "2024-03-01", "tags = [\"rust\"]\n", "a"),
            )
            .with_document("b", &document("Beta", "2024-03-02", "", "b")),
    );
    let resolver = resolver_with(vec![files.clone()], manual_clock());

    let by_category = resolver
        .by_category(Category::Engineering)
        .await
        .expect("by_category");
    assert_eq!(by_category.len(), 2);

    let by_tag = resolver.by_tag("rust").await.expect("by_tag");
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].slug, "alpha");

    let stats = resolver.stats().await.expect("stats");
    assert_eq!(stats.total_posts, 2);
    assert_eq!(stats.distinct_tags, 1);

    assert_eq!(files.fetches(), 1, "every query reused the cached collection");
}
