use std::{process, sync::Arc};

use confluo::{
    application::{
        error::AppError, pagination, resolver::ContentResolver, sources::SourceAdapter,
    },
    cache::{CacheConfig, ContentCache, SystemClock},
    config,
    domain::{
        entities::{Post, PostSummary},
        types::{Category, CategoryError},
    },
    infra::{
        fs_source::FsSource, http_source::HttpSource, memory_source::MemorySource, telemetry,
    },
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::List(config::ListArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let resolver = build_resolver(&settings).await?;

    match command {
        config::Command::List(args) => run_list(&resolver, &args).await,
        config::Command::Show(args) => run_show(&resolver, &args).await,
        config::Command::Search(args) => run_search(&resolver, &args).await,
        config::Command::Stats(_) => run_stats(&resolver).await,
    }
}

async fn build_resolver(settings: &config::Settings) -> Result<ContentResolver, AppError> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    if let Some(remote) = settings.sources.remote.as_ref() {
        let http = HttpSource::new(remote.url.clone(), remote.timeout)?;
        if !http.check_availability().await {
            warn!(
                url = %remote.url,
                "Remote source failed its availability probe; resolution will tolerate its absence"
            );
        }
        adapters.push(Arc::new(http));
    }

    adapters.push(Arc::new(MemorySource::new()));
    adapters.push(Arc::new(FsSource::new(settings.sources.root.clone())));

    let cache = Arc::new(ContentCache::new(
        &CacheConfig::from(&settings.cache),
        Arc::new(SystemClock),
    ));

    Ok(ContentResolver::new(
        adapters,
        cache,
        settings.content.words_per_minute,
    ))
}

async fn run_list(resolver: &ContentResolver, args: &config::ListArgs) -> Result<(), AppError> {
    if let Some(raw) = args.category.as_deref() {
        let category: Category = raw
            .parse()
            .map_err(|err: CategoryError| AppError::validation(err.to_string()))?;
        let posts = resolver.by_category(category).await?;
        return print_json(&posts);
    }

    if let Some(tag) = args.tag.as_deref() {
        let posts = resolver.by_tag(tag).await?;
        return print_json(&posts);
    }

    if let Some(limit) = args.limit {
        let posts = resolver.recent(limit).await?;
        return print_json(&posts);
    }

    let page = if args.drafts {
        let posts = resolver.load_all(true).await?;
        let summaries: Vec<PostSummary> = posts.iter().map(Post::summary).collect();
        pagination::paginate(&summaries, args.page, args.per_page)
    } else {
        resolver.paginate(args.page, args.per_page).await?
    };
    print_json(&page)
}

async fn run_show(resolver: &ContentResolver, args: &config::ShowArgs) -> Result<(), AppError> {
    match resolver.load_by_slug(&args.slug).await? {
        Some(post) => print_json(&post),
        None => Err(AppError::NotFound),
    }
}

async fn run_search(resolver: &ContentResolver, args: &config::SearchArgs) -> Result<(), AppError> {
    let outcome = resolver.search(&args.term).await?;
    info!(
        hits = outcome.posts.len(),
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "Search completed"
    );
    print_json(&outcome.posts)
}

async fn run_stats(resolver: &ContentResolver) -> Result<(), AppError> {
    let stats = resolver.stats().await?;
    print_json(&stats)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
