//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "confluo";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_SLUG_CACHE_LIMIT: u64 = 64;
const DEFAULT_WORDS_PER_MINUTE: u32 = 200;
const DEFAULT_CONTENT_ROOT: &str = "content";
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5000;
const DEFAULT_LIST_PER_PAGE: usize = 10;

/// Command-line arguments for the confluo binary.
#[derive(Debug, Parser)]
#[command(name = "confluo", version, about = "Confluo content resolution engine")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CONFLUO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List visible posts, paginated or filtered.
    List(ListArgs),
    /// Show one post by slug.
    Show(ShowArgs),
    /// Search the visible collection.
    Search(SearchArgs),
    /// Print collection statistics.
    Stats(StatsArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub overrides: CommonOverrides,

    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Posts per page.
    #[arg(long = "per-page", default_value_t = DEFAULT_LIST_PER_PAGE)]
    pub per_page: usize,

    /// Only posts in this category; skips pagination.
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,

    /// Only posts carrying this tag; skips pagination.
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Only the newest COUNT posts; skips pagination.
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Include draft posts; applies to the paginated listing only.
    #[arg(long)]
    pub drafts: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub overrides: CommonOverrides,

    /// Slug of the post to show.
    #[arg(value_name = "SLUG")]
    pub slug: String,
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub overrides: CommonOverrides,

    /// Term to search for.
    #[arg(value_name = "TERM")]
    pub term: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub overrides: CommonOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CommonOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the cache TTL in seconds.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the per-slug cache capacity.
    #[arg(long = "cache-slug-limit", value_name = "COUNT")]
    pub cache_slug_limit: Option<u64>,

    /// Override the reading-speed assumption in words per minute.
    #[arg(long = "words-per-minute", value_name = "COUNT")]
    pub words_per_minute: Option<u32>,

    /// Override the content root directory.
    #[arg(long = "content-root", value_name = "PATH")]
    pub content_root: Option<PathBuf>,

    /// Override the remote source base URL.
    #[arg(long = "remote-url", value_name = "URL")]
    pub remote_url: Option<String>,

    /// Override the remote request timeout in milliseconds.
    #[arg(long = "remote-timeout-ms", value_name = "MILLIS")]
    pub remote_timeout_ms: Option<u64>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub content: ContentSettings,
    pub sources: SourceSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub slug_limit: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub words_per_minute: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub root: PathBuf,
    pub remote: Option<RemoteSettings>,
}

#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("CONFLUO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::List(args)) => raw.apply_overrides(&args.overrides),
        Some(Command::Show(args)) => raw.apply_overrides(&args.overrides),
        Some(Command::Search(args)) => raw.apply_overrides(&args.overrides),
        Some(Command::Stats(args)) => raw.apply_overrides(&args.overrides),
        None => raw.apply_overrides(&CommonOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration from the process arguments, returning both for
/// downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    content: RawContentSettings,
    sources: RawSourceSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &CommonOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(limit) = overrides.cache_slug_limit {
            self.cache.slug_limit = Some(limit);
        }
        if let Some(wpm) = overrides.words_per_minute {
            self.content.words_per_minute = Some(wpm);
        }
        if let Some(root) = overrides.content_root.as_ref() {
            self.sources.root = Some(root.clone());
        }
        if let Some(url) = overrides.remote_url.as_ref() {
            self.sources
                .remote
                .get_or_insert_with(RawRemoteSettings::default)
                .url = Some(url.clone());
        }
        if let Some(timeout) = overrides.remote_timeout_ms {
            self.sources
                .remote
                .get_or_insert_with(RawRemoteSettings::default)
                .timeout_ms = Some(timeout);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            content,
            sources,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache)?;
        let content = build_content_settings(content)?;
        let sources = build_source_settings(sources)?;

        Ok(Self {
            logging,
            cache,
            content,
            sources,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let slug_limit_value = cache.slug_limit.unwrap_or(DEFAULT_SLUG_CACHE_LIMIT);
    let slug_limit_usize: usize = slug_limit_value
        .try_into()
        .map_err(|_| LoadError::invalid("cache.slug_limit", "value exceeds supported range"))?;
    let slug_limit = NonZeroUsize::new(slug_limit_usize)
        .ok_or_else(|| LoadError::invalid("cache.slug_limit", "must be greater than zero"))?;

    Ok(CacheSettings {
        ttl: Duration::from_secs(ttl_seconds),
        slug_limit,
    })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let wpm = content.words_per_minute.unwrap_or(DEFAULT_WORDS_PER_MINUTE);
    let words_per_minute = non_zero_u32(wpm.into(), "content.words_per_minute")?;
    Ok(ContentSettings { words_per_minute })
}

fn build_source_settings(sources: RawSourceSettings) -> Result<SourceSettings, LoadError> {
    let root = sources
        .root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_ROOT));
    if root.as_os_str().is_empty() {
        return Err(LoadError::invalid("sources.root", "path must not be empty"));
    }

    let remote = match sources.remote {
        Some(remote) => Some(build_remote_settings(remote)?),
        None => None,
    };

    Ok(SourceSettings { root, remote })
}

fn build_remote_settings(remote: RawRemoteSettings) -> Result<RemoteSettings, LoadError> {
    let raw_url = remote
        .url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LoadError::invalid("sources.remote.url", "url is required"))?;
    let url = Url::parse(raw_url)
        .map_err(|err| LoadError::invalid("sources.remote.url", format!("invalid url: {err}")))?;

    let timeout_ms = remote.timeout_ms.unwrap_or(DEFAULT_REMOTE_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "sources.remote.timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(RemoteSettings {
        url,
        timeout: Duration::from_millis(timeout_ms),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    ttl_seconds: Option<u64>,
    slug_limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    words_per_minute: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSourceSettings {
    root: Option<PathBuf>,
    remote: Option<RawRemoteSettings>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRemoteSettings {
    url: Option<String>,
    timeout_ms: Option<u64>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
