//! Confluo: a layered content resolution and caching engine.
//!
//! Content records arrive from prioritized sources (remote service,
//! in-memory overrides, local files), are parsed from TOML-frontmatter
//! documents, merged by fixed priority, and served through a TTL cache
//! with single-flight loading and generation-checked invalidation.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
