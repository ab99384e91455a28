//! Application services layer: resolution, merging, and the query surface.

pub mod error;
pub mod merge;
pub mod pagination;
pub mod query;
pub mod resolver;
pub mod sources;
