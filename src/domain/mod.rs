//! Domain layer types and invariants.

pub mod entities;
pub mod frontmatter;
pub mod reading_time;
pub mod slug;
pub mod types;
