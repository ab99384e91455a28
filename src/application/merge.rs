//! Priority merge of per-source candidate sets.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::entities::Post;
use crate::domain::types::Source;

/// Fold per-source candidate sets into one collection keyed by slug.
///
/// `layers` must already be ordered highest authority first. The first
/// layer to contribute a slug owns the whole record; later candidates for
/// the same slug are dropped entirely, never field-merged.
pub fn merge_by_priority(layers: Vec<(Source, Vec<Post>)>) -> Vec<Post> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for (source, posts) in layers {
        for post in posts {
            if seen.contains(&post.slug) {
                debug!(
                    slug = %post.slug,
                    source = %source,
                    "Dropping shadowed candidate from lower-priority source"
                );
                continue;
            }
            seen.insert(post.slug.clone());
            merged.push(post);
        }
    }

    merged
}
