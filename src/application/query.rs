//! Query operations over an already-resolved collection.
//!
//! Everything here is a pure function of the post slice it is given; cache
//! and source concerns live in the resolver.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::entities::{Post, PostSummary};
use crate::domain::types::Category;

/// Aggregate statistics over a resolved collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionStats {
    pub total_posts: usize,
    pub distinct_categories: usize,
    pub distinct_tags: usize,
    pub average_reading_time: f64,
}

pub fn by_category(posts: &[Post], category: Category) -> Vec<PostSummary> {
    posts
        .iter()
        .filter(|post| post.category == category)
        .map(Post::summary)
        .collect()
}

/// Exact tag match, case-sensitive as authored.
pub fn by_tag(posts: &[Post], tag: &str) -> Vec<PostSummary> {
    posts
        .iter()
        .filter(|post| post.tags.iter().any(|candidate| candidate == tag))
        .map(Post::summary)
        .collect()
}

/// First `limit` posts in the slice's existing order.
pub fn recent(posts: &[Post], limit: usize) -> Vec<PostSummary> {
    posts.iter().take(limit).map(Post::summary).collect()
}

/// Case-insensitive substring search across title, excerpt, body, and tags.
/// A blank term matches nothing.
pub fn search(posts: &[Post], term: &str) -> Vec<PostSummary> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    posts
        .iter()
        .filter(|post| {
            post.title.to_lowercase().contains(&needle)
                || post.excerpt.to_lowercase().contains(&needle)
                || post.body.to_lowercase().contains(&needle)
                || post
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&needle))
        })
        .map(Post::summary)
        .collect()
}

pub fn stats(posts: &[Post]) -> CollectionStats {
    let total_posts = posts.len();
    let categories: HashSet<Category> = posts.iter().map(|post| post.category).collect();
    let tags: HashSet<&str> = posts
        .iter()
        .flat_map(|post| post.tags.iter().map(String::as_str))
        .collect();
    let average_reading_time = if total_posts == 0 {
        0.0
    } else {
        let total: u64 = posts.iter().map(|post| u64::from(post.reading_time)).sum();
        total as f64 / total_posts as f64
    };

    CollectionStats {
        total_posts,
        distinct_categories: categories.len(),
        distinct_tags: tags.len(),
        average_reading_time,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;
    use crate::domain::types::PostStatus;

    fn post(slug: &str, category: Category, tags: &[&str], reading_time: u32) -> Post {
        Post {
            slug: slug.to_string(),
            title: format!("Title {slug}"),
            date: date!(2024 - 01 - 01),
            excerpt: format!("Excerpt for {slug}"),
            author: "a".to_string(),
            category,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            image: None,
            image_alt: None,
            status: PostStatus::Published,
            body: format!("Body of {slug} mentioning caching"),
            published_at: datetime!(2024-01-01 00:00 UTC),
            updated_at: datetime!(2024-01-01 00:00 UTC),
            reading_time,
            seo: None,
            featured: false,
            views: None,
            comments: None,
        }
    }

    fn fixture() -> Vec<Post> {
        vec![
            post("alpha", Category::Engineering, &["Rust", "cache"], 4),
            post("beta", Category::Engineering, &["rust"], 6),
            post("gamma", Category::News, &[], 2),
        ]
    }

    #[test]
    fn filters_by_category() {
        let posts = fixture();
        let summaries = by_category(&posts, Category::Engineering);
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.category == Category::Engineering));
    }

    #[test]
    fn tag_filter_is_case_sensitive() {
        let posts = fixture();
        assert_eq!(by_tag(&posts, "rust").len(), 1);
        assert_eq!(by_tag(&posts, "Rust").len(), 1);
        assert_eq!(by_tag(&posts, "RUST").len(), 0);
    }

    #[test]
    fn recent_takes_the_leading_slice() {
        let posts = fixture();
        let summaries = recent(&posts, 2);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].slug, "alpha");

        assert_eq!(recent(&posts, 99).len(), 3);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let posts = fixture();

        assert_eq!(search(&posts, "TITLE ALPHA").len(), 1);
        assert_eq!(search(&posts, "caching").len(), 3);
        assert_eq!(search(&posts, "RUST").len(), 2, "tag matches too");
        assert!(search(&posts, "absent-term").is_empty());
    }

    #[test]
    fn blank_search_terms_match_nothing() {
        let posts = fixture();
        assert!(search(&posts, "").is_empty());
        assert!(search(&posts, "   ").is_empty());
    }

    #[test]
    fn stats_cover_the_whole_collection() {
        let stats = stats(&fixture());

        assert_eq!(stats.total_posts, 3);
        assert_eq!(stats.distinct_categories, 2);
        assert_eq!(stats.distinct_tags, 3, "tag case variants stay distinct");
        assert!((stats.average_reading_time - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stats_on_an_empty_collection_are_zero() {
        let stats = stats(&[]);
        assert_eq!(stats.total_posts, 0);
        assert_eq!(stats.average_reading_time, 0.0);
    }
}
