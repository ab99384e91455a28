//! Shared domain enumerations: publication status, the closed category set,
//! and the fixed source-priority order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

impl Default for PostStatus {
    fn default() -> Self {
        PostStatus::Published
    }
}

impl TryFrom<&str> for PostStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            _ => Err(()),
        }
    }
}

/// The closed category set. Documents declaring anything else are rejected
/// at parse time, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Technology,
    Engineering,
    Design,
    Tutorials,
    News,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Technology,
        Category::Engineering,
        Category::Design,
        Category::Tutorials,
        Category::News,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Technology => "technology",
            Category::Engineering => "engineering",
            Category::Design => "design",
            Category::Tutorials => "tutorials",
            Category::News => "news",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category `{value}`")]
pub struct CategoryError {
    pub value: String,
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "technology" => Ok(Category::Technology),
            "engineering" => Ok(Category::Engineering),
            "design" => Ok(Category::Design),
            "tutorials" => Ok(Category::Tutorials),
            "news" => Ok(Category::News),
            _ => Err(CategoryError {
                value: value.to_string(),
            }),
        }
    }
}

/// Content origins in fixed priority order. `Remote` is authoritative,
/// `Files` is the fallback layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Remote,
    Overrides,
    Files,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Remote => "remote",
            Source::Overrides => "overrides",
            Source::Files => "files",
        }
    }

    /// Position in the priority order; lower ranks shadow higher ones.
    pub fn rank(self) -> usize {
        match self {
            Source::Remote => 0,
            Source::Overrides => 1,
            Source::Files => 2,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_defaults_to_published() {
        assert_eq!(PostStatus::default(), PostStatus::Published);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [PostStatus::Draft, PostStatus::Published, PostStatus::Archived] {
            assert_eq!(PostStatus::try_from(status.as_str()), Ok(status));
        }
        assert_eq!(PostStatus::try_from("retired"), Err(()));
    }

    #[test]
    fn category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        let error = "travel".parse::<Category>().unwrap_err();
        assert_eq!(error.value, "travel");
        assert_eq!(error.to_string(), "unknown category `travel`");
    }

    #[test]
    fn source_ranks_are_total() {
        assert!(Source::Remote.rank() < Source::Overrides.rank());
        assert!(Source::Overrides.rank() < Source::Files.rank());
    }
}
