//! Resolved content entities.
//!
//! A [`Post`] is constructed fresh on every resolution pass from a parsed
//! document; it is never persisted by this crate and never mutated in place.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize, Serializer};
use time::{Date, OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::domain::frontmatter::{ParseError, ParsedDocument};
use crate::domain::reading_time;
use crate::domain::slug::slugify;
use crate::domain::types::{Category, PostStatus};

pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Optional search-engine metadata authored alongside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A fully resolved content record keyed by its slug.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub slug: String,
    pub title: String,
    #[serde(serialize_with = "serialize_date")]
    pub date: Date,
    pub excerpt: String,
    pub author: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub image_alt: Option<String>,
    pub status: PostStatus,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub reading_time: u32,
    pub seo: Option<SeoMetadata>,
    pub featured: bool,
    pub views: Option<u64>,
    pub comments: Option<u64>,
}

/// Listing projection of [`Post`] without the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    #[serde(serialize_with = "serialize_date")]
    pub date: Date,
    pub excerpt: String,
    pub author: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub image_alt: Option<String>,
    pub status: PostStatus,
    pub reading_time: u32,
    pub featured: bool,
}

impl Post {
    /// Build a post from a parsed document, deriving the slug and reading
    /// time when the header does not supply them.
    pub fn from_document(
        document: ParsedDocument,
        words_per_minute: NonZeroU32,
    ) -> Result<Self, ParseError> {
        let ParsedDocument {
            origin,
            frontmatter,
            body,
        } = document;

        let slug = match frontmatter.slug.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => explicit.to_string(),
            _ => slugify(&frontmatter.title),
        };
        if slug.is_empty() {
            return Err(ParseError::invalid_field(
                &origin,
                "slug",
                "title yields an empty slug",
            ));
        }

        let reading_time = match frontmatter.reading_time {
            Some(explicit) => explicit.max(1),
            None => reading_time::estimate(&body, words_per_minute),
        };

        let published_at = frontmatter.date.midnight().assume_utc();
        let updated_at = frontmatter
            .last_modified
            .map(|date| date.midnight().assume_utc())
            .unwrap_or(published_at);

        Ok(Self {
            slug,
            title: frontmatter.title,
            date: frontmatter.date,
            excerpt: frontmatter.excerpt,
            author: frontmatter.author,
            category: frontmatter.category,
            tags: frontmatter.tags,
            image: frontmatter.image,
            image_alt: frontmatter.image_alt,
            status: frontmatter.status,
            body,
            published_at,
            updated_at,
            reading_time,
            seo: frontmatter.seo,
            featured: frontmatter.featured,
            views: frontmatter.views,
            comments: frontmatter.comments,
        })
    }

    pub fn summary(&self) -> PostSummary {
        PostSummary {
            slug: self.slug.clone(),
            title: self.title.clone(),
            date: self.date,
            excerpt: self.excerpt.clone(),
            author: self.author.clone(),
            category: self.category,
            tags: self.tags.clone(),
            image: self.image.clone(),
            image_alt: self.image_alt.clone(),
            status: self.status,
            reading_time: self.reading_time,
            featured: self.featured,
        }
    }
}

fn serialize_date<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let formatted = date.format(DATE_FORMAT).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}
