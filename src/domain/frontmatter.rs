//! Frontmatter parsing for raw documents.
//!
//! A document is a `+++` fence line, a TOML header, a closing `+++` fence
//! line, and the body. Parsing either yields a fully validated
//! [`ParsedDocument`] or a typed [`ParseError`] naming the offending origin;
//! partially populated records are never produced.

use serde::Deserialize;
use thiserror::Error;
use time::{Date, Month};

use crate::domain::entities::{DATE_FORMAT, SeoMetadata};
use crate::domain::types::{Category, CategoryError, PostStatus};

const FENCE: &str = "+++";

/// Errors raised while parsing a single document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{origin}: document does not start with a `+++` header fence")]
    MissingHeader { origin: String },
    #[error("{origin}: header fence `+++` is never closed")]
    UnterminatedHeader { origin: String },
    #[error("{origin}: invalid header: {reason}")]
    InvalidHeader { origin: String, reason: String },
    #[error("{origin}: missing required field `{field}`")]
    MissingField { origin: String, field: &'static str },
    #[error("{origin}: invalid value for `{field}`: {reason}")]
    InvalidField {
        origin: String,
        field: &'static str,
        reason: String,
    },
    #[error("{origin}: {source}")]
    Category {
        origin: String,
        #[source]
        source: CategoryError,
    },
}

impl ParseError {
    fn missing_header(origin: &str) -> Self {
        Self::MissingHeader {
            origin: origin.to_string(),
        }
    }

    fn unterminated_header(origin: &str) -> Self {
        Self::UnterminatedHeader {
            origin: origin.to_string(),
        }
    }

    fn invalid_header(origin: &str, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            origin: origin.to_string(),
            reason: reason.into(),
        }
    }

    fn missing_field(origin: &str, field: &'static str) -> Self {
        Self::MissingField {
            origin: origin.to_string(),
            field,
        }
    }

    pub(crate) fn invalid_field(
        origin: &str,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            origin: origin.to_string(),
            field,
            reason: reason.into(),
        }
    }
}

/// Validated header metadata for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    pub title: String,
    pub date: Date,
    pub excerpt: String,
    pub author: String,
    pub category: Category,
    pub slug: Option<String>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub image_alt: Option<String>,
    pub status: PostStatus,
    pub seo: Option<SeoMetadata>,
    pub reading_time: Option<u32>,
    pub last_modified: Option<Date>,
    pub featured: bool,
    pub views: Option<u64>,
    pub comments: Option<u64>,
}

/// A document split into validated metadata and its raw body text.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub origin: String,
    pub frontmatter: Frontmatter,
    pub body: String,
}

/// Parse one raw document identified by `origin`.
pub fn parse(origin: &str, text: &str) -> Result<ParsedDocument, ParseError> {
    let (header, body) = split_document(origin, text)?;
    let raw: RawHeader = toml::from_str(header)
        .map_err(|err| ParseError::invalid_header(origin, err.message()))?;
    let frontmatter = Frontmatter::from_raw(origin, raw)?;

    Ok(ParsedDocument {
        origin: origin.to_string(),
        frontmatter,
        body: body.to_string(),
    })
}

/// Split a document into its header and body slices.
///
/// The closing fence must sit alone on its own line; a `+++` embedded in
/// header text stays part of the header.
fn split_document<'a>(origin: &str, text: &'a str) -> Result<(&'a str, &'a str), ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text
        .strip_prefix(FENCE)
        .ok_or_else(|| ParseError::missing_header(origin))?;
    let rest = match rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) {
        Some(rest) => rest,
        None if rest.is_empty() => return Err(ParseError::unterminated_header(origin)),
        None => return Err(ParseError::missing_header(origin)),
    };

    // Empty header: the closing fence immediately follows the opening one.
    if let Some(after) = rest.strip_prefix(FENCE) {
        if let Some(body) = fence_line_end(after) {
            return Ok(("", body));
        }
    }

    for (index, _) in rest.match_indices("\n+++") {
        let after = &rest[index + 1 + FENCE.len()..];
        if let Some(body) = fence_line_end(after) {
            let header = rest[..index].strip_suffix('\r').unwrap_or(&rest[..index]);
            return Ok((header, body));
        }
    }

    Err(ParseError::unterminated_header(origin))
}

/// Body following a fence, or `None` when the fence line continues.
fn fence_line_end(after: &str) -> Option<&str> {
    let after = after.strip_prefix('\r').unwrap_or(after);
    if after.is_empty() {
        return Some("");
    }
    after.strip_prefix('\n')
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawHeader {
    title: Option<String>,
    date: Option<DateInput>,
    excerpt: Option<String>,
    author: Option<String>,
    category: Option<String>,
    slug: Option<String>,
    tags: Vec<String>,
    image: Option<String>,
    image_alt: Option<String>,
    status: Option<String>,
    seo: Option<SeoMetadata>,
    reading_time: Option<u32>,
    last_modified: Option<DateInput>,
    featured: Option<bool>,
    views: Option<u64>,
    comments: Option<u64>,
}

/// Dates arrive either as `"2024-01-15"` strings or bare TOML dates.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateInput {
    Text(String),
    Stamp(toml::value::Datetime),
}

impl DateInput {
    fn resolve(&self, origin: &str, field: &'static str) -> Result<Date, ParseError> {
        match self {
            DateInput::Text(text) => Date::parse(text.trim(), DATE_FORMAT)
                .map_err(|err| ParseError::invalid_field(origin, field, err.to_string())),
            DateInput::Stamp(stamp) => {
                let date = stamp.date.ok_or_else(|| {
                    ParseError::invalid_field(origin, field, "datetime has no date part")
                })?;
                let month = Month::try_from(date.month)
                    .map_err(|err| ParseError::invalid_field(origin, field, err.to_string()))?;
                Date::from_calendar_date(i32::from(date.year), month, date.day)
                    .map_err(|err| ParseError::invalid_field(origin, field, err.to_string()))
            }
        }
    }
}

impl Frontmatter {
    fn from_raw(origin: &str, raw: RawHeader) -> Result<Self, ParseError> {
        let title = required(origin, "title", raw.title)?;
        let date = raw
            .date
            .ok_or_else(|| ParseError::missing_field(origin, "date"))?
            .resolve(origin, "date")?;
        let excerpt = required(origin, "excerpt", raw.excerpt)?;
        let author = required(origin, "author", raw.author)?;
        let category = required(origin, "category", raw.category)?
            .parse::<Category>()
            .map_err(|source| ParseError::Category {
                origin: origin.to_string(),
                source,
            })?;
        let status = match raw.status {
            None => PostStatus::default(),
            Some(value) => PostStatus::try_from(value.as_str()).map_err(|()| {
                ParseError::invalid_field(origin, "status", format!("unknown status `{value}`"))
            })?,
        };
        let last_modified = match raw.last_modified {
            Some(input) => Some(input.resolve(origin, "lastModified")?),
            None => None,
        };

        Ok(Self {
            title,
            date,
            excerpt,
            author,
            category,
            slug: raw.slug,
            tags: raw.tags,
            image: raw.image,
            image_alt: raw.image_alt,
            status,
            seo: raw.seo,
            reading_time: raw.reading_time,
            last_modified,
            featured: raw.featured.unwrap_or(false),
            views: raw.views,
            comments: raw.comments,
        })
    }
}

/// Required string fields must be present and non-blank.
fn required(origin: &str, field: &'static str, value: Option<String>) -> Result<String, ParseError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ParseError::missing_field(origin, field)),
    }
}
