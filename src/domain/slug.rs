//! Utilities for deriving deterministic, URL-safe slugs from titles.
//!
//! The pipeline is fixed: lowercase, expand a known table of diacritics and
//! ligatures to ASCII, drop everything else outside `[a-z0-9 -]`, collapse
//! separator runs into single hyphens, and trim them from both ends.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Characters with a fixed ASCII expansion. Lookup happens after
/// lowercasing, so only lowercase forms are listed.
static TRANSLITERATIONS: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ('ä', "ae"),
        ('ö', "oe"),
        ('ü', "ue"),
        ('ß', "ss"),
        ('à', "a"),
        ('á', "a"),
        ('â', "a"),
        ('ã', "a"),
        ('å', "a"),
        ('è', "e"),
        ('é', "e"),
        ('ê', "e"),
        ('ë', "e"),
        ('ì', "i"),
        ('í', "i"),
        ('î', "i"),
        ('ï', "i"),
        ('ò', "o"),
        ('ó', "o"),
        ('ô', "o"),
        ('õ', "o"),
        ('ø', "o"),
        ('ù', "u"),
        ('ú', "u"),
        ('û', "u"),
        ('ç', "c"),
        ('ñ', "n"),
        ('ý', "y"),
        ('æ', "ae"),
        ('œ', "oe"),
        ('đ', "d"),
        ('ł', "l"),
    ])
});

/// Derive a URL slug from a title.
///
/// Pure and deterministic: the same title always yields the same slug. The
/// result contains only `a-z`, `0-9`, and single interior hyphens, and never
/// starts or ends with one. Titles without any usable characters produce an
/// empty string.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.to_lowercase().chars() {
        if let Some(expansion) = TRANSLITERATIONS.get(&ch) {
            flush_separator(&mut slug, &mut pending_hyphen);
            slug.push_str(expansion);
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            flush_separator(&mut slug, &mut pending_hyphen);
            slug.push(ch);
        } else if ch == '-' || ch.is_whitespace() {
            pending_hyphen = true;
        }
        // Anything else is stripped without becoming a separator.
    }

    slug
}

fn flush_separator(slug: &mut String, pending_hyphen: &mut bool) {
    if *pending_hyphen && !slug.is_empty() {
        slug.push('-');
    }
    *pending_hyphen = false;
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn expands_diacritics_through_the_table() {
        assert_eq!(slugify("Büro-Ärger?!"), "buero-aerger");
        assert_eq!(slugify("Straße"), "strasse");
        assert_eq!(slugify("Crème brûlée"), "creme-brulee");
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(slugify("a  -  b"), "a-b");
        assert_eq!(slugify("a---b"), "a-b");
        assert_eq!(slugify("a \t\n b"), "a-b");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(slugify("  hello  "), "hello");
        assert_eq!(slugify("--hello--"), "hello");
    }

    #[test]
    fn strips_punctuation_without_splitting_words() {
        assert_eq!(slugify("don't panic"), "dont-panic");
        assert_eq!(slugify("C++ in 2024!"), "c-in-2024");
    }

    #[test]
    fn unusable_titles_produce_an_empty_slug() {
        assert_eq!(slugify("???"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn is_idempotent() {
        let once = slugify("Büro-Ärger?!");
        assert_eq!(slugify(&once), once);
    }
}
