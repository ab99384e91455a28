//! Reading-time estimation from body text.

use std::num::NonZeroU32;

/// Count non-empty whitespace-separated tokens.
pub fn word_count(body: &str) -> usize {
    body.split_whitespace().count()
}

/// Estimated reading time in whole minutes, never below one.
pub fn estimate(body: &str, words_per_minute: NonZeroU32) -> u32 {
    let words = word_count(body);
    let minutes = words.div_ceil(words_per_minute.get() as usize);
    minutes.max(1) as u32
}
