//! Slug format rules.
//!
//! A slug is the human-readable path segment of a page within one locale.
//! Slugs are lowercase ASCII letters and digits separated by single hyphens.

use crate::error::ContentError;
use regex::Regex;
use std::sync::OnceLock;

/// Longest slug accepted, in bytes.
pub const MAX_SLUG_LEN: usize = 200;

static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();

fn slug_regex() -> &'static Regex {
    SLUG_REGEX.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap())
}

/// Check that `slug` is URL-safe and within bounds.
pub fn validate(slug: &str) -> Result<(), ContentError> {
    let reason = if slug.is_empty() {
        "slug must not be empty"
    } else if slug.len() > MAX_SLUG_LEN {
        "slug is longer than 200 bytes"
    } else if !slug_regex().is_match(slug) {
        "slug may only contain lowercase letters, digits and single hyphens"
    } else {
        return Ok(());
    };

    Err(ContentError::InvalidSlug {
        slug: slug.to_string(),
        reason,
    })
}

/// Derive a slug from free text (e.g., an id or a title).
///
/// Non-alphanumeric runs collapse to a single hyphen; non-ASCII letters are
/// dropped. Returns an empty string when nothing usable remains.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}
