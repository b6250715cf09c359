//! Locale-scoped content identity and slug resolution.
//!
//! A content identity has one row per locale, each with its own public slug.
//! Requests resolve `(locale, slug)` to exactly one published row, alias-backed
//! sections map translated slugs back to a canonical one, and the path
//! enumerator lists every page a static build must render.

pub mod alias;
pub mod api;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod groups;
pub mod i18n;
pub mod pages;
pub mod paths;
pub mod retry;
pub mod slug;

pub use error::{ContentError, Result};
