//! Localized content items and the storage seam.

use crate::error::Result;
use crate::i18n::LocaleCode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One piece of content in one locale (e.g., a blog post in French).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    /// Identity shared by every locale variant of the same conceptual page
    pub id: String,
    pub locale: LocaleCode,
    /// Public path segment, unique within `locale`
    pub slug: String,
    pub title: String,
    pub body: String,
    /// Gate for public visibility
    pub published: bool,
    /// Explicit translation group; when absent the group is keyed by the
    /// default-locale slug
    pub translation_group_id: Option<String>,
    /// First time the item was published
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new content row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContentItem {
    pub id: String,
    pub locale: LocaleCode,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub translation_group_id: Option<String>,
}

impl NewContentItem {
    /// A published item with an empty body.
    pub fn new(
        id: impl Into<String>,
        locale: LocaleCode,
        slug: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            locale,
            slug: slug.into(),
            title: title.into(),
            body: String::new(),
            published: true,
            translation_group_id: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    pub fn with_translation_group(mut self, group_id: impl Into<String>) -> Self {
        self.translation_group_id = Some(group_id.into());
        self
    }
}

/// Partial update of a content row. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPatch {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub published: Option<bool>,
    /// `Some(None)` clears the explicit group
    pub translation_group_id: Option<Option<String>>,
}

impl ContentPatch {
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    pub fn translation_group_id(mut self, group_id: Option<String>) -> Self {
        self.translation_group_id = Some(group_id);
        self
    }
}

/// Page bounds after server-side normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    /// Normalize untrusted pagination input.
    ///
    /// `page` below 1 becomes 1. A missing or non-positive `page_size` becomes
    /// `default_size`; anything above `max_size` is clamped to it.
    pub fn normalize(page: Option<i64>, page_size: Option<i64>, default_size: u32, max_size: u32) -> Self {
        let max_size = max_size.max(1);
        let page = page.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
        let page_size = match page_size {
            Some(size) if size > 0 => size.min(max_size as i64) as u32,
            _ => default_size.clamp(1, max_size),
        };
        Self { page, page_size }
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPage {
    pub items: Vec<ContentItem>,
    /// Number of matching published items across all pages
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Persistence of localized content keyed by (id, locale).
///
/// Implementations must enforce `(slug, locale)` uniqueness at the storage
/// layer so concurrent writers cannot both claim a slug.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Public lookup: only published rows resolve.
    async fn get_published(&self, locale: &LocaleCode, slug: &str) -> Result<ContentItem>;

    /// Administrative lookup by identity, regardless of `published`.
    async fn get(&self, id: &str, locale: &LocaleCode) -> Result<Option<ContentItem>>;

    /// Administrative lookup of the row owning `slug` in `locale`, regardless
    /// of `published`.
    async fn find_by_slug(&self, locale: &LocaleCode, slug: &str) -> Result<Option<ContentItem>>;

    /// Published items in `locale` whose title or body matches `query`.
    /// An empty query matches every published item in the locale.
    async fn search(&self, locale: &LocaleCode, query: &str, pagination: Pagination) -> Result<SearchPage>;

    /// Insert a new (id, locale) row.
    ///
    /// # Errors
    /// * `InvalidSlug` if the slug is malformed
    /// * `DuplicateSlug` if another identity owns the slug in this locale
    /// * `DuplicateTranslation` if the (id, locale) row already exists
    async fn create(&self, item: NewContentItem) -> Result<ContentItem>;

    /// Apply `patch` to (id, locale), creating the translation when it does
    /// not exist yet.
    ///
    /// # Arguments
    /// * `id` - The content identity
    /// * `locale` - The translation to change or create
    /// * `patch` - Fields to set; `None` leaves a field as it is
    ///
    /// # Returns
    /// The row as stored after the write. A created translation fills unset
    /// fields with defaults; its defaulted slug is moved aside when taken.
    ///
    /// # Errors
    /// `DuplicateSlug` only when a caller-supplied slug belongs to another identity.
    async fn update(&self, id: &str, locale: &LocaleCode, patch: ContentPatch) -> Result<ContentItem>;

    /// Remove every locale variant of `id`. Returns the number of rows removed.
    async fn delete(&self, id: &str) -> Result<u64>;

    /// Remove the single (id, locale) variant. Returns whether a row was removed.
    async fn delete_translation(&self, id: &str, locale: &LocaleCode) -> Result<bool>;

    /// Every row sharing `id`, published or not.
    async fn list_translations(&self, id: &str) -> Result<Vec<ContentItem>>;

    /// Every row whose explicit translation group is `group_id`.
    async fn list_by_group(&self, group_id: &str) -> Result<Vec<ContentItem>>;

    /// Every published row across all locales.
    async fn list_published(&self) -> Result<Vec<ContentItem>>;
}
