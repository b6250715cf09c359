use crate::content::{ContentItem, ContentPatch, ContentStore, NewContentItem, Pagination, SearchPage};
use crate::error::{ContentError, Result};
use crate::i18n::{LocaleCode, LocaleRegistry};
use crate::slug;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use sqlx::FromRow;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default per-call storage timeout.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_DEFAULT_SLUG_ATTEMPTS: u32 = 50;

const SELECT_COLUMNS: &str = "id, locale, slug, title, body, published, translation_group_id, \
     published_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ContentRow {
    id: String,
    locale: String,
    slug: String,
    title: String,
    body: String,
    published: bool,
    translation_group_id: Option<String>,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContentRow {
    fn into_item(self, registry: &LocaleRegistry) -> Result<ContentItem> {
        Ok(ContentItem {
            locale: registry.parse(&self.locale)?,
            id: self.id,
            slug: self.slug,
            title: self.title,
            body: self.body,
            published: self.published,
            translation_group_id: self.translation_group_id,
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SQLite-backed content store.
///
/// `(id, locale)` is the primary key and `(slug, locale)` carries a unique
/// constraint, so the per-locale slug invariant holds even when two authors
/// race on the same slug. Application-level checks are only a fast path
/// that produces friendlier errors.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    registry: Arc<LocaleRegistry>,
    timeout: Duration,
}

impl Database {
    /// Open (or create) a database file and apply the schema.
    ///
    /// # Arguments
    /// * `database_url` - SQLite URL, e.g. `sqlite:data/content.db`
    /// * `registry` - Locales that rows may be written in
    /// * `timeout` - Bound on pool acquisition and on every store call
    ///
    /// # Errors
    /// `ContentError::Storage` for a malformed URL; connection or migration
    /// failures map through `From<sqlx::Error>`.
    #[tracing::instrument(skip(database_url, registry))]
    pub async fn connect(
        database_url: &str,
        registry: Arc<LocaleRegistry>,
        timeout: Duration,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| ContentError::Storage(format!("Invalid database URL: {e}")))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .acquire_timeout(timeout)
            .connect_with(options)
            .await?;

        debug!("database pool created");
        Self::from_pool(pool, registry, timeout).await
    }

    /// Private in-memory database, mostly for tests.
    ///
    /// A single long-lived connection is used because every SQLite
    /// `:memory:` connection is its own database.
    pub async fn in_memory(registry: Arc<LocaleRegistry>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool, registry, DEFAULT_STORAGE_TIMEOUT).await
    }

    /// Wrap an existing pool and apply the schema.
    pub async fn from_pool(
        pool: SqlitePool,
        registry: Arc<LocaleRegistry>,
        timeout: Duration,
    ) -> Result<Self> {
        let db = Self {
            pool,
            registry,
            timeout,
        };
        db.migrate().await?;
        Ok(db)
    }

    pub fn registry(&self) -> &Arc<LocaleRegistry> {
        &self.registry
    }

    /// Create tables and indexes (safe to run always).
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS content_items (
                id TEXT NOT NULL,
                locale TEXT NOT NULL,
                slug TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                published INTEGER NOT NULL DEFAULT 0,
                translation_group_id TEXT,
                published_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (id, locale),
                UNIQUE (slug, locale)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_content_items_group
             ON content_items (translation_group_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_content_items_listing
             ON content_items (locale, published, published_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Run a storage call under the configured timeout.
    async fn timed<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "storage call timed out");
                Err(ContentError::StorageTimeout {
                    operation,
                    timeout: self.timeout,
                })
            }
        }
    }

    fn rows_into_items(&self, rows: Vec<ContentRow>) -> Result<Vec<ContentItem>> {
        rows.into_iter()
            .map(|row| row.into_item(&self.registry))
            .collect()
    }

    async fn fetch(&self, id: &str, locale: &LocaleCode) -> Result<Option<ContentItem>> {
        let row: Option<ContentRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM content_items WHERE id = ?1 AND locale = ?2"
        ))
        .bind(id)
        .bind(locale.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row.into_item(&self.registry)).transpose()
    }

    /// First slug derived from `base` that no other identity owns in `locale`.
    ///
    /// Tries `base`, then `{base}-{locale}`, then `{base}-{locale}-2` and so on.
    /// Candidates over the length limit are skipped.
    async fn free_default_slug(&self, id: &str, locale: &LocaleCode, base: &str) -> Result<String> {
        let localized = format!("{base}-{locale}");
        let candidates = std::iter::once(base.to_string())
            .chain(std::iter::once(localized.clone()))
            .chain((2..=MAX_DEFAULT_SLUG_ATTEMPTS).map(|n| format!("{localized}-{n}")));

        for candidate in candidates {
            if slug::validate(&candidate).is_err() {
                continue;
            }
            let owner: Option<String> =
                sqlx::query_scalar("SELECT id FROM content_items WHERE slug = ?1 AND locale = ?2")
                    .bind(&candidate)
                    .bind(locale.as_str())
                    .fetch_optional(&self.pool)
                    .await?;
            match owner {
                Some(owner) if owner != id => {
                    debug!(slug = %candidate, owner = %owner, "default slug taken, trying next");
                }
                _ => return Ok(candidate),
            }
        }

        warn!(base, locale = %locale, "no free default slug");
        Err(duplicate_slug(base, locale))
    }

    /// Fast-path check that no other identity owns `slug` in `locale`.
    async fn ensure_slug_free(&self, id: &str, locale: &LocaleCode, slug: &str) -> Result<()> {
        let owner: Option<String> =
            sqlx::query_scalar("SELECT id FROM content_items WHERE slug = ?1 AND locale = ?2")
                .bind(slug)
                .bind(locale.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match owner {
            Some(owner) if owner != id => {
                warn!(slug, locale = %locale, owner = %owner, "slug already taken");
                Err(duplicate_slug(slug, locale))
            }
            _ => Ok(()),
        }
    }

    #[tracing::instrument(skip(self), fields(locale = %locale))]
    pub async fn get_published(&self, locale: &LocaleCode, slug: &str) -> Result<ContentItem> {
        self.timed("get_published", async {
            let row: Option<ContentRow> = sqlx::query_as(&format!(
                "SELECT {SELECT_COLUMNS} FROM content_items
                 WHERE locale = ?1 AND slug = ?2 AND published = 1"
            ))
            .bind(locale.as_str())
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

            match row {
                Some(row) => row.into_item(&self.registry),
                None => {
                    debug!("no published content");
                    Err(ContentError::not_found(locale.as_str(), slug))
                }
            }
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(locale = %locale))]
    pub async fn get(&self, id: &str, locale: &LocaleCode) -> Result<Option<ContentItem>> {
        self.timed("get", self.fetch(id, locale)).await
    }

    #[tracing::instrument(skip(self), fields(locale = %locale))]
    pub async fn find_by_slug(&self, locale: &LocaleCode, slug: &str) -> Result<Option<ContentItem>> {
        self.timed("find_by_slug", async {
            let row: Option<ContentRow> = sqlx::query_as(&format!(
                "SELECT {SELECT_COLUMNS} FROM content_items WHERE locale = ?1 AND slug = ?2"
            ))
            .bind(locale.as_str())
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

            row.map(|row| row.into_item(&self.registry)).transpose()
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(locale = %locale))]
    pub async fn search(
        &self,
        locale: &LocaleCode,
        query: &str,
        pagination: Pagination,
    ) -> Result<SearchPage> {
        self.timed("search", async {
            let query = query.trim();
            let pattern = format!("%{}%", escape_like(query));

            let total_count: i64 = sqlx::query_scalar(
                r"SELECT COUNT(*) FROM content_items
                  WHERE locale = ?1 AND published = 1
                    AND (?2 = '' OR title LIKE ?3 ESCAPE '\' OR body LIKE ?3 ESCAPE '\')",
            )
            .bind(locale.as_str())
            .bind(query)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

            let rows: Vec<ContentRow> = sqlx::query_as(&format!(
                r"SELECT {SELECT_COLUMNS} FROM content_items
                  WHERE locale = ?1 AND published = 1
                    AND (?2 = '' OR title LIKE ?3 ESCAPE '\' OR body LIKE ?3 ESCAPE '\')
                  ORDER BY COALESCE(published_at, created_at) DESC, updated_at DESC, id ASC
                  LIMIT ?4 OFFSET ?5"
            ))
            .bind(locale.as_str())
            .bind(query)
            .bind(&pattern)
            .bind(pagination.page_size as i64)
            .bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

            let items = self.rows_into_items(rows)?;
            debug!(count = items.len(), total_count, "search completed");

            Ok(SearchPage {
                items,
                total_count: total_count.max(0) as u64,
                page: pagination.page,
                page_size: pagination.page_size,
            })
        })
        .await
    }

    #[tracing::instrument(skip(self, item), fields(id = %item.id, locale = %item.locale, slug = %item.slug))]
    pub async fn create(&self, item: NewContentItem) -> Result<ContentItem> {
        slug::validate(&item.slug)?;
        self.registry.parse(item.locale.as_str())?;

        self.timed("create", async {
            self.ensure_slug_free(&item.id, &item.locale, &item.slug).await?;

            let now = Utc::now();
            let published_at = item.published.then_some(now);

            sqlx::query(
                "INSERT INTO content_items
                    (id, locale, slug, title, body, published, translation_group_id,
                     published_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            )
            .bind(&item.id)
            .bind(item.locale.as_str())
            .bind(&item.slug)
            .bind(&item.title)
            .bind(&item.body)
            .bind(item.published)
            .bind(&item.translation_group_id)
            .bind(published_at)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, &item.id, &item.locale, &item.slug))?;

            info!("content created");

            Ok(ContentItem {
                id: item.id,
                locale: item.locale,
                slug: item.slug,
                title: item.title,
                body: item.body,
                published: item.published,
                translation_group_id: item.translation_group_id,
                published_at,
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    #[tracing::instrument(skip(self, patch), fields(locale = %locale))]
    pub async fn update(
        &self,
        id: &str,
        locale: &LocaleCode,
        patch: ContentPatch,
    ) -> Result<ContentItem> {
        if let Some(slug) = &patch.slug {
            slug::validate(slug)?;
        }
        self.registry.parse(locale.as_str())?;

        self.timed("update", async {
            // A concurrent writer may create the missing translation between
            // our read and insert; the second pass then updates it instead.
            for _ in 0..2 {
                match self.fetch(id, locale).await? {
                    Some(existing) => return self.apply_patch(existing, &patch).await,
                    None => match self.insert_translation(id, locale, &patch).await {
                        Err(ContentError::DuplicateTranslation { .. }) => continue,
                        other => return other,
                    },
                }
            }

            Err(ContentError::Storage(format!(
                "translation '{id}' in locale '{locale}' changed concurrently"
            )))
        })
        .await
    }

    async fn apply_patch(&self, existing: ContentItem, patch: &ContentPatch) -> Result<ContentItem> {
        let slug = patch.slug.clone().unwrap_or_else(|| existing.slug.clone());
        if slug != existing.slug {
            self.ensure_slug_free(&existing.id, &existing.locale, &slug).await?;
        }

        let published = patch.published.unwrap_or(existing.published);
        let now = Utc::now();
        let updated = ContentItem {
            slug,
            title: patch.title.clone().unwrap_or(existing.title),
            body: patch.body.clone().unwrap_or(existing.body),
            published,
            translation_group_id: patch
                .translation_group_id
                .clone()
                .unwrap_or(existing.translation_group_id),
            published_at: existing
                .published_at
                .or_else(|| published.then_some(now)),
            updated_at: now,
            ..existing
        };

        let result = sqlx::query(
            "UPDATE content_items
             SET slug = ?1, title = ?2, body = ?3, published = ?4,
                 translation_group_id = ?5, published_at = ?6, updated_at = ?7
             WHERE id = ?8 AND locale = ?9",
        )
        .bind(&updated.slug)
        .bind(&updated.title)
        .bind(&updated.body)
        .bind(updated.published)
        .bind(&updated.translation_group_id)
        .bind(updated.published_at)
        .bind(updated.updated_at)
        .bind(&updated.id)
        .bind(updated.locale.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &updated.id, &updated.locale, &updated.slug))?;

        if result.rows_affected() == 0 {
            // Deleted between read and write
            return Err(ContentError::not_found(updated.locale.as_str(), updated.slug));
        }

        info!(slug = %updated.slug, "content updated");
        Ok(updated)
    }

    /// Create a missing translation from a patch.
    ///
    /// Unset fields fall back to safe values: the slug of the default-locale
    /// sibling (or the slugified id), empty title and body, unpublished, and
    /// the group id already used by the identity's other rows.
    async fn insert_translation(
        &self,
        id: &str,
        locale: &LocaleCode,
        patch: &ContentPatch,
    ) -> Result<ContentItem> {
        let siblings = self.list_rows_by_id(id).await?;
        let default_locale = self.registry.default_locale();

        let slug = match &patch.slug {
            Some(slug) => {
                slug::validate(slug)?;
                slug.clone()
            }
            None => {
                let base = siblings
                    .iter()
                    .find(|item| item.locale == default_locale)
                    .map(|item| item.slug.clone())
                    .unwrap_or_else(|| fallback_slug(id));
                self.free_default_slug(id, locale, &base).await?
            }
        };

        let translation_group_id = match &patch.translation_group_id {
            Some(group) => group.clone(),
            None => siblings
                .iter()
                .find_map(|item| item.translation_group_id.clone()),
        };

        let published = patch.published.unwrap_or(false);
        let item = NewContentItem {
            id: id.to_string(),
            locale: locale.clone(),
            slug,
            title: patch.title.clone().unwrap_or_default(),
            body: patch.body.clone().unwrap_or_default(),
            published,
            translation_group_id,
        };

        info!(slug = %item.slug, "creating missing translation");
        self.ensure_slug_free(&item.id, &item.locale, &item.slug).await?;

        let now = Utc::now();
        let published_at = published.then_some(now);
        sqlx::query(
            "INSERT INTO content_items
                (id, locale, slug, title, body, published, translation_group_id,
                 published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        )
        .bind(&item.id)
        .bind(item.locale.as_str())
        .bind(&item.slug)
        .bind(&item.title)
        .bind(&item.body)
        .bind(item.published)
        .bind(&item.translation_group_id)
        .bind(published_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &item.id, &item.locale, &item.slug))?;

        Ok(ContentItem {
            id: item.id,
            locale: item.locale,
            slug: item.slug,
            title: item.title,
            body: item.body,
            published: item.published,
            translation_group_id: item.translation_group_id,
            published_at,
            created_at: now,
            updated_at: now,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<u64> {
        self.timed("delete", async {
            let result = sqlx::query("DELETE FROM content_items WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await?;

            info!(rows = result.rows_affected(), "content deleted");
            Ok(result.rows_affected())
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(locale = %locale))]
    pub async fn delete_translation(&self, id: &str, locale: &LocaleCode) -> Result<bool> {
        self.timed("delete_translation", async {
            let result = sqlx::query("DELETE FROM content_items WHERE id = ?1 AND locale = ?2")
                .bind(id)
                .bind(locale.as_str())
                .execute(&self.pool)
                .await?;

            info!(removed = result.rows_affected() > 0, "translation deleted");
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn list_rows_by_id(&self, id: &str) -> Result<Vec<ContentItem>> {
        let rows: Vec<ContentRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM content_items WHERE id = ?1 ORDER BY locale"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        self.rows_into_items(rows)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_translations(&self, id: &str) -> Result<Vec<ContentItem>> {
        self.timed("list_translations", self.list_rows_by_id(id))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_by_group(&self, group_id: &str) -> Result<Vec<ContentItem>> {
        self.timed("list_by_group", async {
            let rows: Vec<ContentRow> = sqlx::query_as(&format!(
                "SELECT {SELECT_COLUMNS} FROM content_items
                 WHERE translation_group_id = ?1 ORDER BY locale, id"
            ))
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;

            self.rows_into_items(rows)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_published(&self) -> Result<Vec<ContentItem>> {
        self.timed("list_published", async {
            let rows: Vec<ContentRow> = sqlx::query_as(&format!(
                "SELECT {SELECT_COLUMNS} FROM content_items
                 WHERE published = 1 ORDER BY locale, slug"
            ))
            .fetch_all(&self.pool)
            .await?;

            self.rows_into_items(rows)
        })
        .await
    }
}

#[async_trait]
impl ContentStore for Database {
    async fn get_published(&self, locale: &LocaleCode, slug: &str) -> Result<ContentItem> {
        self.get_published(locale, slug).await
    }

    async fn get(&self, id: &str, locale: &LocaleCode) -> Result<Option<ContentItem>> {
        self.get(id, locale).await
    }

    async fn find_by_slug(&self, locale: &LocaleCode, slug: &str) -> Result<Option<ContentItem>> {
        self.find_by_slug(locale, slug).await
    }

    async fn search(
        &self,
        locale: &LocaleCode,
        query: &str,
        pagination: Pagination,
    ) -> Result<SearchPage> {
        self.search(locale, query, pagination).await
    }

    async fn create(&self, item: NewContentItem) -> Result<ContentItem> {
        self.create(item).await
    }

    async fn update(&self, id: &str, locale: &LocaleCode, patch: ContentPatch) -> Result<ContentItem> {
        self.update(id, locale, patch).await
    }

    async fn delete(&self, id: &str) -> Result<u64> {
        self.delete(id).await
    }

    async fn delete_translation(&self, id: &str, locale: &LocaleCode) -> Result<bool> {
        self.delete_translation(id, locale).await
    }

    async fn list_translations(&self, id: &str) -> Result<Vec<ContentItem>> {
        self.list_translations(id).await
    }

    async fn list_by_group(&self, group_id: &str) -> Result<Vec<ContentItem>> {
        self.list_by_group(group_id).await
    }

    async fn list_published(&self) -> Result<Vec<ContentItem>> {
        self.list_published().await
    }
}

fn duplicate_slug(slug: &str, locale: &LocaleCode) -> ContentError {
    ContentError::DuplicateSlug {
        slug: slug.to_string(),
        locale: locale.to_string(),
    }
}

/// Translate a constraint violation into the typed error it stands for.
fn write_error(err: sqlx::Error, id: &str, locale: &LocaleCode, slug: &str) -> ContentError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() || db_err.message().starts_with("UNIQUE constraint failed") {
            // SQLite names the violated columns: "content_items.slug, content_items.locale"
            if db_err.message().contains(".slug") {
                warn!(slug, locale = %locale, "slug constraint rejected write");
                return duplicate_slug(slug, locale);
            }
            return ContentError::DuplicateTranslation {
                id: id.to_string(),
                locale: locale.to_string(),
            };
        }
    }
    err.into()
}

fn escape_like(query: &str) -> String {
    query
        .replace('\\', r"\\")
        .replace('%', r"\%")
        .replace('_', r"\_")
}

fn fallback_slug(id: &str) -> String {
    let slug = slug::slugify(id);
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}
