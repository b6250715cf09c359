//! Request-time page resolution.
//!
//! Every routed section resolves the same way: the raw locale goes through
//! the locale resolver, then the public slug is looked up in the section's
//! source. Stored sections return the published row; alias-backed sections
//! return the canonical slug the page is computed from.

use crate::alias::SlugAliasTable;
use crate::content::{ContentItem, ContentStore};
use crate::error::Result;
use crate::i18n::{LocaleCode, LocaleRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Where a section's pages come from.
#[derive(Clone)]
pub enum ContentSource {
    /// Rows stored per locale; the stored slug is the public slug.
    Stored(Arc<dyn ContentStore>),
    /// Computed pages; the public slug is the locale's alias of a canonical slug.
    Aliased(Arc<SlugAliasTable>),
}

/// What a resolved page renders from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageContent {
    Stored { item: ContentItem },
    Computed { canonical_slug: String },
}

/// A request after locale and slug resolution.
///
/// `locale` and `slug` are the resolved values; canonical links and SEO
/// metadata must be built from these, never from the raw request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPage {
    pub locale: LocaleCode,
    pub slug: String,
    #[serde(flatten)]
    pub content: PageContent,
}

/// Resolves (raw locale, public slug) requests for one section.
#[derive(Clone)]
pub struct PageResolver {
    registry: Arc<LocaleRegistry>,
    source: ContentSource,
}

impl PageResolver {
    pub fn new(registry: Arc<LocaleRegistry>, source: ContentSource) -> Self {
        Self { registry, source }
    }

    pub fn registry(&self) -> &Arc<LocaleRegistry> {
        &self.registry
    }

    pub fn source(&self) -> &ContentSource {
        &self.source
    }

    /// Resolve a request. Unknown or unpublished pages are `NotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, raw_locale: &str, public_slug: &str) -> Result<ResolvedPage> {
        let locale = self.registry.resolve(raw_locale);
        if locale != raw_locale {
            debug!(resolved = %locale, "unsupported locale replaced by default");
        }

        match &self.source {
            ContentSource::Stored(store) => {
                let item = store.get_published(&locale, public_slug).await?;
                Ok(ResolvedPage {
                    locale,
                    slug: item.slug.clone(),
                    content: PageContent::Stored { item },
                })
            }
            ContentSource::Aliased(table) => {
                let canonical_slug = table.resolve_alias(&locale, public_slug)?.to_string();
                Ok(ResolvedPage {
                    locale,
                    slug: public_slug.to_string(),
                    content: PageContent::Computed { canonical_slug },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasDictionary;
    use crate::content::NewContentItem;
    use crate::db::Database;

    fn registry() -> Arc<LocaleRegistry> {
        Arc::new(LocaleRegistry::default())
    }

    async fn blog_resolver() -> (Arc<Database>, PageResolver) {
        let db = Arc::new(Database::in_memory(registry()).await.unwrap());
        let resolver = PageResolver::new(registry(), ContentSource::Stored(db.clone()));
        (db, resolver)
    }

    fn profile_resolver() -> PageResolver {
        let dictionary =
            AliasDictionary::from_json(r#"{ "herbalife": { "es": "herbalife-nutricion" } }"#).unwrap();
        let table = SlugAliasTable::build(&dictionary, &registry()).unwrap();
        PageResolver::new(registry(), ContentSource::Aliased(Arc::new(table)))
    }

    #[tokio::test]
    async fn test_resolve_stored_page() {
        let (db, resolver) = blog_resolver().await;
        let es = registry().parse("es").unwrap();
        db.create(NewContentItem::new("a", es, "hola", "Hola")).await.unwrap();

        let page = resolver.resolve("es", "hola").await.unwrap();
        assert_eq!(page.locale, "es");
        assert_eq!(page.slug, "hola");
        assert!(matches!(page.content, PageContent::Stored { ref item } if item.id == "a"));
    }

    #[tokio::test]
    async fn test_resolve_unsupported_locale_uses_default() {
        let (db, resolver) = blog_resolver().await;
        db.create(NewContentItem::new("a", registry().default_locale(), "hello", "Hello"))
            .await
            .unwrap();

        let page = resolver.resolve("klingon", "hello").await.unwrap();
        assert_eq!(page.locale, "en");
    }

    #[tokio::test]
    async fn test_resolve_stored_missing_is_not_found() {
        let (_db, resolver) = blog_resolver().await;
        assert!(resolver.resolve("en", "missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_alias_page() {
        let resolver = profile_resolver();

        let page = resolver.resolve("es", "herbalife-nutricion").await.unwrap();
        assert_eq!(page.locale, "es");
        assert_eq!(page.slug, "herbalife-nutricion");
        assert_eq!(
            page.content,
            PageContent::Computed {
                canonical_slug: "herbalife".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_alias_foreign_url_is_not_found() {
        let resolver = profile_resolver();
        let err = resolver.resolve("es", "herbalife").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolved_page_serialization() {
        let resolver = profile_resolver();
        let page = resolver.resolve("en", "herbalife").await.unwrap();
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["kind"], "computed");
        assert_eq!(json["locale"], "en");
        assert_eq!(json["canonical_slug"], "herbalife");
    }
}
