//! Translation groups: the per-locale variants of one conceptual page.
//!
//! A group is keyed by the explicit `translation_group_id` when the identity
//! carries one. Legacy content without it is keyed by the default-locale
//! slug, and other rows join by setting their group id to that slug.

use crate::content::{ContentItem, ContentStore};
use crate::error::{ContentError, Result};
use crate::i18n::{LocaleCode, LocaleRegistry};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error};

/// One locale variant within a translation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMember {
    pub locale: LocaleCode,
    pub slug: String,
    pub id: String,
    pub published: bool,
}

impl From<&ContentItem> for GroupMember {
    fn from(item: &ContentItem) -> Self {
        Self {
            locale: item.locale.clone(),
            slug: item.slug.clone(),
            id: item.id.clone(),
            published: item.published,
        }
    }
}

/// Derives translation groups from the content store on demand.
#[derive(Clone)]
pub struct TranslationGroupIndex {
    store: Arc<dyn ContentStore>,
    registry: Arc<LocaleRegistry>,
}

impl TranslationGroupIndex {
    pub fn new(store: Arc<dyn ContentStore>, registry: Arc<LocaleRegistry>) -> Self {
        Self { store, registry }
    }

    /// Members of the group `id` belongs to, one per locale, in registry order.
    ///
    /// The result is the same whichever member is asked: a row linked to a
    /// legacy group also pulls in the default-locale row whose slug anchors
    /// that group, and every identity reached contributes all its rows.
    ///
    /// # Returns
    /// * An empty list if `id` has no rows
    /// * Otherwise one `GroupMember` per locale, published or not
    ///
    /// # Errors
    /// `IntegrityFault` if two members share a locale, or if one identity's
    /// rows carry different explicit group ids.
    #[tracing::instrument(skip(self))]
    pub async fn group_of(&self, id: &str) -> Result<Vec<GroupMember>> {
        let mut items = self.store.list_translations(id).await?;
        if items.is_empty() {
            debug!("identity has no translations");
            return Ok(Vec::new());
        }

        match self.group_key(id, &items)? {
            GroupKey::Explicit(key) => {
                let default_locale = self.registry.default_locale();
                if let Some(anchor) = self.store.find_by_slug(&default_locale, &key).await? {
                    if anchor.translation_group_id.is_none() {
                        merge(&mut items, vec![anchor]);
                    }
                }
                merge(&mut items, self.store.list_by_group(&key).await?);
            }
            GroupKey::DefaultSlug(key) => {
                merge(&mut items, self.store.list_by_group(&key).await?);
            }
            GroupKey::None => {}
        }

        let mut expanded: BTreeSet<String> = BTreeSet::from([id.to_string()]);
        let reached: Vec<String> = items
            .iter()
            .filter(|item| expanded.insert(item.id.clone()))
            .map(|item| item.id.clone())
            .collect();
        for other in reached {
            merge(&mut items, self.store.list_translations(&other).await?);
        }

        let mut members: Vec<GroupMember> = Vec::with_capacity(items.len());
        for item in &items {
            if let Some(other) = members.iter().find(|member| member.locale == item.locale) {
                error!(
                    locale = %item.locale,
                    first = %other.id,
                    second = %item.id,
                    "translation group has two items in one locale"
                );
                return Err(ContentError::IntegrityFault(format!(
                    "translation group of '{}' has two '{}' items: '{}' and '{}'",
                    id, item.locale, other.id, item.id
                )));
            }
            members.push(GroupMember::from(item));
        }

        members.sort_by_key(|member| self.registry.position(member.locale.as_str()));
        Ok(members)
    }

    /// The slug of the same page in another locale (language switcher).
    ///
    /// Both the source page and the target translation must be published.
    #[tracing::instrument(skip(self), fields(from = %from, to = %to))]
    pub async fn switch_locale(
        &self,
        from: &LocaleCode,
        slug: &str,
        to: &LocaleCode,
    ) -> Result<GroupMember> {
        let item = self.store.get_published(from, slug).await?;
        self.group_of(&item.id)
            .await?
            .into_iter()
            .find(|member| &member.locale == to && member.published)
            .ok_or_else(|| ContentError::not_found(to.as_str(), slug))
    }

    /// The key other rows use to join this identity's group.
    fn group_key(&self, id: &str, own: &[ContentItem]) -> Result<GroupKey> {
        let mut explicit = own.iter().filter_map(|item| item.translation_group_id.as_deref());

        if let Some(first) = explicit.next() {
            if let Some(conflicting) = explicit.find(|group| *group != first) {
                return Err(ContentError::IntegrityFault(format!(
                    "content '{}' belongs to groups '{}' and '{}'",
                    id, first, conflicting
                )));
            }
            return Ok(GroupKey::Explicit(first.to_string()));
        }

        let default_locale = self.registry.default_locale();
        Ok(own
            .iter()
            .find(|item| item.locale == default_locale)
            .map(|item| GroupKey::DefaultSlug(item.slug.clone()))
            .unwrap_or(GroupKey::None))
    }
}

enum GroupKey {
    /// Carried as `translation_group_id`; may name a legacy default-locale slug
    Explicit(String),
    /// Legacy identity keyed by its own default-locale slug
    DefaultSlug(String),
    None,
}

/// Append rows not already present by (id, locale).
fn merge(items: &mut Vec<ContentItem>, more: Vec<ContentItem>) {
    for item in more {
        let present = items
            .iter()
            .any(|existing| existing.id == item.id && existing.locale == item.locale);
        if !present {
            items.push(item);
        }
    }
}
