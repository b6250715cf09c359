//! Static path enumeration.
//!
//! At build time every (locale, public slug) pair the site must pre-render is
//! produced from the registered content sources. A pair claimed by two
//! different content identities stops enumeration instead of letting one
//! page silently overwrite the other.

use crate::error::{ContentError, Result};
use crate::i18n::{LocaleCode, LocaleRegistry};
use crate::pages::ContentSource;
use anyhow::Context;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// One statically renderable page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StaticPath {
    pub locale: LocaleCode,
    pub slug: String,
}

impl StaticPath {
    /// URL path of the page, e.g. `/fr/herbalife-nutrition`.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.locale, self.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
    Content(String),
    Alias(String),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Content(id) => write!(f, "content:{id}"),
            Owner::Alias(canonical) => write!(f, "alias:{canonical}"),
        }
    }
}

/// Enumerates every static path of one routed section.
///
/// Sources registered on the same enumerator share a URL space, so their
/// slugs must not collide within a locale.
#[derive(Clone)]
pub struct PathEnumerator {
    registry: Arc<LocaleRegistry>,
    sources: Vec<ContentSource>,
}

impl PathEnumerator {
    pub fn new(registry: Arc<LocaleRegistry>) -> Self {
        Self {
            registry,
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: ContentSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Compute the full set of (locale, public slug) pairs.
    #[tracing::instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn enumerate(&self) -> Result<BTreeSet<StaticPath>> {
        let mut owners: HashMap<StaticPath, Owner> = HashMap::new();

        for source in &self.sources {
            match source {
                ContentSource::Stored(store) => {
                    let items = store.list_published().await?;
                    for locale in self.registry.supported() {
                        for item in items.iter().filter(|item| item.locale == locale) {
                            claim(
                                &mut owners,
                                &locale,
                                &item.slug,
                                Owner::Content(item.id.clone()),
                            )?;
                        }
                    }
                }
                ContentSource::Aliased(table) => {
                    for locale in self.registry.supported() {
                        for canonical in table.canonical_slugs() {
                            let public = table.public_slug(&locale, canonical).unwrap_or(canonical);
                            claim(
                                &mut owners,
                                &locale,
                                public,
                                Owner::Alias(canonical.to_string()),
                            )?;
                        }
                    }
                }
            }
        }

        let paths: BTreeSet<StaticPath> = owners.into_keys().collect();
        info!(count = paths.len(), "static paths enumerated");
        Ok(paths)
    }
}

/// One line of the exported static-path manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ManifestEntry {
    pub section: String,
    pub locale: LocaleCode,
    pub slug: String,
    pub path: String,
}

/// Flatten enumerated sections into a manifest sorted by section, locale, slug.
///
/// Section paths are prefixed with the section name, e.g. `/profiles/es/amway`.
pub fn build_manifest<'a, I>(sections: I) -> Vec<ManifestEntry>
where
    I: IntoIterator<Item = (&'a str, &'a BTreeSet<StaticPath>)>,
{
    let mut entries: Vec<ManifestEntry> = sections
        .into_iter()
        .flat_map(|(section, paths)| {
            paths.iter().map(move |path| ManifestEntry {
                section: section.to_string(),
                locale: path.locale.clone(),
                slug: path.slug.clone(),
                path: format!("/{}{}", section, path.path()),
            })
        })
        .collect();
    entries.sort();
    entries
}

/// Write the manifest as pretty-printed JSON, creating parent directories.
pub fn write_manifest(path: impl AsRef<Path>, entries: &[ManifestEntry]) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(entries).context("Failed to serialize manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}

fn claim(
    owners: &mut HashMap<StaticPath, Owner>,
    locale: &LocaleCode,
    slug: &str,
    owner: Owner,
) -> Result<()> {
    let path = StaticPath {
        locale: locale.clone(),
        slug: slug.to_string(),
    };

    match owners.get(&path) {
        Some(existing) if *existing != owner => {
            error!(
                locale = %locale,
                slug,
                first = %existing,
                second = %owner,
                "two content identities claim the same static path"
            );
            Err(ContentError::EnumerationConflict {
                locale: locale.to_string(),
                slug: slug.to_string(),
                first: existing.to_string(),
                second: owner.to_string(),
            })
        }
        Some(_) => Ok(()),
        None => {
            owners.insert(path, owner);
            Ok(())
        }
    }
}
