//! Slug aliases for computed content.
//!
//! Some pages (company profiles, per-country gateway pages) are rendered
//! from one canonical record rather than stored per locale. Their public
//! slug in each locale is a translation of the canonical slug, maintained in
//! a source-controlled dictionary:
//!
//! ```json
//! {
//!   "herbalife": { "es": "herbalife-nutricion", "fr": "herbalife-nutrition" },
//!   "amway": {}
//! }
//! ```
//!
//! Locales without a translated alias serve the canonical slug itself, and
//! the default locale always serves the canonical slug.

use crate::error::{ContentError, Result};
use crate::i18n::{LocaleCode, LocaleRegistry};
use crate::slug;
use anyhow::Context;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Canonical slug → (locale code → translated public slug).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AliasDictionary(pub BTreeMap<String, BTreeMap<String, String>>);

impl AliasDictionary {
    /// Parse a dictionary from JSON text.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("Failed to parse alias dictionary")
    }

    /// Read a dictionary from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias dictionary at {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Read the configured dictionary, or an empty one when none is configured.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Immutable lookup table of (locale, public slug) → canonical slug.
#[derive(Debug, Clone)]
pub struct SlugAliasTable {
    /// locale code → public slug → canonical slug
    aliases: HashMap<String, HashMap<String, String>>,
    /// canonical slug → locale code → public slug
    public: BTreeMap<String, HashMap<String, String>>,
    locales: Vec<LocaleCode>,
}

impl SlugAliasTable {
    /// Build the table, validating every slug and locale in the dictionary.
    ///
    /// # Arguments
    /// * `dictionary` - Canonical slug to per-locale translated slugs
    /// * `registry` - Locales to build aliases for; untranslated ones serve the canonical slug
    ///
    /// # Errors
    /// * `UnsupportedLocale` for a dictionary locale outside the registry
    /// * `InvalidSlug` for a malformed slug, or a default-locale entry that differs
    ///   from its canonical slug
    /// * `AliasConflict` when two canonical slugs share a public slug in one locale
    pub fn build(dictionary: &AliasDictionary, registry: &LocaleRegistry) -> Result<Self> {
        let locales = registry.supported();
        let default_locale = registry.default_locale();

        let mut aliases: HashMap<String, HashMap<String, String>> = locales
            .iter()
            .map(|locale| (locale.to_string(), HashMap::new()))
            .collect();
        let mut public: BTreeMap<String, HashMap<String, String>> = BTreeMap::new();

        for (canonical, translations) in &dictionary.0 {
            slug::validate(canonical)?;

            for (code, alias) in translations {
                registry.parse(code)?;
                slug::validate(alias)?;
                if default_locale == code.as_str() && alias != canonical {
                    warn!(locale = %code, alias = %alias, canonical = %canonical, "default-locale alias differs from canonical slug");
                    return Err(ContentError::InvalidSlug {
                        slug: alias.clone(),
                        reason: "a default-locale alias must equal its canonical slug",
                    });
                }
            }

            let mut by_locale = HashMap::with_capacity(locales.len());
            for locale in &locales {
                let alias = translations
                    .get(locale.as_str())
                    .unwrap_or(canonical)
                    .clone();

                let table = aliases.entry(locale.to_string()).or_default();
                if let Some(existing) = table.get(&alias) {
                    warn!(locale = %locale, alias = %alias, first = %existing, second = %canonical, "alias conflict");
                    return Err(ContentError::AliasConflict {
                        locale: locale.to_string(),
                        public_slug: alias,
                        first: existing.clone(),
                        second: canonical.clone(),
                    });
                }
                table.insert(alias.clone(), canonical.clone());
                by_locale.insert(locale.to_string(), alias);
            }
            public.insert(canonical.clone(), by_locale);
        }

        info!(
            canonical = public.len(),
            locales = locales.len(),
            "slug alias table built"
        );

        Ok(Self {
            aliases,
            public,
            locales,
        })
    }

    /// Resolve a public slug in `locale` to its canonical slug.
    ///
    /// There is no fallback: a slug that is not an alias in this locale is
    /// `NotFound`, even when it is a canonical slug translated elsewhere.
    pub fn resolve_alias(&self, locale: &LocaleCode, public_slug: &str) -> Result<&str> {
        self.aliases
            .get(locale.as_str())
            .and_then(|table| table.get(public_slug))
            .map(String::as_str)
            .ok_or_else(|| ContentError::not_found(locale.as_str(), public_slug))
    }

    /// The public slug of `canonical` in `locale`, if `canonical` is known.
    pub fn public_slug(&self, locale: &LocaleCode, canonical: &str) -> Option<&str> {
        self.public
            .get(canonical)
            .and_then(|by_locale| by_locale.get(locale.as_str()))
            .map(String::as_str)
    }

    /// Canonical slugs in sorted order.
    pub fn canonical_slugs(&self) -> impl Iterator<Item = &str> {
        self.public.keys().map(String::as_str)
    }

    /// Locales the table was built for, in registry order.
    pub fn locales(&self) -> &[LocaleCode] {
        &self.locales
    }

    pub fn len(&self) -> usize {
        self.public.len()
    }

    pub fn is_empty(&self) -> bool {
        self.public.is_empty()
    }
}
