//! Locale resolution: turn any raw token into a supported locale.

use crate::i18n::{LocaleCode, LocaleRegistry};

impl LocaleRegistry {
    /// Resolve a raw, possibly invalid locale token.
    ///
    /// Returns the token itself when it names an enabled locale, otherwise
    /// the default locale. Never fails.
    ///
    /// # Example
    /// ```
    /// use localized_slugs::i18n::LocaleRegistry;
    ///
    /// let registry = LocaleRegistry::default();
    /// assert_eq!(registry.resolve("fr").as_str(), "fr");
    /// assert_eq!(registry.resolve("klingon").as_str(), "en");
    /// assert_eq!(registry.resolve("").as_str(), "en");
    /// ```
    pub fn resolve(&self, raw: &str) -> LocaleCode {
        match self.get_by_code(raw) {
            Some(config) if config.enabled => LocaleCode::new(config.code.clone()),
            _ => self.default_locale(),
        }
    }

    /// Resolve the first supported locale from an ordered list of candidates.
    ///
    /// Each candidate is tried as-is and then by its primary subtag
    /// (`"fr-CA"` falls back to `"fr"`), so a regional preference still lands
    /// on the base language. Falls back to the default locale.
    pub fn resolve_preferred<I, S>(&self, candidates: I) -> LocaleCode
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for candidate in candidates {
            let candidate = candidate.as_ref().trim();
            if self.is_enabled(candidate) {
                return LocaleCode::new(candidate.to_string());
            }

            let lowered = candidate.to_ascii_lowercase();
            if self.is_enabled(&lowered) {
                return LocaleCode::new(lowered);
            }

            if let Some(primary) = lowered.split(['-', '_']).next() {
                if self.is_enabled(primary) {
                    return LocaleCode::new(primary.to_string());
                }
            }
        }

        self.default_locale()
    }
}

/// Parse an `Accept-Language` header into tags ordered by descending weight.
///
/// Entries with `q=0` or an unparsable weight are dropped; ties keep header order.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut weighted: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }

            let mut weight = 1.0_f32;
            for param in parts {
                if let Some(q) = param.trim().strip_prefix("q=") {
                    weight = q.trim().parse().ok()?;
                }
            }

            (weight > 0.0).then(|| (tag.to_string(), weight))
        })
        .collect();

    // Stable sort keeps header order for equal weights
    weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    weighted.into_iter().map(|(tag, _)| tag).collect()
}
