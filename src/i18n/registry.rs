//! Locale registry: the fixed set of locales the site serves.
//!
//! The registry is built once at startup (from configuration or the built-in
//! defaults) and is immutable afterwards. Components receive it explicitly,
//! usually behind an `Arc`, rather than reading a process-wide global.

use crate::error::ContentError;
use crate::i18n::LocaleCode;
use anyhow::{bail, Result};

/// Configuration for a supported locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    /// Locale code as it appears in URLs (e.g., "en", "fr")
    pub code: String,

    /// English name of the language (e.g., "French")
    pub name: String,

    /// Native name of the language (e.g., "Français")
    pub native_name: String,

    /// Whether this is the default/canonical locale (exactly one must be true)
    pub is_default: bool,

    /// Whether this locale is served
    pub enabled: bool,
}

impl LocaleConfig {
    /// Build a config for `code`, filling names from the built-in catalog.
    pub fn for_code(code: &str, is_default: bool) -> Self {
        let (name, native_name) = known_names(code).unwrap_or((code, code));
        Self {
            code: code.to_string(),
            name: name.to_string(),
            native_name: native_name.to_string(),
            is_default,
            enabled: true,
        }
    }
}

/// Immutable table of supported locales with a designated default.
#[derive(Debug, Clone)]
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
    default_index: usize,
}

impl LocaleRegistry {
    /// Build a registry, validating that codes are unique and well formed and
    /// that exactly one enabled locale is marked as the default.
    ///
    /// # Arguments
    /// * `locales` - Locale configurations in display order
    ///
    /// # Returns
    /// The registry, or an error naming the first offending code.
    pub fn new(locales: Vec<LocaleConfig>) -> Result<Self> {
        if locales.is_empty() {
            bail!("Locale registry must contain at least one locale");
        }

        for (i, locale) in locales.iter().enumerate() {
            if !is_well_formed_code(&locale.code) {
                bail!("Invalid locale code: '{}'", locale.code);
            }
            if locales[..i].iter().any(|other| other.code == locale.code) {
                bail!("Duplicate locale code: '{}'", locale.code);
            }
        }

        let defaults: Vec<usize> = locales
            .iter()
            .enumerate()
            .filter(|(_, locale)| locale.is_default)
            .map(|(i, _)| i)
            .collect();

        let default_index = match defaults.as_slice() {
            [] => bail!("No default locale found in registry"),
            [index] => *index,
            _ => bail!("Multiple default locales found in registry"),
        };

        if !locales[default_index].enabled {
            bail!(
                "Default locale '{}' must be enabled",
                locales[default_index].code
            );
        }

        Ok(Self {
            locales,
            default_index,
        })
    }

    /// Build a registry from a list of codes and the default code.
    ///
    /// # Arguments
    /// * `codes` - Supported locale codes, in registry order
    /// * `default_code` - Must be one of `codes`
    pub fn from_codes<I, S>(codes: I, default_code: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let locales: Vec<LocaleConfig> = codes
            .into_iter()
            .map(|code| {
                let code = code.as_ref();
                LocaleConfig::for_code(code, code == default_code)
            })
            .collect();

        if !locales.iter().any(|locale| locale.is_default) {
            bail!(
                "Default locale '{}' is not in the supported locale list",
                default_code
            );
        }

        Self::new(locales)
    }

    /// Get a locale configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|locale| locale.code == code)
    }

    /// All enabled locales, in registry order.
    pub fn list_enabled(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().filter(|locale| locale.enabled).collect()
    }

    /// All locales, including disabled ones.
    pub fn list_all(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().collect()
    }

    /// The default (canonical) locale configuration.
    pub fn default_config(&self) -> &LocaleConfig {
        &self.locales[self.default_index]
    }

    /// The default locale as a validated code.
    pub fn default_locale(&self) -> LocaleCode {
        LocaleCode::new(self.default_config().code.clone())
    }

    /// Check if a locale code is supported and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|locale| locale.enabled)
            .unwrap_or(false)
    }

    /// Validated codes of every enabled locale, in registry order.
    pub fn supported(&self) -> Vec<LocaleCode> {
        self.list_enabled()
            .into_iter()
            .map(|locale| LocaleCode::new(locale.code.clone()))
            .collect()
    }

    /// Validate a code that must already be supported.
    ///
    /// Internal components use this for values that should have passed
    /// through the resolver; a failure here is a programming error, not a
    /// user-facing case.
    ///
    /// # Returns
    /// * `Ok(LocaleCode)` - `code` names an enabled locale
    /// * `Err(ContentError::UnsupportedLocale)` - Unknown or disabled code
    pub fn parse(&self, code: &str) -> Result<LocaleCode, ContentError> {
        if self.is_enabled(code) {
            Ok(LocaleCode::new(code.to_string()))
        } else {
            Err(ContentError::UnsupportedLocale(code.to_string()))
        }
    }

    /// Position of a locale in registry order, used for stable sorting.
    pub fn position(&self, code: &str) -> usize {
        self.locales
            .iter()
            .position(|locale| locale.code == code)
            .unwrap_or(usize::MAX)
    }
}

impl Default for LocaleRegistry {
    /// English (default), Spanish, French, German and Portuguese.
    fn default() -> Self {
        Self {
            locales: vec![
                LocaleConfig::for_code("en", true),
                LocaleConfig::for_code("es", false),
                LocaleConfig::for_code("fr", false),
                LocaleConfig::for_code("de", false),
                LocaleConfig::for_code("pt", false),
            ],
            default_index: 0,
        }
    }
}

fn is_well_formed_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= 16
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// English and native names for the locales the site has shipped with.
fn known_names(code: &str) -> Option<(&'static str, &'static str)> {
    let names = match code {
        "en" => ("English", "English"),
        "es" => ("Spanish", "Español"),
        "fr" => ("French", "Français"),
        "de" => ("German", "Deutsch"),
        "pt" => ("Portuguese", "Português"),
        "it" => ("Italian", "Italiano"),
        "nl" => ("Dutch", "Nederlands"),
        "id" => ("Indonesian", "Bahasa Indonesia"),
        "ja" => ("Japanese", "日本語"),
        "ko" => ("Korean", "한국어"),
        "zh" => ("Chinese", "中文"),
        "tr" => ("Turkish", "Türkçe"),
        "pl" => ("Polish", "Polski"),
        "ru" => ("Russian", "Русский"),
        _ => return None,
    };
    Some(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_english_default() {
        let registry = LocaleRegistry::default();
        let default = registry.default_config();

        assert_eq!(default.code, "en");
        assert_eq!(default.name, "English");
        assert!(default.is_default);
        assert!(default.enabled);
    }

    #[test]
    fn test_get_by_code_french() {
        let registry = LocaleRegistry::default();
        let config = registry.get_by_code("fr").unwrap();

        assert_eq!(config.name, "French");
        assert_eq!(config.native_name, "Français");
        assert!(!config.is_default);
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        let registry = LocaleRegistry::default();
        assert!(registry.get_by_code("xx").is_none());
    }

    #[test]
    fn test_from_codes_marks_default() {
        let registry = LocaleRegistry::from_codes(["en", "fr"], "fr").unwrap();

        assert_eq!(registry.default_config().code, "fr");
        assert_eq!(registry.list_enabled().len(), 2);
    }

    #[test]
    fn test_from_codes_rejects_missing_default() {
        let result = LocaleRegistry::from_codes(["en", "fr"], "de");
        assert!(result.unwrap_err().to_string().contains("not in the supported"));
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(LocaleRegistry::new(vec![]).is_err());
    }

    #[test]
    fn test_new_rejects_duplicate_codes() {
        let result = LocaleRegistry::new(vec![
            LocaleConfig::for_code("en", true),
            LocaleConfig::for_code("en", false),
        ]);
        assert!(result.unwrap_err().to_string().contains("Duplicate"));
    }

    #[test]
    fn test_new_rejects_multiple_defaults() {
        let result = LocaleRegistry::new(vec![
            LocaleConfig::for_code("en", true),
            LocaleConfig::for_code("fr", true),
        ]);
        assert!(result.unwrap_err().to_string().contains("Multiple"));
    }

    #[test]
    fn test_new_rejects_disabled_default() {
        let mut en = LocaleConfig::for_code("en", true);
        en.enabled = false;
        assert!(LocaleRegistry::new(vec![en]).is_err());
    }

    #[test]
    fn test_new_rejects_malformed_code() {
        let result = LocaleRegistry::new(vec![LocaleConfig::for_code("e n", true)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_disabled_locale_is_not_supported() {
        let mut fr = LocaleConfig::for_code("fr", false);
        fr.enabled = false;
        let registry =
            LocaleRegistry::new(vec![LocaleConfig::for_code("en", true), fr]).unwrap();

        assert!(!registry.is_enabled("fr"));
        assert_eq!(registry.list_all().len(), 2);
        assert_eq!(registry.supported(), vec![registry.default_locale()]);
        assert!(matches!(
            registry.parse("fr"),
            Err(ContentError::UnsupportedLocale(code)) if code == "fr"
        ));
    }

    #[test]
    fn test_unknown_code_uses_code_as_name() {
        let config = LocaleConfig::for_code("sw", false);
        assert_eq!(config.name, "sw");
        assert_eq!(config.native_name, "sw");
    }

    #[test]
    fn test_position_follows_registry_order() {
        let registry = LocaleRegistry::default();
        assert_eq!(registry.position("en"), 0);
        assert_eq!(registry.position("fr"), 2);
        assert_eq!(registry.position("xx"), usize::MAX);
    }
}
