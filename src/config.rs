use crate::i18n::LocaleRegistry;
use anyhow::{bail, Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,
    pub storage_timeout: Duration,

    // Locales
    pub supported_locales: Vec<String>,
    pub default_locale: String,

    // Search
    pub search_default_page_size: u32,
    pub search_max_page_size: u32,

    // Alias-backed content
    pub alias_dictionary_path: Option<String>,

    // Build-time export
    pub manifest_path: String,

    // Server
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let supported_locales: Vec<String> = std::env::var("SUPPORTED_LOCALES")
            .unwrap_or_else(|_| "en,es,fr,de,pt".to_string())
            .split(',')
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect();

        if supported_locales.is_empty() {
            bail!("SUPPORTED_LOCALES must list at least one locale");
        }

        let default_locale = std::env::var("DEFAULT_LOCALE")
            .map(|code| code.trim().to_string())
            .unwrap_or_else(|_| "en".to_string());

        if !supported_locales.contains(&default_locale) {
            bail!(
                "DEFAULT_LOCALE '{}' is not listed in SUPPORTED_LOCALES",
                default_locale
            );
        }

        Ok(Self {
            // Storage
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:content.db".to_string()),
            storage_timeout: Duration::from_millis(
                std::env::var("STORAGE_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5000),
            ),

            // Locales
            supported_locales,
            default_locale,

            // Search
            search_default_page_size: std::env::var("SEARCH_DEFAULT_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            search_max_page_size: std::env::var("SEARCH_MAX_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),

            // Alias-backed content
            alias_dictionary_path: std::env::var("ALIAS_DICTIONARY_PATH")
                .ok()
                .filter(|path| !path.trim().is_empty()),

            // Build-time export
            manifest_path: std::env::var("MANIFEST_PATH")
                .unwrap_or_else(|_| "data/static-paths.json".to_string()),

            // Server
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        })
    }

    /// Build the locale registry described by this configuration.
    pub fn locale_registry(&self) -> Result<LocaleRegistry> {
        LocaleRegistry::from_codes(&self.supported_locales, &self.default_locale)
            .context("Invalid locale configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 9] = [
        "DATABASE_URL",
        "STORAGE_TIMEOUT_MS",
        "SUPPORTED_LOCALES",
        "DEFAULT_LOCALE",
        "SEARCH_DEFAULT_PAGE_SIZE",
        "SEARCH_MAX_PAGE_SIZE",
        "ALIAS_DICTIONARY_PATH",
        "MANIFEST_PATH",
        "PORT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env().expect("Defaults should load");

        assert_eq!(config.database_url, "sqlite:content.db");
        assert_eq!(config.storage_timeout, Duration::from_secs(5));
        assert_eq!(config.supported_locales, vec!["en", "es", "fr", "de", "pt"]);
        assert_eq!(config.default_locale, "en");
        assert_eq!(config.search_default_page_size, 10);
        assert_eq!(config.search_max_page_size, 50);
        assert!(config.alias_dictionary_path.is_none());
        assert_eq!(config.manifest_path, "data/static-paths.json");
        assert_eq!(config.port, 8080);
    }

    #[test]
    #[serial]
    fn test_from_env_custom_locales() {
        clear_env();
        std::env::set_var("SUPPORTED_LOCALES", " en , fr ,, ja ");
        std::env::set_var("DEFAULT_LOCALE", "fr");

        let config = Config::from_env().unwrap();
        assert_eq!(config.supported_locales, vec!["en", "fr", "ja"]);

        let registry = config.locale_registry().unwrap();
        assert_eq!(registry.default_locale(), "fr");
        assert_eq!(registry.get_by_code("ja").unwrap().native_name, "日本語");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_default_outside_list() {
        clear_env();
        std::env::set_var("SUPPORTED_LOCALES", "en,es");
        std::env::set_var("DEFAULT_LOCALE", "de");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("DEFAULT_LOCALE"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_empty_locale_list() {
        clear_env();
        std::env::set_var("SUPPORTED_LOCALES", " , ");

        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_malformed_numbers_fall_back() {
        clear_env();
        std::env::set_var("SEARCH_MAX_PAGE_SIZE", "lots");
        std::env::set_var("STORAGE_TIMEOUT_MS", "-1");
        std::env::set_var("PORT", "99999");

        let config = Config::from_env().unwrap();
        assert_eq!(config.search_max_page_size, 50);
        assert_eq!(config.storage_timeout, Duration::from_millis(5000));
        assert_eq!(config.port, 8080);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_blank_alias_path_is_none() {
        clear_env();
        std::env::set_var("ALIAS_DICTIONARY_PATH", "  ");
        assert!(Config::from_env().unwrap().alias_dictionary_path.is_none());

        std::env::set_var("ALIAS_DICTIONARY_PATH", "data/aliases.json");
        assert_eq!(
            Config::from_env().unwrap().alias_dictionary_path.as_deref(),
            Some("data/aliases.json")
        );
        clear_env();
    }
}
