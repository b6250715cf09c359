//! Locale registry and resolution.
//!
//! # Architecture
//!
//! - `registry`: the immutable set of supported locales and the default locale
//! - `locale`: `LocaleCode`, a code validated against the registry
//! - `resolver`: total resolution of raw tokens to supported locales
//!
//! # Example
//!
//! ```rust
//! use localized_slugs::i18n::LocaleRegistry;
//!
//! let registry = LocaleRegistry::from_codes(["en", "fr"], "en")?;
//!
//! // Unsupported tokens fall back to the default
//! assert_eq!(registry.resolve("fr").as_str(), "fr");
//! assert_eq!(registry.resolve("??").as_str(), "en");
//! # Ok::<(), anyhow::Error>(())
//! ```

mod locale;
mod registry;
mod resolver;

pub use locale::LocaleCode;
pub use registry::{LocaleConfig, LocaleRegistry};
pub use resolver::parse_accept_language;
