//! Validated locale codes.

use serde::Serialize;
use std::fmt;

/// A locale code that has been validated against a [`LocaleRegistry`].
///
/// Values are only constructed by the registry (`parse`, `resolve`,
/// `supported`, `default_locale`), so holding one means the locale was a
/// member of the supported set when it was produced.
///
/// [`LocaleRegistry`]: crate::i18n::LocaleRegistry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocaleCode(String);

impl LocaleCode {
    pub(crate) fn new(code: String) -> Self {
        Self(code)
    }

    /// The code as it appears in URLs (e.g., "en", "fr").
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LocaleCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for LocaleCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LocaleCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
