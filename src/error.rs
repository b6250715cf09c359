//! Error taxonomy for content identity and slug resolution.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the locale, content, alias and enumeration layers.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The requested (locale, slug) does not resolve to any published item.
    #[error("no published content for slug '{slug}' in locale '{locale}'")]
    NotFound { locale: String, slug: String },

    /// Another content identity already owns this slug in this locale.
    #[error("slug '{slug}' is already used in locale '{locale}'")]
    DuplicateSlug { slug: String, locale: String },

    /// A row for this (id, locale) pair already exists.
    #[error("content '{id}' already has a '{locale}' translation")]
    DuplicateTranslation { id: String, locale: String },

    #[error("invalid slug '{slug}': {reason}")]
    InvalidSlug { slug: String, reason: &'static str },

    /// A locale outside the registry reached an internal component.
    #[error("unsupported locale '{0}'")]
    UnsupportedLocale(String),

    /// Stored data violates an invariant that writes should have prevented.
    #[error("data integrity fault: {0}")]
    IntegrityFault(String),

    #[error("alias '{public_slug}' in locale '{locale}' is claimed by both '{first}' and '{second}'")]
    AliasConflict {
        locale: String,
        public_slug: String,
        first: String,
        second: String,
    },

    /// Two content identities would be rendered at the same static path.
    #[error("static path '{locale}/{slug}' is claimed by both '{first}' and '{second}'")]
    EnumerationConflict {
        locale: String,
        slug: String,
        first: String,
        second: String,
    },

    #[error("storage operation '{operation}' timed out after {timeout:?}")]
    StorageTimeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl ContentError {
    pub fn not_found(locale: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::NotFound {
            locale: locale.into(),
            slug: slug.into(),
        }
    }

    /// Whether a caller may retry the failed operation with backoff.
    ///
    /// Only transient storage failures qualify; the store never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageTimeout { .. } | Self::StorageUnavailable(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sqlx::Error> for ContentError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::StorageTimeout {
                operation: "acquire connection",
                timeout: Duration::ZERO,
            },
            sqlx::Error::Io(e) => Self::StorageUnavailable(e.to_string()),
            sqlx::Error::Tls(e) => Self::StorageUnavailable(e.to_string()),
            sqlx::Error::PoolClosed => Self::StorageUnavailable("connection pool closed".to_string()),
            sqlx::Error::WorkerCrashed => Self::StorageUnavailable("database worker crashed".to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;
