//! Export the static-path manifest for a pre-rendered build.
//!
//! Usage:
//!   cargo run --bin export-paths
//!
//! Optional:
//! - DATABASE_URL (defaults to sqlite:content.db)
//! - ALIAS_DICTIONARY_PATH (alias-backed profile pages)
//! - MANIFEST_PATH (defaults to data/static-paths.json)
//!
//! Exits with an error when two content identities claim the same path.

use anyhow::{Context, Result};
use localized_slugs::alias::{AliasDictionary, SlugAliasTable};
use localized_slugs::config::Config;
use localized_slugs::db::Database;
use localized_slugs::pages::ContentSource;
use localized_slugs::paths::{build_manifest, write_manifest, PathEnumerator};
use localized_slugs::retry::{with_storage_retry, RetryConfig};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("localized_slugs=info".parse()?)
                .add_directive("export_paths=info".parse()?),
        )
        .init();

    info!("Starting static path export");

    let config = Config::from_env()?;
    let registry = Arc::new(config.locale_registry()?);

    let db = Database::connect(&config.database_url, registry.clone(), config.storage_timeout)
        .await
        .context("Failed to open content database")?;

    let dictionary = AliasDictionary::load(config.alias_dictionary_path.as_deref())?;
    let aliases = SlugAliasTable::build(&dictionary, &registry).context("Invalid alias dictionary")?;

    let retry = RetryConfig::build_export();

    let content = PathEnumerator::new(registry.clone()).with_source(ContentSource::Stored(Arc::new(db)));
    let content_paths = with_storage_retry(&retry, "enumerate content", || content.enumerate())
        .await
        .context("Failed to enumerate content paths")?;

    let profiles = PathEnumerator::new(registry).with_source(ContentSource::Aliased(Arc::new(aliases)));
    let profile_paths = profiles
        .enumerate()
        .await
        .context("Failed to enumerate profile paths")?;

    let entries = build_manifest([("content", &content_paths), ("profiles", &profile_paths)]);
    write_manifest(&config.manifest_path, &entries)?;

    info!("✓ Exported {} static paths to {}", entries.len(), config.manifest_path);
    Ok(())
}
