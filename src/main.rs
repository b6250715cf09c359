use anyhow::{Context, Result};
use localized_slugs::alias::{AliasDictionary, SlugAliasTable};
use localized_slugs::api::{self, AppState};
use localized_slugs::config::Config;
use localized_slugs::db::Database;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("localized_slugs=info".parse()?),
        )
        .init();

    info!("Starting localized content service");

    // Load configuration from environment
    let config = Config::from_env()?;
    let registry = Arc::new(config.locale_registry()?);
    info!(
        "Supported locales: {} (default: {})",
        config.supported_locales.join(", "),
        config.default_locale
    );

    // Storage
    let db = Database::connect(&config.database_url, registry.clone(), config.storage_timeout)
        .await
        .context("Failed to open content database")?;

    // Alias-backed profile pages
    let dictionary = AliasDictionary::load(config.alias_dictionary_path.as_deref())?;
    let aliases = SlugAliasTable::build(&dictionary, &registry).context("Invalid alias dictionary")?;
    info!("Loaded {} alias-backed profiles", aliases.len());

    let state = AppState::new(registry, Arc::new(db), Arc::new(aliases))
        .with_page_sizes(config.search_default_page_size, config.search_max_page_size);
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
