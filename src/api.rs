//! Read-only JSON HTTP surface for the rendering layer.
//!
//! The locale path segment of every route goes through the locale resolver
//! first, so responses always carry the resolved locale, never the raw one.

use crate::alias::SlugAliasTable;
use crate::content::{ContentStore, Pagination, SearchPage};
use crate::error::ContentError;
use crate::groups::{GroupMember, TranslationGroupIndex};
use crate::i18n::{parse_accept_language, LocaleCode, LocaleRegistry};
use crate::pages::{ContentSource, PageResolver, ResolvedPage};
use crate::retry::{with_storage_retry, RetryConfig};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Shared handler state. Everything in it is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<LocaleRegistry>,
    store: Arc<dyn ContentStore>,
    content: PageResolver,
    profiles: PageResolver,
    groups: TranslationGroupIndex,
    retry: RetryConfig,
    search_default_page_size: u32,
    search_max_page_size: u32,
}

impl AppState {
    pub fn new(
        registry: Arc<LocaleRegistry>,
        store: Arc<dyn ContentStore>,
        aliases: Arc<SlugAliasTable>,
    ) -> Self {
        Self {
            content: PageResolver::new(registry.clone(), ContentSource::Stored(store.clone())),
            profiles: PageResolver::new(registry.clone(), ContentSource::Aliased(aliases)),
            groups: TranslationGroupIndex::new(store.clone(), registry.clone()),
            registry,
            store,
            retry: RetryConfig::storage_read(),
            search_default_page_size: 10,
            search_max_page_size: 50,
        }
    }

    pub fn with_page_sizes(mut self, default_size: u32, max_size: u32) -> Self {
        self.search_default_page_size = default_size;
        self.search_max_page_size = max_size;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/locale", get(preferred_locale))
        .route("/content/:locale/:slug", get(get_content))
        .route("/content/:locale/:slug/translations/:to", get(switch_locale))
        .route("/search/:locale", get(search))
        .route("/profiles/:locale/:slug", get(get_profile))
        .route("/groups/:id", get(get_group))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `ContentError` rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(ContentError);

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ContentError::NotFound { .. } => (StatusCode::NOT_FOUND, self.0.to_string()),
            ContentError::DuplicateSlug { .. } | ContentError::DuplicateTranslation { .. } => {
                (StatusCode::CONFLICT, self.0.to_string())
            }
            ContentError::InvalidSlug { .. } => (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string()),
            err if err.is_retryable() => {
                warn!(error = %err, "storage unavailable while serving request");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage temporarily unavailable".to_string(),
                )
            }
            err => {
                error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub locale: LocaleCode,
    pub query: String,
    #[serde(flatten)]
    pub results: SearchPage,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub members: Vec<GroupMember>,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Locale to redirect a bare `/` request to, from `Accept-Language`.
async fn preferred_locale(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let header_value = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let locale = state
        .registry
        .resolve_preferred(parse_accept_language(header_value));
    Json(json!({ "locale": locale }))
}

async fn get_content(
    State(state): State<AppState>,
    Path((locale, slug)): Path<(String, String)>,
) -> ApiResult<ResolvedPage> {
    let page = with_storage_retry(&state.retry, "get_content", || {
        state.content.resolve(&locale, &slug)
    })
    .await?;
    Ok(Json(page))
}

async fn get_profile(
    State(state): State<AppState>,
    Path((locale, slug)): Path<(String, String)>,
) -> ApiResult<ResolvedPage> {
    Ok(Json(state.profiles.resolve(&locale, &slug).await?))
}

async fn switch_locale(
    State(state): State<AppState>,
    Path((locale, slug, to)): Path<(String, String, String)>,
) -> ApiResult<GroupMember> {
    let from = state.registry.resolve(&locale);
    let to = state.registry.parse(&to).map_err(|_| ContentError::not_found(to.as_str(), slug.as_str()))?;
    Ok(Json(state.groups.switch_locale(&from, &slug, &to).await?))
}

async fn search(
    State(state): State<AppState>,
    Path(locale): Path<String>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SearchResponse> {
    let locale = state.registry.resolve(&locale);
    let pagination = Pagination::normalize(
        params.page,
        params.page_size,
        state.search_default_page_size,
        state.search_max_page_size,
    );

    let results = with_storage_retry(&state.retry, "search", || {
        state.store.search(&locale, &params.q, pagination)
    })
    .await?;

    Ok(Json(SearchResponse {
        locale,
        query: params.q,
        results,
    }))
}

async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<GroupResponse> {
    let members = state.groups.group_of(&id).await?;
    Ok(Json(GroupResponse { id, members }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasDictionary;
    use crate::content::NewContentItem;
    use crate::db::Database;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt; // For oneshot()

    fn registry() -> Arc<LocaleRegistry> {
        Arc::new(LocaleRegistry::from_codes(["en", "es", "fr"], "en").unwrap())
    }

    fn locale(code: &str) -> LocaleCode {
        registry().parse(code).unwrap()
    }

    async fn setup() -> (Arc<Database>, Router) {
        let db = Arc::new(Database::in_memory(registry()).await.unwrap());
        let dictionary =
            AliasDictionary::from_json(r#"{ "herbalife": { "es": "herbalife-nutricion" } }"#).unwrap();
        let aliases = Arc::new(SlugAliasTable::build(&dictionary, &registry()).unwrap());
        let state = AppState::new(registry(), db.clone(), aliases)
            .with_page_sizes(2, 3)
            .with_retry(RetryConfig::new(1, Duration::ZERO));
        (db, router(state))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    // ==================== Route Tests ====================

    #[tokio::test]
    async fn test_health() {
        let (_db, app) = setup().await;
        let (status, json) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_get_content_returns_resolved_locale() {
        let (db, app) = setup().await;
        db.create(NewContentItem::new("a", locale("en"), "hello", "Hello"))
            .await
            .unwrap();

        let (status, json) = get_json(app, "/content/klingon/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["locale"], "en");
        assert_eq!(json["slug"], "hello");
        assert_eq!(json["kind"], "stored");
        assert_eq!(json["item"]["id"], "a");
    }

    #[tokio::test]
    async fn test_get_content_unpublished_is_404() {
        let (db, app) = setup().await;
        db.create(NewContentItem::new("a", locale("es"), "borrador", "B").with_published(false))
            .await
            .unwrap();

        let (status, json) = get_json(app, "/content/es/borrador").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("borrador"));
    }

    #[tokio::test]
    async fn test_get_profile_alias() {
        let (_db, app) = setup().await;

        let (status, json) = get_json(app.clone(), "/profiles/es/herbalife-nutricion").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["kind"], "computed");
        assert_eq!(json["canonical_slug"], "herbalife");

        let (status, _) = get_json(app, "/profiles/es/herbalife").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_clamps_page_size() {
        let (db, app) = setup().await;
        for i in 0..5 {
            db.create(NewContentItem::new(format!("p{i}"), locale("fr"), format!("post-{i}"), "Nouvelles"))
                .await
                .unwrap();
        }

        let (status, json) = get_json(app.clone(), "/search/fr?q=nouv&page_size=100").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["locale"], "fr");
        assert_eq!(json["total_count"], 5);
        assert_eq!(json["page_size"], 3);
        assert_eq!(json["items"].as_array().unwrap().len(), 3);

        let (_, json) = get_json(app, "/search/fr?q=nouv&page=0&page_size=-4").await;
        assert_eq!(json["page"], 1);
        assert_eq!(json["page_size"], 2);
    }

    #[tokio::test]
    async fn test_group_and_switch_locale() {
        let (db, app) = setup().await;
        db.create(NewContentItem::new("a", locale("en"), "hello", "Hello"))
            .await
            .unwrap();
        db.create(NewContentItem::new("a", locale("es"), "hola", "Hola"))
            .await
            .unwrap();

        let (status, json) = get_json(app.clone(), "/groups/a").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["members"].as_array().unwrap().len(), 2);
        assert_eq!(json["members"][0]["locale"], "en");

        let (status, json) = get_json(app.clone(), "/content/en/hello/translations/es").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["slug"], "hola");

        let (status, _) = get_json(app, "/content/en/hello/translations/fr").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_preferred_locale_from_header() {
        let (_db, app) = setup().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/locale")
                    .header(header::ACCEPT_LANGUAGE, "de-DE, fr-CA;q=0.8, en;q=0.5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["locale"], "fr");
    }

    // ==================== Error Mapping Tests ====================

    fn status_of(err: ContentError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(status_of(ContentError::not_found("en", "x")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ContentError::DuplicateSlug {
                slug: "x".into(),
                locale: "en".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ContentError::InvalidSlug {
                slug: "X".into(),
                reason: "uppercase"
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ContentError::StorageUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ContentError::IntegrityFault("two rows".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_error_body_is_generic() {
        let response = ApiError::from(ContentError::Storage("disk I/O error at /var/db".into()))
            .into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("/var/db"));
        assert!(text.contains("Internal server error"));
    }
}
