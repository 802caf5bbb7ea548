//! API layer - HTTP handlers and routing
//!
//! - Auth endpoints (signup, login, logout, current user)
//! - Article endpoints (dashboard, upload, view, feedback edit)
//! - Stored essay files under `/uploads`

pub mod articles;
pub mod auth;
pub mod middleware;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::db::repositories::{SqlxArticleRepository, SqlxSessionRepository, SqlxUserRepository};
use crate::extract::TextExtractor;
use crate::i18n::Messages;
use crate::services::{ArticleService, FeedbackGenerator, UploadService, UserService};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Wire repositories and services into the shared handler state
pub fn build_state(
    pool: SqlitePool,
    config: &Config,
    feedback: Arc<dyn FeedbackGenerator>,
) -> AppState {
    let messages = Messages::new(config.locale);

    let user_service = Arc::new(UserService::with_session_expiration(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool.clone()),
        config.session.expiration_days,
    ));
    let article_service = Arc::new(ArticleService::new(SqlxArticleRepository::boxed(pool)));
    let upload_service = Arc::new(UploadService::new(
        article_service.clone(),
        TextExtractor::new(messages),
        feedback,
        config.upload.clone(),
    ));

    AppState {
        user_service,
        article_service,
        upload_service,
        upload_config: Arc::new(config.upload.clone()),
        messages,
        session_max_age_secs: config.session.expiration_days * 24 * 60 * 60,
    }
}

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/articles", articles::router(state.upload_config.max_file_size))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!(cors_origin, "Invalid CORS origin, cross-origin requests disabled");
            CorsLayer::new()
        }
    };

    // Stored essays are only served to logged-in users
    let uploads = Router::new()
        .nest_service("/uploads", ServeDir::new(&state.upload_config.path))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .merge(uploads)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
