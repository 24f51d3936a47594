pub mod auth;
pub mod feed;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Uri};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Full application router: feed and auth groups, the image mount and the
/// global layers.
pub fn app(state: AppState) -> Router {
    let images_mount = format!("/{}", state.config.images_url_prefix());

    Router::new()
        .nest("/feed", feed::router())
        .nest("/auth", auth::router())
        .nest_service(&images_mount, ServeDir::new(state.intake.dir()))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.server.body_limit_bytes))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Permissive development CORS, applied to every response.
pub fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
