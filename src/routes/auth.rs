use axum::routing::{post, put};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", put(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
}
