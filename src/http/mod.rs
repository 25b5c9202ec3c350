//! HTTP API.
//!
//! Routes:
//! - `POST  /login`, `/refresh`, `/logout` - session lifecycle
//! - `GET   /health` - liveness, unauthenticated
//! - `GET   /photos`, `/photos/{id}`, `/photos/{id}/image` - reads
//! - `PATCH /photos/{id}/metadata` - optimistic metadata update
//! - `POST  /rescan` - reconcile blobs with records
//!
//! Everything except the session routes and `/health` requires an access
//! token. All errors are JSON `{"detail": "..."}` bodies.

mod error;
mod extract;
mod handlers;
mod middleware;

pub use error::AppError;
pub use extract::{ACCESS_COOKIE, REFRESH_COOKIE};

use crate::auth::AuthService;
use crate::library::{PhotoLibrary, Reconciler};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub library: PhotoLibrary,
    pub reconciler: Reconciler,
    pub auth: AuthService,
    /// Mark auth cookies `Secure`.
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(library: PhotoLibrary, auth: AuthService, cookie_secure: bool) -> Self {
        Self {
            reconciler: Reconciler::new(library.clone()),
            library,
            auth,
            cookie_secure,
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" })))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/photos", get(handlers::list_photos))
        .route("/photos/{id}", get(handlers::get_photo))
        .route("/photos/{id}/metadata", patch(handlers::update_metadata))
        .route("/photos/{id}/image", get(handlers::get_image))
        .route("/rescan", post(handlers::rescan))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_access_token,
        ));

    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
        .route("/health", get(handlers::health))
        .merge(protected)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
