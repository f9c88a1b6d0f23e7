pub mod auth;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::candidates::handlers;
use crate::candidates::validation::MAX_RESUME_BYTES;
use crate::errors;
use crate::state::AppState;

/// Body limit for résumé uploads. Kept above the 10 MiB file cap so that
/// slightly oversized files reach validation and fail as `TooLarge`.
const UPLOAD_BODY_LIMIT: usize = 2 * MAX_RESUME_BYTES;

pub fn build_router(state: AppState) -> Router {
    let expose_error_details = state.expose_error_details;

    let candidates = Router::new()
        .route("/", post(handlers::handle_create).get(handlers::handle_list))
        .route(
            "/:id",
            get(handlers::handle_get)
                .put(handlers::handle_update)
                .delete(handlers::handle_delete),
        )
        .route(
            "/:id/cv",
            post(handlers::handle_upload_resume)
                .get(handlers::handle_download_resume)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn(auth::require_bearer));

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/logout", post(auth::handle_logout))
        .nest("/api/candidates", candidates)
        .layer(middleware::from_fn_with_state(
            expose_error_details,
            errors::reveal_error_details,
        ))
        .with_state(state)
}
