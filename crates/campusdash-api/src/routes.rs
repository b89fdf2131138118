use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::error::ApiError;
use crate::middleware::{authenticate, require_auth};
use crate::state::AppState;
use crate::{auth, directory, requests, runner};

/// The full HTTP surface. Every route sees the bearer identity, if any;
/// `/auth/me` additionally requires one.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(directory::health))
        .route("/auth/otp/send", post(auth::send_otp))
        .route("/auth/otp/verify", post(auth::verify_otp))
        .route("/auth/refresh", post(auth::refresh))
        .route("/locations", get(directory::list_locations))
        .route("/users", get(directory::list_users));

    let request_routes = Router::new()
        .route("/requests", post(requests::create_request).get(requests::list_requests))
        .route("/requests/{id}", get(requests::get_request))
        .route("/requests/{id}/status", patch(requests::update_status));

    let runner_routes = Router::new()
        .route("/runner/summary", get(runner::summary))
        .route("/runner/tasks", get(runner::tasks))
        .route("/runner/tasks/{id}/accept", post(runner::accept_task))
        .route("/runner/tasks/{id}/start", post(runner::start_task))
        .route("/runner/tasks/{id}/complete", post(runner::complete_task));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .merge(public_routes)
        .merge(request_routes)
        .merge(runner_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".into())
}
