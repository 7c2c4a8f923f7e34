//! Quill API - blog backend HTTP server
//!
//! Token-authenticated REST endpoints for accounts and posts, built on the
//! auth core in [`auth`]: credential hashing, token issue/verify, identity
//! resolution, the access gate and the ownership policy.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use crate::error::AppError;
use crate::handlers::health;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use axum::{http::Uri, middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the full application router around `state`
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = middleware::cors_layer(&state.config.server);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", routes::api_routes(&state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .layer(axum_middleware::from_fn(middleware::security_headers))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Route not found: {uri}"))
}

/// In-memory state with a cheap hasher, for tests
#[cfg(any(test, feature = "test-utils"))]
pub fn test_state() -> Arc<AppState> {
    use crate::auth::{CredentialHasher, HasherConfig};
    use quill_core::AppConfig;

    let hasher = CredentialHasher::new(&HasherConfig::light()).expect("light hasher params");
    Arc::new(AppState::in_memory(AppConfig::default(), hasher))
}

/// Router over a fresh [`test_state`]
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(test_state())
}
