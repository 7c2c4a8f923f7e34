//! API route definitions

use crate::auth::{require_auth, require_roles};
use crate::handlers::{admin, auth, posts};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use quill_core::{Role, RoleSet};
use std::sync::Arc;

/// Roles allowed on `/admin` routes
pub const ADMIN_ROLES: RoleSet = RoleSet::only(Role::Admin);

/// Create API v1 routes
pub fn api_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let gate = state.gate.clone();

    // Public routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler));

    // Posts pick their gate mode per handler through the
    // `CurrentUser` / `MaybeUser` extractors
    let post_routes = Router::new()
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/:id/like", post(posts::like_post))
        .route("/posts/:id/comments", post(posts::add_comment));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/profile", put(auth::update_profile_handler))
        .route("/auth/password", put(auth::change_password_handler))
        .route_layer(middleware::from_fn_with_state(gate.clone(), require_auth));

    // Admin routes (authentication and admin role required)
    let admin_routes = Router::new()
        .route(
            "/admin/users/:id/status",
            put(admin::set_account_status_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            (gate, ADMIN_ROLES),
            require_roles,
        ));

    Router::new()
        .merge(public_routes)
        .merge(post_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}
