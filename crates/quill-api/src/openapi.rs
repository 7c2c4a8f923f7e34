//! OpenAPI document served at `/api-docs/openapi.json`

use crate::auth::{
    AccountStatusRequest, AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest,
    UpdateProfileRequest,
};
use crate::error::{ApiError, FieldError};
use crate::handlers::auth::{UserMessageResponse, UserResponse};
use crate::handlers::health::{HealthResponse, ReadinessChecks, ReadinessResponse};
use crate::handlers::posts::{
    CommentRequest, CommentsResponse, CreatePostRequest, LikeResponse, PageInfo,
    PostListResponse, PostView, UpdatePostRequest,
};
use crate::handlers::{admin, auth, health, posts, MessageResponse};
use quill_core::{Comment, Post, PostStatus, Profile, Role, UserPublic};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "Quill API", description = "Blog backend with token authentication"),
    paths(
        health::health_check,
        health::readiness_check,
        auth::register_handler,
        auth::login_handler,
        auth::me_handler,
        auth::update_profile_handler,
        auth::change_password_handler,
        admin::set_account_status_handler,
        posts::list_posts,
        posts::get_post,
        posts::create_post,
        posts::update_post,
        posts::delete_post,
        posts::like_post,
        posts::add_comment,
    ),
    components(schemas(
        ApiError,
        FieldError,
        MessageResponse,
        HealthResponse,
        ReadinessResponse,
        ReadinessChecks,
        RegisterRequest,
        LoginRequest,
        UpdateProfileRequest,
        ChangePasswordRequest,
        AccountStatusRequest,
        AuthResponse,
        UserResponse,
        UserMessageResponse,
        UserPublic,
        Profile,
        Role,
        Post,
        PostStatus,
        Comment,
        PostView,
        PageInfo,
        PostListResponse,
        CreatePostRequest,
        UpdatePostRequest,
        CommentRequest,
        LikeResponse,
        CommentsResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "auth", description = "Registration, login and account"),
        (name = "admin", description = "Account administration"),
        (name = "posts", description = "Posts, likes and comments"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
