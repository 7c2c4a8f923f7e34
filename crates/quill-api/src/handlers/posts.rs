//! Post API handlers
//!
//! Reads are open to everyone; identity is attached when a valid token is
//! presented. Writes require an authenticated caller, and edit/delete also
//! pass the ownership policy.

use super::MessageResponse;
use crate::audit::{audit_log, extract_ip_address, AuditEvent};
use crate::auth::{can_mutate, CurrentUser, MaybeUser, RequestIdentity, DELETE_OVERRIDE, EDIT_OVERRIDE};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use quill_core::validation::sanitize_string;
use quill_core::{Comment, NewPost, Pagination, Post, PostFilter, PostStatus, PostUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const MAX_COMMENT_LENGTH: usize = 500;

/// Listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPostsQuery {
    /// Page number, from 1
    pub page: Option<u32>,
    /// Page size, 1 to 100 (default 10)
    pub limit: Option<u32>,
    pub category: Option<String>,
    /// Author account ID
    pub author: Option<Uuid>,
    pub status: Option<PostStatus>,
    /// Case-insensitive match on title or content
    pub search: Option<String>,
}

/// Post creation request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "Content must be at least 10 characters long"))]
    pub content: String,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: Option<PostStatus>,
    pub featured_image: Option<String>,
}

/// Partial post update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 10, message = "Content must be at least 10 characters long"))]
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub featured_image: Option<String>,
}

/// New comment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

/// Post as returned to clients
#[derive(Debug, Serialize, ToSchema)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub like_count: usize,
    pub comment_count: usize,
    /// Present only when the caller is identified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by_me: Option<bool>,
}

impl PostView {
    fn new(post: Post, viewer: Option<&RequestIdentity>) -> Self {
        Self {
            like_count: post.likes.len(),
            comment_count: post.comments.len(),
            liked_by_me: viewer.map(|v| post.is_liked_by(v.account_id)),
            post,
        }
    }
}

/// Page metadata
#[derive(Debug, Serialize, ToSchema)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

/// Paginated posts
#[derive(Debug, Serialize, ToSchema)]
pub struct PostListResponse {
    pub posts: Vec<PostView>,
    pub pagination: PageInfo,
}

/// Like toggle result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LikeResponse {
    pub message: String,
    pub likes: usize,
}

/// Comment list after adding one
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentsResponse {
    pub message: String,
    pub comments: Vec<Comment>,
}

/// List posts with pagination and filtering
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    tag = "posts",
    params(ListPostsQuery),
    responses(
        (status = 200, description = "Posts, newest first", body = PostListResponse),
    )
)]
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<ListPostsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::new(query.page, query.limit);
    let filter = PostFilter {
        category: non_empty(query.category),
        author: query.author,
        status: query.status,
        search: non_empty(query.search),
    };

    let (posts, total) = state.posts.list_posts(&filter, &page).await?;

    Ok(Json(PostListResponse {
        posts: posts
            .into_iter()
            .map(|post| PostView::new(post, viewer.as_ref()))
            .collect(),
        pagination: PageInfo {
            page: page.page,
            limit: page.limit,
            total,
            pages: page.pages(total),
        },
    }))
}

/// Get a single post; counts as a view
#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "The post", body = PostView),
        (status = 404, description = "Post not found", body = crate::error::ApiError),
    )
)]
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if state.posts.increment_views(id).await?.is_none() {
        return Err(post_not_found());
    }
    let post = load_post(&state, id).await?;

    Ok(Json(PostView::new(post, viewer.as_ref())))
}

/// Create a post authored by the caller
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    tag = "posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostView),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Json(mut request): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.title = request.title.trim().to_string();
    request.content = request.content.trim().to_string();
    request.validate()?;

    let post = Post::new(
        identity.account_id,
        NewPost {
            title: request.title,
            content: request.content,
            category: non_empty(request.category.map(|c| sanitize_string(&c))),
            tags: clean_tags(request.tags),
            status: request.status,
            featured_image: non_empty(request.featured_image),
        },
    );
    state.posts.insert_post(&post).await?;

    info!(post_id = %post.id, user_id = %identity.account_id, "Post created");

    Ok((StatusCode::CREATED, Json(PostView::new(post, Some(&identity)))))
}

/// Update a post; authors only
#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = PostView),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the author", body = crate::error::ApiError),
        (status = 404, description = "Post not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
    Json(mut request): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.title = request.title.map(|t| t.trim().to_string());
    request.content = request.content.map(|c| c.trim().to_string());
    request.validate()?;

    let mut post = load_post(&state, id).await?;
    if !can_mutate(&identity, &post, EDIT_OVERRIDE) {
        return Err(AppError::Forbidden(
            "You can only update your own posts".to_string(),
        ));
    }

    post.apply(PostUpdate {
        title: request.title,
        content: request.content,
        category: request.category.map(|c| sanitize_string(&c)),
        tags: request.tags.map(clean_tags),
        status: request.status,
        featured_image: request.featured_image,
    });
    state.posts.update_post(&post).await?;

    info!(post_id = %post.id, user_id = %identity.account_id, "Post updated");

    let saved = load_post(&state, id).await?;
    Ok(Json(PostView::new(saved, Some(&identity))))
}

/// Delete a post; authors, or admins for any post
#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the author", body = crate::error::ApiError),
        (status = 404, description = "Post not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let post = load_post(&state, id).await?;
    if !can_mutate(&identity, &post, DELETE_OVERRIDE) {
        return Err(AppError::Forbidden(
            "You can only delete your own posts".to_string(),
        ));
    }

    if !state.posts.delete_post(id).await? {
        return Err(post_not_found());
    }

    if post.author_id != identity.account_id {
        audit_log(&AuditEvent::PostDeletedByOverride {
            post_id: post.id,
            author_id: post.author_id,
            deleted_by: identity.account_id,
            role: identity.account.role.to_string(),
            ip_address: extract_ip_address(&headers),
        });
    }
    info!(post_id = %post.id, user_id = %identity.account_id, "Post deleted");

    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

/// Like or unlike a post
#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/like",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Like toggled", body = LikeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn like_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let toggle = state
        .posts
        .toggle_like(id, identity.account_id)
        .await?
        .ok_or_else(post_not_found)?;

    let message = if toggle.liked { "Post liked" } else { "Post unliked" };

    Ok(Json(LikeResponse {
        message: message.to_string(),
        likes: toggle.likes,
    }))
}

/// Comment on a post
#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/comments",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentsResponse),
        (status = 400, description = "Empty or oversized comment", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest(
            "Comment content is required".to_string(),
        ));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::BadRequest(
            "Comment must be between 1 and 500 characters".to_string(),
        ));
    }

    let comments = state
        .posts
        .add_comment(id, identity.account_id, content)
        .await?
        .ok_or_else(post_not_found)?;

    Ok((
        StatusCode::CREATED,
        Json(CommentsResponse {
            message: "Comment added successfully".to_string(),
            comments,
        }),
    ))
}

async fn load_post(state: &AppState, id: Uuid) -> Result<Post, AppError> {
    state
        .posts
        .find_post(id)
        .await?
        .ok_or_else(post_not_found)
}

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found".to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = sanitize_string(&tag).to_lowercase();
        if !tag.is_empty() && !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    cleaned
}
