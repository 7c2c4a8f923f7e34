//! Administrative handlers
//!
//! Mounted behind `require_roles` with the admin role set.

use super::auth::UserMessageResponse;
use crate::auth::{AccountStatusRequest, ClientInfo, RequestIdentity};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// Activate or deactivate an account
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/status",
    tag = "admin",
    params(
        ("id" = Uuid, Path, description = "Account ID")
    ),
    request_body = AccountStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = UserMessageResponse),
        (status = 400, description = "Cannot deactivate own account", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_account_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<RequestIdentity>,
    Path(user_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<AccountStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let user = state
        .auth_service()
        .set_active(&admin, user_id, request.is_active, &client)
        .await?;

    let message = if user.is_active {
        "Account activated"
    } else {
        "Account deactivated"
    };

    Ok(Json(UserMessageResponse {
        message: message.to_string(),
        user,
    }))
}
