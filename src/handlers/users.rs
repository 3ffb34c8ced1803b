//! Account administration handlers

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use crate::{
    error::Result,
    handlers::{acquire_db_connection, log_handler_error},
    middleware::auth::AuthenticatedUser,
    models::users::UpdateUser,
    services::users,
    state::AppState,
};

/// GET /api/v1/users
///
/// Lists all accounts. Requires ADMIN.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    tracing::info!(
        operation = "list_users",
        requester_id = %auth_user.id,
        "Listing users",
    );

    let mut conn = acquire_db_connection(&state, "list_users").await?;

    let users = users::list_users(&mut conn, &auth_user)
        .await
        .inspect_err(|e| log_handler_error("list_users", e))?;

    Ok(Json(serde_json::json!({
        "users": users,
        "count": users.len(),
    })))
}

/// GET /api/v1/users/{id}
///
/// ADMIN may read any account; other callers only their own.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "get_user").await?;

    let user = users::get_user(&mut conn, &auth_user, user_id)
        .await
        .inspect_err(|e| log_handler_error("get_user", e))?;

    Ok(Json(serde_json::json!({
        "user": user,
    })))
}

/// PATCH /api/v1/users/{id}
///
/// Partial update of `email`, `enabled` and `roles`. Requires ADMIN.
///
/// # HTTP Status Codes
/// - `200 OK`: Account updated
/// - `400 BAD_REQUEST`: Invalid email, empty roles, or self-lockout
/// - `403 FORBIDDEN`: Caller is not ADMIN
/// - `404 NOT_FOUND`: No such account
/// - `409 CONFLICT`: Email already registered
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<UpdateUser>,
) -> Result<Json<serde_json::Value>> {
    tracing::info!(
        operation = "update_user",
        requester_id = %auth_user.id,
        user_id = %user_id,
        "Updating user",
    );

    let mut conn = acquire_db_connection(&state, "update_user").await?;

    let user = users::update_user(&mut conn, &auth_user, user_id, request)
        .await
        .inspect_err(|e| log_handler_error("update_user", e))?;

    tracing::info!(
        operation = "update_user",
        user_id = %user.id,
        enabled = user.enabled,
        "User updated successfully",
    );

    Ok(Json(serde_json::json!({
        "user": user,
    })))
}

/// DELETE /api/v1/users/{id}
///
/// Deletes an account; linked profiles are kept and unlinked. Requires ADMIN.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<StatusCode> {
    tracing::info!(
        operation = "delete_user",
        requester_id = %auth_user.id,
        user_id = %user_id,
        "Deleting user",
    );

    let mut conn = acquire_db_connection(&state, "delete_user").await?;

    users::delete_user(&mut conn, &auth_user, user_id)
        .await
        .inspect_err(|e| log_handler_error("delete_user", e))?;

    tracing::info!(
        operation = "delete_user",
        user_id = %user_id,
        "User deleted successfully",
    );

    Ok(StatusCode::NO_CONTENT)
}
