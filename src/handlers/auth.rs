use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
};
use crate::{
    error::Result,
    handlers::{acquire_db_connection, log_handler_error},
    middleware::auth::AuthenticatedUser,
    models::{
        permissions::PermissionValidator,
        users::{AuthResponse, LoginUser, RegisterUser},
    },
    services::users,
    state::AppState,
};

/// POST /api/v1/auth/register
///
/// Registers a new account. DOCTOR and PATIENT accounts get a matching
/// profile, or claim an unlinked one with the same email.
///
/// # Request Body
/// - `username`: 3-50 characters, unique
/// - `email`: unique
/// - `password`: minimum 8 characters
/// - `roles`: optional, defaults to `["PATIENT"]`; `ADMIN` is rejected
/// - `full_name`: required for DOCTOR/PATIENT
/// - `phone`, `specialization`: optional profile fields
///
/// # HTTP Status Codes
/// - `201 CREATED`: Account created, token returned
/// - `400 BAD_REQUEST`: Validation error
/// - `409 CONFLICT`: Username/email taken or profile already claimed
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterUser>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    tracing::info!(
        operation = "register",
        username = %request.username,
        "Registering new user",
    );

    let mut conn = acquire_db_connection(&state, "register").await?;

    let response = users::register_user(&mut conn, &state.config, request)
        .await
        .inspect_err(|e| log_handler_error("register", e))?;

    tracing::info!(
        operation = "register",
        user_id = %response.id,
        "User registered successfully",
    );

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
///
/// Authenticates with username and password and returns a Bearer token.
///
/// # HTTP Status Codes
/// - `200 OK`: Authentication successful
/// - `400 BAD_REQUEST`: Empty username/password
/// - `401 UNAUTHORIZED`: Invalid credentials or disabled account
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginUser>,
) -> Result<Json<AuthResponse>> {
    tracing::info!(
        operation = "login",
        username = %request.username,
        "Login attempt",
    );

    let mut conn = acquire_db_connection(&state, "login").await?;

    let response = users::login_user(&mut conn, &state.config, request)
        .await
        .inspect_err(|e| log_handler_error("login", e))?;

    tracing::info!(
        operation = "login",
        user_id = %response.id,
        "User logged in successfully",
    );

    Ok(Json(response))
}

/// GET /api/v1/auth/me
///
/// Returns the caller's account, linked profile ids and effective permissions.
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "me").await?;

    let identity = users::get_current_user(&mut conn, auth_user.id)
        .await
        .inspect_err(|e| log_handler_error("me", e))?;

    let permissions = PermissionValidator::get_permissions(&identity.user.roles);

    Ok(Json(serde_json::json!({
        "user": identity.user,
        "doctor_id": identity.doctor_id,
        "patient_id": identity.patient_id,
        "permissions": permissions,
    })))
}
