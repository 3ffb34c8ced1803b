//! Doctor directory handlers
//!
//! Thin layer: extract, log, delegate to `services::doctors`, wrap the JSON.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use crate::{
    error::Result,
    handlers::{acquire_db_connection, log_handler_error},
    middleware::auth::AuthenticatedUser,
    models::requests::{
        CreateDoctorRequest, MostBookedQuery, NameSearchQuery, UpdateDoctorRequest,
    },
    services::doctors,
    state::AppState,
};

// ============================================================================
// CREATE
// ============================================================================

/// POST /api/v1/doctors
///
/// Creates a doctor profile. Requires ADMIN.
///
/// # HTTP Status Codes
/// - `201 CREATED`: Doctor created
/// - `400 BAD_REQUEST`: Validation error
/// - `403 FORBIDDEN`: Caller is not ADMIN
/// - `409 CONFLICT`: Email already used by another doctor
pub async fn create_doctor(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    tracing::info!(
        operation = "create_doctor",
        requester_id = %auth_user.id,
        "Creating doctor",
    );

    let mut conn = acquire_db_connection(&state, "create_doctor").await?;

    let doctor = doctors::create_doctor(&mut conn, &auth_user, request)
        .await
        .inspect_err(|e| log_handler_error("create_doctor", e))?;

    tracing::info!(
        operation = "create_doctor",
        doctor_id = %doctor.id,
        "Doctor created successfully",
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "doctor": doctor,
        })),
    ))
}

// ============================================================================
// READ
// ============================================================================

/// GET /api/v1/doctors
pub async fn list_doctors(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_doctors").await?;

    let doctors = doctors::list_doctors(&mut conn, &auth_user)
        .await
        .inspect_err(|e| log_handler_error("list_doctors", e))?;

    Ok(Json(serde_json::json!({
        "doctors": doctors,
        "count": doctors.len(),
    })))
}

/// GET /api/v1/doctors/{id}
pub async fn get_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "get_doctor").await?;

    let doctor = doctors::get_doctor(&mut conn, &auth_user, doctor_id)
        .await
        .inspect_err(|e| log_handler_error("get_doctor", e))?;

    Ok(Json(serde_json::json!({
        "doctor": doctor,
    })))
}

/// GET /api/v1/doctors/email/{email}
pub async fn get_doctor_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "get_doctor_by_email").await?;

    let doctor = doctors::get_doctor_by_email(&mut conn, &auth_user, &email)
        .await
        .inspect_err(|e| log_handler_error("get_doctor_by_email", e))?;

    Ok(Json(serde_json::json!({
        "doctor": doctor,
    })))
}

/// GET /api/v1/doctors/specialization/{specialization}
///
/// Case-insensitive match, sorted by name.
pub async fn list_doctors_by_specialization(
    State(state): State<AppState>,
    Path(specialization): Path<String>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_doctors_by_specialization").await?;

    let doctors = doctors::list_doctors_by_specialization(&mut conn, &auth_user, &specialization)
        .await
        .inspect_err(|e| log_handler_error("list_doctors_by_specialization", e))?;

    Ok(Json(serde_json::json!({
        "doctors": doctors,
        "count": doctors.len(),
    })))
}

/// GET /api/v1/doctors/search?name=
pub async fn search_doctors(
    State(state): State<AppState>,
    Query(query): Query<NameSearchQuery>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "search_doctors").await?;

    let doctors = doctors::search_doctors(&mut conn, &auth_user, &query.name)
        .await
        .inspect_err(|e| log_handler_error("search_doctors", e))?;

    Ok(Json(serde_json::json!({
        "doctors": doctors,
        "count": doctors.len(),
    })))
}

/// GET /api/v1/doctors/most-booked?limit=
///
/// Doctors ranked by active appointment count. Requires ADMIN.
pub async fn list_most_booked_doctors(
    State(state): State<AppState>,
    Query(query): Query<MostBookedQuery>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_most_booked_doctors").await?;

    let doctors = doctors::list_most_booked_doctors(&mut conn, &auth_user, query.limit)
        .await
        .inspect_err(|e| log_handler_error("list_most_booked_doctors", e))?;

    Ok(Json(serde_json::json!({
        "doctors": doctors,
        "count": doctors.len(),
    })))
}

// ============================================================================
// UPDATE / DELETE
// ============================================================================

/// PUT /api/v1/doctors/{id}
///
/// Partial update by ADMIN or the doctor linked to the profile.
///
/// # HTTP Status Codes
/// - `200 OK`: Doctor updated
/// - `400 BAD_REQUEST`: Validation error
/// - `403 FORBIDDEN`: Not ADMIN and not the profile owner
/// - `404 NOT_FOUND`: Doctor not found
/// - `409 CONFLICT`: New email already used
pub async fn update_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<serde_json::Value>> {
    tracing::info!(
        operation = "update_doctor",
        requester_id = %auth_user.id,
        doctor_id = %doctor_id,
        "Updating doctor",
    );

    let mut conn = acquire_db_connection(&state, "update_doctor").await?;

    let doctor = doctors::update_doctor(&mut conn, &auth_user, doctor_id, request)
        .await
        .inspect_err(|e| log_handler_error("update_doctor", e))?;

    tracing::info!(
        operation = "update_doctor",
        doctor_id = %doctor.id,
        "Doctor updated successfully",
    );

    Ok(Json(serde_json::json!({
        "doctor": doctor,
    })))
}

/// DELETE /api/v1/doctors/{id}
///
/// # HTTP Status Codes
/// - `204 NO_CONTENT`: Doctor deleted
/// - `403 FORBIDDEN`: Caller is not ADMIN
/// - `404 NOT_FOUND`: Doctor not found
/// - `409 CONFLICT`: Doctor still has appointments
pub async fn delete_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<StatusCode> {
    tracing::info!(
        operation = "delete_doctor",
        requester_id = %auth_user.id,
        doctor_id = %doctor_id,
        "Deleting doctor",
    );

    let mut conn = acquire_db_connection(&state, "delete_doctor").await?;

    doctors::delete_doctor(&mut conn, &auth_user, doctor_id)
        .await
        .inspect_err(|e| log_handler_error("delete_doctor", e))?;

    tracing::info!(
        operation = "delete_doctor",
        doctor_id = %doctor_id,
        "Doctor deleted successfully",
    );

    Ok(StatusCode::NO_CONTENT)
}
