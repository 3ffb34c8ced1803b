//! Patient record handlers

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
    models::requests::{CreatePatientRequest, NameSearchQuery, UpdatePatientRequest},
    services::patients,
    state::AppState,
};

/// POST /api/v1/patients
///
/// ADMIN creates unlinked profiles; a PATIENT creates their own, linked to
/// their account.
///
/// # HTTP Status Codes
/// - `201 CREATED`: Patient created
/// - `400 BAD_REQUEST`: Validation error
/// - `403 FORBIDDEN`: Caller may not create patients
/// - `409 CONFLICT`: Email/phone taken, or caller already has a profile
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    tracing::info!(
        operation = "create_patient",
        requester_id = %auth_user.id,
        "Creating patient",
    );

    let mut conn = acquire_db_connection(&state, "create_patient").await?;

    let patient = patients::create_patient(&mut conn, &auth_user, request)
        .await
        .inspect_err(|e| log_handler_error("create_patient", e))?;

    tracing::info!(
        operation = "create_patient",
        patient_id = %patient.id,
        linked = patient.user_id.is_some(),
        "Patient created successfully",
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "patient": patient,
        })),
    ))
}

/// GET /api/v1/patients (ADMIN, DOCTOR)
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_patients").await?;

    let patients = patients::list_patients(&mut conn, &auth_user)
        .await
        .inspect_err(|e| log_handler_error("list_patients", e))?;

    Ok(Json(serde_json::json!({
        "patients": patients,
        "count": patients.len(),
    })))
}

/// GET /api/v1/patients/{id}
pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "get_patient").await?;

    let patient = patients::get_patient(&mut conn, &auth_user, patient_id)
        .await
        .inspect_err(|e| log_handler_error("get_patient", e))?;

    Ok(Json(serde_json::json!({
        "patient": patient,
    })))
}

/// GET /api/v1/patients/email/{email}
pub async fn get_patient_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "get_patient_by_email").await?;

    let patient = patients::get_patient_by_email(&mut conn, &auth_user, &email)
        .await
        .inspect_err(|e| log_handler_error("get_patient_by_email", e))?;

    Ok(Json(serde_json::json!({
        "patient": patient,
    })))
}

/// GET /api/v1/patients/phone/{phone}
pub async fn get_patient_by_phone(
    State(state): State<AppState>,
    Path(phone): Path<String>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "get_patient_by_phone").await?;

    let patient = patients::get_patient_by_phone(&mut conn, &auth_user, &phone)
        .await
        .inspect_err(|e| log_handler_error("get_patient_by_phone", e))?;

    Ok(Json(serde_json::json!({
        "patient": patient,
    })))
}

/// GET /api/v1/patients/search?name= (ADMIN, DOCTOR)
pub async fn search_patients(
    State(state): State<AppState>,
    Query(query): Query<NameSearchQuery>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "search_patients").await?;

    let patients = patients::search_patients(&mut conn, &auth_user, &query.name)
        .await
        .inspect_err(|e| log_handler_error("search_patients", e))?;

    Ok(Json(serde_json::json!({
        "patients": patients,
        "count": patients.len(),
    })))
}

/// GET /api/v1/patients/by-doctor/{doctor_id}
///
/// Distinct patients who have booked with the doctor. ADMIN or that doctor.
pub async fn list_patients_by_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_patients_by_doctor").await?;

    let patients = patients::list_patients_by_doctor(&mut conn, &auth_user, doctor_id)
        .await
        .inspect_err(|e| log_handler_error("list_patients_by_doctor", e))?;

    Ok(Json(serde_json::json!({
        "patients": patients,
        "count": patients.len(),
    })))
}

/// PUT /api/v1/patients/{id}
///
/// Partial update by ADMIN or the owning PATIENT.
pub async fn update_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<serde_json::Value>> {
    tracing::info!(
        operation = "update_patient",
        requester_id = %auth_user.id,
        patient_id = %patient_id,
        "Updating patient",
    );

    let mut conn = acquire_db_connection(&state, "update_patient").await?;

    let patient = patients::update_patient(&mut conn, &auth_user, patient_id, request)
        .await
        .inspect_err(|e| log_handler_error("update_patient", e))?;

    tracing::info!(
        operation = "update_patient",
        patient_id = %patient.id,
        "Patient updated successfully",
    );

    Ok(Json(serde_json::json!({
        "patient": patient,
    })))
}

/// DELETE /api/v1/patients/{id}
///
/// # HTTP Status Codes
/// - `204 NO_CONTENT`: Patient deleted
/// - `403 FORBIDDEN`: Caller is not ADMIN
/// - `404 NOT_FOUND`: Patient not found
/// - `409 CONFLICT`: Patient still has appointments
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<StatusCode> {
    tracing::info!(
        operation = "delete_patient",
        requester_id = %auth_user.id,
        patient_id = %patient_id,
        "Deleting patient",
    );

    let mut conn = acquire_db_connection(&state, "delete_patient").await?;

    patients::delete_patient(&mut conn, &auth_user, patient_id)
        .await
        .inspect_err(|e| log_handler_error("delete_patient", e))?;

    tracing::info!(
        operation = "delete_patient",
        patient_id = %patient_id,
        "Patient deleted successfully",
    );

    Ok(StatusCode::NO_CONTENT)
}
