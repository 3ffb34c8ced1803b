//! Appointment booking and schedule handlers

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
    models::{
        appointments::AppointmentFilter,
        requests::{BookedSlotsQuery, CreateAppointmentRequest, UpdateAppointmentRequest},
    },
    services::appointments,
    state::AppState,
};

// ============================================================================
// BOOKING
// ============================================================================

/// POST /api/v1/appointments
///
/// Books a slot. Date must not be in the past; time must fall on a slot
/// boundary within working hours.
///
/// # HTTP Status Codes
/// - `201 CREATED`: Appointment booked with status `SCHEDULED`
/// - `400 BAD_REQUEST`: Past date or invalid time
/// - `403 FORBIDDEN`: Caller may not book for this doctor/patient
/// - `404 NOT_FOUND`: Doctor or patient not found
/// - `409 CONFLICT`: Slot already booked
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    tracing::info!(
        operation = "create_appointment",
        requester_id = %auth_user.id,
        doctor_id = %request.doctor_id,
        patient_id = %request.patient_id,
        date = %request.appointment_date,
        time = %request.appointment_time,
        "Booking appointment",
    );

    let mut conn = acquire_db_connection(&state, "create_appointment").await?;

    let appointment =
        appointments::create_appointment(&mut conn, &auth_user, &state.config.booking, request)
            .await
            .inspect_err(|e| log_handler_error("create_appointment", e))?;

    tracing::info!(
        operation = "create_appointment",
        appointment_id = %appointment.id,
        "Appointment booked successfully",
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "appointment": appointment,
        })),
    ))
}

/// GET /api/v1/appointments/{id}
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "get_appointment").await?;

    let appointment = appointments::get_appointment(&mut conn, &auth_user, appointment_id)
        .await
        .inspect_err(|e| log_handler_error("get_appointment", e))?;

    Ok(Json(serde_json::json!({
        "appointment": appointment,
    })))
}

/// GET /api/v1/appointments?status=&from=&to=
///
/// Filtered listing across all doctors. Requires ADMIN.
pub async fn list_appointments(
    State(state): State<AppState>,
    Query(filter): Query<AppointmentFilter>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_appointments").await?;

    let appointments = appointments::list_appointments(&mut conn, &auth_user, filter)
        .await
        .inspect_err(|e| log_handler_error("list_appointments", e))?;

    Ok(Json(serde_json::json!({
        "appointments": appointments,
        "count": appointments.len(),
    })))
}

// ============================================================================
// DOCTOR SCHEDULE
// ============================================================================

/// GET /api/v1/appointments/doctor/{doctor_id}
pub async fn list_doctor_appointments(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_doctor_appointments").await?;

    let appointments = appointments::list_doctor_appointments(&mut conn, &auth_user, doctor_id)
        .await
        .inspect_err(|e| log_handler_error("list_doctor_appointments", e))?;

    Ok(Json(serde_json::json!({
        "appointments": appointments,
        "count": appointments.len(),
    })))
}

/// GET /api/v1/appointments/doctor/{doctor_id}/upcoming
pub async fn list_upcoming_doctor_appointments(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_upcoming_doctor_appointments").await?;

    let appointments =
        appointments::list_upcoming_doctor_appointments(&mut conn, &auth_user, doctor_id)
            .await
            .inspect_err(|e| log_handler_error("list_upcoming_doctor_appointments", e))?;

    Ok(Json(serde_json::json!({
        "appointments": appointments,
        "count": appointments.len(),
    })))
}

/// GET /api/v1/appointments/doctor/{doctor_id}/booked-slots?date=YYYY-MM-DD
///
/// Times already taken on the given day. Open to any caller that can book.
pub async fn get_booked_slots(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<BookedSlotsQuery>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "get_booked_slots").await?;

    let slots = appointments::get_booked_slots(&mut conn, &auth_user, doctor_id, query.date)
        .await
        .inspect_err(|e| log_handler_error("get_booked_slots", e))?;

    Ok(Json(serde_json::json!({
        "slots": slots,
    })))
}

// ============================================================================
// PATIENT SCHEDULE
// ============================================================================

/// GET /api/v1/appointments/patient/{patient_id}
pub async fn list_patient_appointments(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_patient_appointments").await?;

    let appointments = appointments::list_patient_appointments(&mut conn, &auth_user, patient_id)
        .await
        .inspect_err(|e| log_handler_error("list_patient_appointments", e))?;

    Ok(Json(serde_json::json!({
        "appointments": appointments,
        "count": appointments.len(),
    })))
}

/// GET /api/v1/appointments/patient/{patient_id}/upcoming
pub async fn list_upcoming_patient_appointments(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_upcoming_patient_appointments").await?;

    let appointments =
        appointments::list_upcoming_patient_appointments(&mut conn, &auth_user, patient_id)
            .await
            .inspect_err(|e| log_handler_error("list_upcoming_patient_appointments", e))?;

    Ok(Json(serde_json::json!({
        "appointments": appointments,
        "count": appointments.len(),
    })))
}

/// GET /api/v1/appointments/patient/{patient_id}/history
///
/// Past or completed appointments, newest first.
pub async fn list_patient_history(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let mut conn = acquire_db_connection(&state, "list_patient_history").await?;

    let appointments = appointments::list_patient_history(&mut conn, &auth_user, patient_id)
        .await
        .inspect_err(|e| log_handler_error("list_patient_history", e))?;

    Ok(Json(serde_json::json!({
        "appointments": appointments,
        "count": appointments.len(),
    })))
}

// ============================================================================
// CHANGES
// ============================================================================

/// PUT /api/v1/appointments/{id}
///
/// Reschedule and/or change status. Patients may only cancel.
///
/// # HTTP Status Codes
/// - `200 OK`: Appointment updated
/// - `400 BAD_REQUEST`: Past date or invalid time
/// - `403 FORBIDDEN`: Caller may not modify this appointment or set this status
/// - `404 NOT_FOUND`: Appointment not found
/// - `409 CONFLICT`: New slot already booked
pub async fn update_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<serde_json::Value>> {
    tracing::info!(
        operation = "update_appointment",
        requester_id = %auth_user.id,
        appointment_id = %appointment_id,
        "Updating appointment",
    );

    let mut conn = acquire_db_connection(&state, "update_appointment").await?;

    let appointment = appointments::update_appointment(
        &mut conn,
        &auth_user,
        &state.config.booking,
        appointment_id,
        request,
    )
    .await
    .inspect_err(|e| log_handler_error("update_appointment", e))?;

    tracing::info!(
        operation = "update_appointment",
        appointment_id = %appointment.id,
        status = %appointment.status,
        "Appointment updated successfully",
    );

    Ok(Json(serde_json::json!({
        "appointment": appointment,
    })))
}

/// PATCH /api/v1/appointments/{id}/cancel
///
/// Sets status to `CANCELLED`, freeing the slot.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<StatusCode> {
    tracing::info!(
        operation = "cancel_appointment",
        requester_id = %auth_user.id,
        appointment_id = %appointment_id,
        "Cancelling appointment",
    );

    let mut conn = acquire_db_connection(&state, "cancel_appointment").await?;

    appointments::cancel_appointment(&mut conn, &auth_user, appointment_id)
        .await
        .inspect_err(|e| log_handler_error("cancel_appointment", e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/appointments/{id}
///
/// Hard delete. Requires ADMIN.
pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<StatusCode> {
    tracing::info!(
        operation = "delete_appointment",
        requester_id = %auth_user.id,
        appointment_id = %appointment_id,
        "Deleting appointment",
    );

    let mut conn = acquire_db_connection(&state, "delete_appointment").await?;

    appointments::delete_appointment(&mut conn, &auth_user, appointment_id)
        .await
        .inspect_err(|e| log_handler_error("delete_appointment", e))?;

    tracing::info!(
        operation = "delete_appointment",
        appointment_id = %appointment_id,
        "Appointment deleted successfully",
    );

    Ok(StatusCode::NO_CONTENT)
}
