//! Appointment booking: slot validation, conflict detection and status changes.

use crate::DbConn;
use crate::{
    config::BookingConfig,
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::{
        appointments::{
            Appointment, AppointmentChanges, AppointmentFilter, AppointmentStatus, NewAppointment,
        },
        permissions::appointment_permissions,
        requests::{BookedSlots, CreateAppointmentRequest, UpdateAppointmentRequest},
    },
    queries,
    services::access,
    validation::{validate_appointment_date, validate_appointment_time},
};
use chrono::{Local, NaiveDate};
use uuid::Uuid;

const SLOT_TAKEN: &str = "Time slot is already booked";

/// The clinic's current calendar date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Appointment with ID {} not found", id))
}

async fn ensure_doctor_exists(conn: &mut DbConn, doctor_id: Uuid) -> Result<()> {
    match queries::doctors::get_doctor_by_id(conn, doctor_id).await? {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(format!("Doctor with ID {} not found", doctor_id))),
    }
}

async fn ensure_patient_exists(conn: &mut DbConn, patient_id: Uuid) -> Result<()> {
    match queries::patients::get_patient_by_id(conn, patient_id).await? {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(format!("Patient with ID {} not found", patient_id))),
    }
}

async fn load_appointment(conn: &mut DbConn, id: Uuid) -> Result<Appointment> {
    queries::appointments::get_appointment_by_id(conn, id)
        .await?
        .ok_or_else(|| not_found(id))
}

/// Merges a partial update onto the stored appointment
fn resolve_changes(current: &Appointment, request: &UpdateAppointmentRequest) -> AppointmentChanges {
    AppointmentChanges {
        appointment_date: request.appointment_date.unwrap_or(current.appointment_date),
        appointment_time: request.appointment_time.unwrap_or(current.appointment_time),
        status: request.status.unwrap_or(current.status),
    }
}

/// Whether the update has to claim the slot again: it keeps occupying a slot
/// and either moves or comes back from cancellation
fn needs_slot_check(current: &Appointment, changes: &AppointmentChanges) -> bool {
    let moved = changes.appointment_date != current.appointment_date
        || changes.appointment_time != current.appointment_time;
    changes.status.occupies_slot() && (moved || !current.status.occupies_slot())
}

/// Books a new appointment in status SCHEDULED
pub async fn create_appointment(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    booking: &BookingConfig,
    request: CreateAppointmentRequest,
) -> Result<Appointment> {
    // 1. Authorization and slot rules
    access::ensure_can_book(caller, request.doctor_id, request.patient_id)?;
    validate_appointment_date(request.appointment_date, today())?;
    validate_appointment_time(request.appointment_time, booking)?;

    // 2. Both parties must exist
    ensure_doctor_exists(conn, request.doctor_id).await?;
    ensure_patient_exists(conn, request.patient_id).await?;

    // 3. Conflict detection; the partial unique index catches races
    let taken = queries::appointments::is_slot_taken(
        conn,
        request.doctor_id,
        request.appointment_date,
        request.appointment_time,
        None,
    )
    .await?;
    if taken {
        return Err(Error::Conflict(SLOT_TAKEN.to_string()));
    }

    queries::appointments::create_appointment(
        conn,
        NewAppointment {
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
            appointment_date: request.appointment_date,
            appointment_time: request.appointment_time,
        },
    )
    .await
}

pub async fn get_appointment(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    id: Uuid,
) -> Result<Appointment> {
    let appointment = load_appointment(conn, id).await?;
    access::ensure_can_view_appointment(caller, &appointment)?;
    Ok(appointment)
}

pub async fn list_doctor_appointments(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    doctor_id: Uuid,
) -> Result<Vec<Appointment>> {
    access::ensure_can_view_doctor_schedule(caller, doctor_id)?;
    ensure_doctor_exists(conn, doctor_id).await?;
    queries::appointments::list_appointments_by_doctor(conn, doctor_id).await
}

pub async fn list_upcoming_doctor_appointments(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    doctor_id: Uuid,
) -> Result<Vec<Appointment>> {
    access::ensure_can_view_doctor_schedule(caller, doctor_id)?;
    ensure_doctor_exists(conn, doctor_id).await?;
    queries::appointments::list_upcoming_by_doctor(conn, doctor_id, today()).await
}

/// Occupied times of a doctor on a date, for availability display
pub async fn get_booked_slots(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    doctor_id: Uuid,
    date: NaiveDate,
) -> Result<BookedSlots> {
    access::require_permission(caller, appointment_permissions::VIEW_AVAILABILITY)?;
    ensure_doctor_exists(conn, doctor_id).await?;

    let booked_times = queries::appointments::list_booked_times(conn, doctor_id, date).await?;
    Ok(BookedSlots {
        doctor_id,
        date,
        booked_times,
    })
}

pub async fn list_patient_appointments(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    patient_id: Uuid,
) -> Result<Vec<Appointment>> {
    access::ensure_can_view_patient_appointments(caller, patient_id)?;
    ensure_patient_exists(conn, patient_id).await?;
    queries::appointments::list_appointments_by_patient(conn, patient_id).await
}

pub async fn list_upcoming_patient_appointments(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    patient_id: Uuid,
) -> Result<Vec<Appointment>> {
    access::ensure_can_view_patient_appointments(caller, patient_id)?;
    ensure_patient_exists(conn, patient_id).await?;
    queries::appointments::list_upcoming_by_patient(conn, patient_id, today()).await
}

pub async fn list_patient_history(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    patient_id: Uuid,
) -> Result<Vec<Appointment>> {
    access::ensure_can_view_patient_appointments(caller, patient_id)?;
    ensure_patient_exists(conn, patient_id).await?;
    queries::appointments::list_history_by_patient(conn, patient_id, today()).await
}

/// Admin listing filtered by status and inclusive date range
pub async fn list_appointments(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    filter: AppointmentFilter,
) -> Result<Vec<Appointment>> {
    access::require_permission(caller, appointment_permissions::READ_ALL)?;

    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(Error::validation("from", "Start date must not be after end date"));
        }
    }

    queries::appointments::list_appointments(conn, &filter).await
}

/// Reschedules and/or changes the status of an appointment
pub async fn update_appointment(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    booking: &BookingConfig,
    id: Uuid,
    request: UpdateAppointmentRequest,
) -> Result<Appointment> {
    let current = load_appointment(conn, id).await?;

    // 1. Authorization
    access::ensure_can_modify_appointment(caller, &current)?;
    if let Some(status) = request.status {
        access::ensure_can_set_status(caller, &current, status)?;
    }

    // 2. Validate the fields that were sent
    if let Some(date) = request.appointment_date {
        validate_appointment_date(date, today())?;
    }
    if let Some(time) = request.appointment_time {
        validate_appointment_time(time, booking)?;
    }

    // 3. Conflict detection against other active bookings
    let changes = resolve_changes(&current, &request);
    if needs_slot_check(&current, &changes) {
        let taken = queries::appointments::is_slot_taken(
            conn,
            current.doctor_id,
            changes.appointment_date,
            changes.appointment_time,
            Some(current.id),
        )
        .await?;
        if taken {
            return Err(Error::Conflict(SLOT_TAKEN.to_string()));
        }
    }

    queries::appointments::update_appointment(conn, id, &changes).await
}

/// Cancels an appointment, freeing its slot
pub async fn cancel_appointment(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    id: Uuid,
) -> Result<()> {
    let current = load_appointment(conn, id).await?;
    access::ensure_can_set_status(caller, &current, AppointmentStatus::Cancelled)?;

    let rows_affected =
        queries::appointments::update_appointment_status(conn, id, AppointmentStatus::Cancelled)
            .await?;
    if rows_affected == 0 {
        return Err(not_found(id));
    }

    Ok(())
}

/// Deletes an appointment outright (admin only)
pub async fn delete_appointment(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    id: Uuid,
) -> Result<()> {
    access::require_permission(caller, appointment_permissions::DELETE)?;

    let rows_affected = queries::appointments::delete_appointment(conn, id).await?;
    if rows_affected == 0 {
        return Err(not_found(id));
    }

    Ok(())
}
