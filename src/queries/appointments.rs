use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    models::appointments::{
        Appointment, AppointmentChanges, AppointmentFilter, AppointmentStatus, NewAppointment,
    },
    queries::map_constraint_error,
};

use crate::DbConn;

/// Inserts a SCHEDULED appointment and returns it with doctor and patient names.
pub async fn create_appointment(
    conn: &mut DbConn,
    new_appointment: NewAppointment,
) -> Result<Appointment> {
    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        WITH inserted AS (
            INSERT INTO appointments (doctor_id, patient_id, appointment_date, appointment_time, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        )
        SELECT a.id, a.doctor_id, d.name AS doctor_name, a.patient_id, p.name AS patient_name,
               a.appointment_date, a.appointment_time, a.status, a.created_at, a.updated_at
        FROM inserted a
        JOIN doctors d ON d.id = a.doctor_id
        JOIN patients p ON p.id = a.patient_id
        "#,
    )
    .bind(new_appointment.doctor_id)
    .bind(new_appointment.patient_id)
    .bind(new_appointment.appointment_date)
    .bind(new_appointment.appointment_time)
    .bind(AppointmentStatus::Scheduled)
    .fetch_one(conn)
    .await
    .map_err(map_constraint_error)?;

    Ok(appointment)
}

/// Gets an appointment by ID. The appointment may not exist.
pub async fn get_appointment_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<Appointment>> {
    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT a.id, a.doctor_id, d.name AS doctor_name, a.patient_id, p.name AS patient_name,
               a.appointment_date, a.appointment_time, a.status, a.created_at, a.updated_at
        FROM appointments a
        JOIN doctors d ON d.id = a.doctor_id
        JOIN patients p ON p.id = a.patient_id
        WHERE a.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(appointment)
}

/// All appointments of a doctor in chronological order.
pub async fn list_appointments_by_doctor(
    conn: &mut DbConn,
    doctor_id: Uuid,
) -> Result<Vec<Appointment>> {
    let appointments = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT a.id, a.doctor_id, d.name AS doctor_name, a.patient_id, p.name AS patient_name,
               a.appointment_date, a.appointment_time, a.status, a.created_at, a.updated_at
        FROM appointments a
        JOIN doctors d ON d.id = a.doctor_id
        JOIN patients p ON p.id = a.patient_id
        WHERE a.doctor_id = $1
        ORDER BY a.appointment_date, a.appointment_time
        "#,
    )
    .bind(doctor_id)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(appointments)
}

/// Appointments of a doctor from `today` on, soonest first.
pub async fn list_upcoming_by_doctor(
    conn: &mut DbConn,
    doctor_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<Appointment>> {
    let appointments = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT a.id, a.doctor_id, d.name AS doctor_name, a.patient_id, p.name AS patient_name,
               a.appointment_date, a.appointment_time, a.status, a.created_at, a.updated_at
        FROM appointments a
        JOIN doctors d ON d.id = a.doctor_id
        JOIN patients p ON p.id = a.patient_id
        WHERE a.doctor_id = $1
          AND a.appointment_date >= $2
        ORDER BY a.appointment_date, a.appointment_time
        "#,
    )
    .bind(doctor_id)
    .bind(today)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(appointments)
}

/// All appointments of a patient in chronological order.
pub async fn list_appointments_by_patient(
    conn: &mut DbConn,
    patient_id: Uuid,
) -> Result<Vec<Appointment>> {
    let appointments = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT a.id, a.doctor_id, d.name AS doctor_name, a.patient_id, p.name AS patient_name,
               a.appointment_date, a.appointment_time, a.status, a.created_at, a.updated_at
        FROM appointments a
        JOIN doctors d ON d.id = a.doctor_id
        JOIN patients p ON p.id = a.patient_id
        WHERE a.patient_id = $1
        ORDER BY a.appointment_date, a.appointment_time
        "#,
    )
    .bind(patient_id)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(appointments)
}

/// Appointments of a patient from `today` on, soonest first.
pub async fn list_upcoming_by_patient(
    conn: &mut DbConn,
    patient_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<Appointment>> {
    let appointments = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT a.id, a.doctor_id, d.name AS doctor_name, a.patient_id, p.name AS patient_name,
               a.appointment_date, a.appointment_time, a.status, a.created_at, a.updated_at
        FROM appointments a
        JOIN doctors d ON d.id = a.doctor_id
        JOIN patients p ON p.id = a.patient_id
        WHERE a.patient_id = $1
          AND a.appointment_date >= $2
        ORDER BY a.appointment_date, a.appointment_time
        "#,
    )
    .bind(patient_id)
    .bind(today)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(appointments)
}

/// Past or completed appointments of a patient, newest first.
pub async fn list_history_by_patient(
    conn: &mut DbConn,
    patient_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<Appointment>> {
    let appointments = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT a.id, a.doctor_id, d.name AS doctor_name, a.patient_id, p.name AS patient_name,
               a.appointment_date, a.appointment_time, a.status, a.created_at, a.updated_at
        FROM appointments a
        JOIN doctors d ON d.id = a.doctor_id
        JOIN patients p ON p.id = a.patient_id
        WHERE a.patient_id = $1
          AND (a.appointment_date < $2 OR a.status = 'COMPLETED')
        ORDER BY a.appointment_date DESC, a.appointment_time DESC
        "#,
    )
    .bind(patient_id)
    .bind(today)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(appointments)
}

/// Lists appointments matching the optional status and inclusive date range.
pub async fn list_appointments(
    conn: &mut DbConn,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>> {
    let appointments = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT a.id, a.doctor_id, d.name AS doctor_name, a.patient_id, p.name AS patient_name,
               a.appointment_date, a.appointment_time, a.status, a.created_at, a.updated_at
        FROM appointments a
        JOIN doctors d ON d.id = a.doctor_id
        JOIN patients p ON p.id = a.patient_id
        WHERE ($1::text IS NULL OR a.status = $1)
          AND ($2::date IS NULL OR a.appointment_date >= $2)
          AND ($3::date IS NULL OR a.appointment_date <= $3)
        ORDER BY a.appointment_date, a.appointment_time
        "#,
    )
    .bind(filter.status.map(|status| status.to_string()))
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(appointments)
}

/// Times of the doctor's non-cancelled appointments on a date.
pub async fn list_booked_times(
    conn: &mut DbConn,
    doctor_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<NaiveTime>> {
    let times = sqlx::query_scalar::<_, NaiveTime>(
        r#"
        SELECT appointment_time
        FROM appointments
        WHERE doctor_id = $1
          AND appointment_date = $2
          AND status <> 'CANCELLED'
        ORDER BY appointment_time
        "#,
    )
    .bind(doctor_id)
    .bind(date)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(times)
}

/// Whether another non-cancelled appointment holds the doctor's slot.
/// `exclude_id` skips the appointment being rescheduled.
pub async fn is_slot_taken(
    conn: &mut DbConn,
    doctor_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
    exclude_id: Option<Uuid>,
) -> Result<bool> {
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM appointments
            WHERE doctor_id = $1
              AND appointment_date = $2
              AND appointment_time = $3
              AND status <> 'CANCELLED'
              AND ($4::uuid IS NULL OR id <> $4)
        )
        "#,
    )
    .bind(doctor_id)
    .bind(date)
    .bind(time)
    .bind(exclude_id)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(taken)
}

/// Writes the resolved date, time and status of an appointment.
pub async fn update_appointment(
    conn: &mut DbConn,
    id: Uuid,
    changes: &AppointmentChanges,
) -> Result<Appointment> {
    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        WITH updated AS (
            UPDATE appointments
            SET appointment_date = $1, appointment_time = $2, status = $3, updated_at = now()
            WHERE id = $4
            RETURNING *
        )
        SELECT a.id, a.doctor_id, d.name AS doctor_name, a.patient_id, p.name AS patient_name,
               a.appointment_date, a.appointment_time, a.status, a.created_at, a.updated_at
        FROM updated a
        JOIN doctors d ON d.id = a.doctor_id
        JOIN patients p ON p.id = a.patient_id
        "#,
    )
    .bind(changes.appointment_date)
    .bind(changes.appointment_time)
    .bind(changes.status)
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(map_constraint_error)?
    .ok_or_else(|| Error::NotFound(format!("Appointment with ID {} not found", id)))?;

    Ok(appointment)
}

/// Sets only the status of an appointment.
pub async fn update_appointment_status(
    conn: &mut DbConn,
    id: Uuid,
    status: AppointmentStatus,
) -> Result<u64> {
    let rows_affected = sqlx::query(
        r#"
        UPDATE appointments
        SET status = $1, updated_at = now()
        WHERE id = $2
        "#,
    )
    .bind(status)
    .bind(id)
    .execute(conn)
    .await
    .map_err(map_constraint_error)?
    .rows_affected();

    Ok(rows_affected)
}

/// Deletes an appointment by ID.
pub async fn delete_appointment(conn: &mut DbConn, id: Uuid) -> Result<u64> {
    let rows_affected = sqlx::query(
        r#"
        DELETE FROM appointments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(conn)
    .await
    .map_err(Error::Sqlx)?
    .rows_affected();

    Ok(rows_affected)
}

/// Number of appointments (any status) referencing the doctor.
pub async fn count_appointments_by_doctor(conn: &mut DbConn, doctor_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM appointments WHERE doctor_id = $1
        "#,
    )
    .bind(doctor_id)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(count)
}

/// Number of appointments (any status) referencing the patient.
pub async fn count_appointments_by_patient(conn: &mut DbConn, patient_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM appointments WHERE patient_id = $1
        "#,
    )
    .bind(patient_id)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(count)
}
