use uuid::Uuid;

use crate::{
    error::{Error, Result},
    models::doctors::{Doctor, DoctorWithBookings, NewDoctor},
    queries::{contains_pattern, map_constraint_error},
};

use crate::DbConn;

/// Creates a new doctor profile.
pub async fn create_doctor(conn: &mut DbConn, new_doctor: NewDoctor) -> Result<Doctor> {
    let doctor = sqlx::query_as::<_, Doctor>(
        r#"
        INSERT INTO doctors (user_id, name, specialization, email, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, name, specialization, email, phone, created_at, updated_at
        "#,
    )
    .bind(new_doctor.user_id)
    .bind(&new_doctor.name)
    .bind(&new_doctor.specialization)
    .bind(&new_doctor.email)
    .bind(&new_doctor.phone)
    .fetch_one(conn)
    .await
    .map_err(map_constraint_error)?;

    Ok(doctor)
}

/// Gets a doctor by ID. The doctor may not exist.
pub async fn get_doctor_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<Doctor>> {
    let doctor = sqlx::query_as::<_, Doctor>(
        r#"
        SELECT id, user_id, name, specialization, email, phone, created_at, updated_at
        FROM doctors
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(doctor)
}

/// Gets a doctor by (normalized) email. The doctor may not exist.
pub async fn get_doctor_by_email(conn: &mut DbConn, email: &str) -> Result<Option<Doctor>> {
    let doctor = sqlx::query_as::<_, Doctor>(
        r#"
        SELECT id, user_id, name, specialization, email, phone, created_at, updated_at
        FROM doctors
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(doctor)
}

/// Lists all doctors ordered by name.
pub async fn list_doctors(conn: &mut DbConn) -> Result<Vec<Doctor>> {
    let doctors = sqlx::query_as::<_, Doctor>(
        r#"
        SELECT id, user_id, name, specialization, email, phone, created_at, updated_at
        FROM doctors
        ORDER BY name, id
        "#,
    )
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(doctors)
}

/// Lists doctors with the given specialization (case-insensitive), ordered by name.
pub async fn list_doctors_by_specialization(
    conn: &mut DbConn,
    specialization: &str,
) -> Result<Vec<Doctor>> {
    let doctors = sqlx::query_as::<_, Doctor>(
        r#"
        SELECT id, user_id, name, specialization, email, phone, created_at, updated_at
        FROM doctors
        WHERE lower(specialization) = lower($1)
        ORDER BY name, id
        "#,
    )
    .bind(specialization)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(doctors)
}

/// Finds doctors whose name contains the search term, ignoring case.
pub async fn search_doctors_by_name(conn: &mut DbConn, name: &str) -> Result<Vec<Doctor>> {
    let doctors = sqlx::query_as::<_, Doctor>(
        r#"
        SELECT id, user_id, name, specialization, email, phone, created_at, updated_at
        FROM doctors
        WHERE name ILIKE $1
        ORDER BY name, id
        "#,
    )
    .bind(contains_pattern(name))
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(doctors)
}

/// Doctors ordered by number of non-cancelled appointments, busiest first.
pub async fn list_most_booked_doctors(
    conn: &mut DbConn,
    limit: i64,
) -> Result<Vec<DoctorWithBookings>> {
    let doctors = sqlx::query_as::<_, DoctorWithBookings>(
        r#"
        SELECT d.id, d.user_id, d.name, d.specialization, d.email, d.phone,
               d.created_at, d.updated_at,
               COUNT(a.id) AS appointment_count
        FROM doctors d
        JOIN appointments a ON a.doctor_id = d.id AND a.status <> 'CANCELLED'
        GROUP BY d.id
        ORDER BY appointment_count DESC, d.name
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(doctors)
}

/// Writes back every mutable column of a doctor profile.
pub async fn update_doctor(conn: &mut DbConn, doctor: &Doctor) -> Result<Doctor> {
    let updated = sqlx::query_as::<_, Doctor>(
        r#"
        UPDATE doctors
        SET user_id = $1, name = $2, specialization = $3, email = $4, phone = $5,
            updated_at = now()
        WHERE id = $6
        RETURNING id, user_id, name, specialization, email, phone, created_at, updated_at
        "#,
    )
    .bind(doctor.user_id)
    .bind(&doctor.name)
    .bind(&doctor.specialization)
    .bind(&doctor.email)
    .bind(&doctor.phone)
    .bind(doctor.id)
    .fetch_optional(conn)
    .await
    .map_err(map_constraint_error)?
    .ok_or_else(|| Error::NotFound(format!("Doctor with ID {} not found", doctor.id)))?;

    Ok(updated)
}

/// Deletes a doctor by ID.
pub async fn delete_doctor(conn: &mut DbConn, id: Uuid) -> Result<u64> {
    let rows_affected = sqlx::query(
        r#"
        DELETE FROM doctors
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(conn)
    .await
    .map_err(map_constraint_error)?
    .rows_affected();

    Ok(rows_affected)
}
