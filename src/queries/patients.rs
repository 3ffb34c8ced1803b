use uuid::Uuid;

use crate::{
    error::{Error, Result},
    models::patients::{NewPatient, Patient},
    queries::{contains_pattern, map_constraint_error},
};

use crate::DbConn;

/// Creates a new patient profile.
pub async fn create_patient(conn: &mut DbConn, new_patient: NewPatient) -> Result<Patient> {
    let patient = sqlx::query_as::<_, Patient>(
        r#"
        INSERT INTO patients (user_id, name, email, phone)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, name, email, phone, created_at, updated_at
        "#,
    )
    .bind(new_patient.user_id)
    .bind(&new_patient.name)
    .bind(&new_patient.email)
    .bind(&new_patient.phone)
    .fetch_one(conn)
    .await
    .map_err(map_constraint_error)?;

    Ok(patient)
}

/// Gets a patient by ID. The patient may not exist.
pub async fn get_patient_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<Patient>> {
    let patient = sqlx::query_as::<_, Patient>(
        r#"
        SELECT id, user_id, name, email, phone, created_at, updated_at
        FROM patients
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(patient)
}

/// Gets a patient by (normalized) email. The patient may not exist.
pub async fn get_patient_by_email(conn: &mut DbConn, email: &str) -> Result<Option<Patient>> {
    let patient = sqlx::query_as::<_, Patient>(
        r#"
        SELECT id, user_id, name, email, phone, created_at, updated_at
        FROM patients
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(patient)
}

/// Gets a patient by phone number. The patient may not exist.
pub async fn get_patient_by_phone(conn: &mut DbConn, phone: &str) -> Result<Option<Patient>> {
    let patient = sqlx::query_as::<_, Patient>(
        r#"
        SELECT id, user_id, name, email, phone, created_at, updated_at
        FROM patients
        WHERE phone = $1
        "#,
    )
    .bind(phone)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(patient)
}

/// Lists all patients ordered by name.
pub async fn list_patients(conn: &mut DbConn) -> Result<Vec<Patient>> {
    let patients = sqlx::query_as::<_, Patient>(
        r#"
        SELECT id, user_id, name, email, phone, created_at, updated_at
        FROM patients
        ORDER BY name, id
        "#,
    )
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(patients)
}

/// Finds patients whose name contains the search term, ignoring case.
pub async fn search_patients_by_name(conn: &mut DbConn, name: &str) -> Result<Vec<Patient>> {
    let patients = sqlx::query_as::<_, Patient>(
        r#"
        SELECT id, user_id, name, email, phone, created_at, updated_at
        FROM patients
        WHERE name ILIKE $1
        ORDER BY name, id
        "#,
    )
    .bind(contains_pattern(name))
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(patients)
}

/// Distinct patients who have at least one appointment with the doctor.
pub async fn list_patients_by_doctor(conn: &mut DbConn, doctor_id: Uuid) -> Result<Vec<Patient>> {
    let patients = sqlx::query_as::<_, Patient>(
        r#"
        SELECT DISTINCT p.id, p.user_id, p.name, p.email, p.phone, p.created_at, p.updated_at
        FROM patients p
        JOIN appointments a ON a.patient_id = p.id
        WHERE a.doctor_id = $1
        ORDER BY p.name, p.id
        "#,
    )
    .bind(doctor_id)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(patients)
}

/// Writes back every mutable column of a patient profile.
pub async fn update_patient(conn: &mut DbConn, patient: &Patient) -> Result<Patient> {
    let updated = sqlx::query_as::<_, Patient>(
        r#"
        UPDATE patients
        SET user_id = $1, name = $2, email = $3, phone = $4, updated_at = now()
        WHERE id = $5
        RETURNING id, user_id, name, email, phone, created_at, updated_at
        "#,
    )
    .bind(patient.user_id)
    .bind(&patient.name)
    .bind(&patient.email)
    .bind(&patient.phone)
    .bind(patient.id)
    .fetch_optional(conn)
    .await
    .map_err(map_constraint_error)?
    .ok_or_else(|| Error::NotFound(format!("Patient with ID {} not found", patient.id)))?;

    Ok(updated)
}

/// Deletes a patient by ID.
pub async fn delete_patient(conn: &mut DbConn, id: Uuid) -> Result<u64> {
    let rows_affected = sqlx::query(
        r#"
        DELETE FROM patients
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
