use crate::DbConn;
use crate::{
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::{
        patients::{NewPatient, Patient},
        permissions::{PermissionValidator, patient_permissions},
        requests::{CreatePatientRequest, UpdatePatientRequest},
    },
    queries,
    services::access,
    validation::{
        validate_email, validate_name, validate_optional_email, validate_optional_phone,
        validate_phone, validate_required_string,
    },
};
use uuid::Uuid;

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Patient with ID {} not found", id))
}

async fn ensure_email_free(conn: &mut DbConn, email: &str) -> Result<()> {
    if queries::patients::get_patient_by_email(conn, email).await?.is_some() {
        return Err(Error::Conflict("Patient with this email already exists".to_string()));
    }
    Ok(())
}

async fn ensure_phone_free(conn: &mut DbConn, phone: &str) -> Result<()> {
    if queries::patients::get_patient_by_phone(conn, phone).await?.is_some() {
        return Err(Error::Conflict("Patient with this phone number already exists".to_string()));
    }
    Ok(())
}

/// Creates a patient profile. Profiles created by a non-admin are linked to the caller.
pub async fn create_patient(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    request: CreatePatientRequest,
) -> Result<Patient> {
    access::require_permission(caller, patient_permissions::CREATE)?;

    let links_to_caller =
        !PermissionValidator::roles_have_permission(&caller.roles, patient_permissions::UPDATE_ALL);
    if links_to_caller && caller.patient_id.is_some() {
        return Err(Error::Conflict("You already have a patient profile".to_string()));
    }

    let new_patient = NewPatient {
        user_id: links_to_caller.then_some(caller.id),
        name: validate_name(&request.name, "name")?,
        email: validate_optional_email(request.email.as_deref())?,
        phone: validate_optional_phone(request.phone.as_deref())?,
    };

    if let Some(email) = new_patient.email.as_deref() {
        ensure_email_free(conn, email).await?;
    }
    if let Some(phone) = new_patient.phone.as_deref() {
        ensure_phone_free(conn, phone).await?;
    }

    queries::patients::create_patient(conn, new_patient).await
}

pub async fn get_patient(conn: &mut DbConn, caller: &AuthenticatedUser, id: Uuid) -> Result<Patient> {
    access::ensure_can_read_patient(caller, id)?;
    queries::patients::get_patient_by_id(conn, id)
        .await?
        .ok_or_else(|| not_found(id))
}

/// Lookup by email; a patient caller only finds their own profile
pub async fn get_patient_by_email(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    email: &str,
) -> Result<Patient> {
    let email = validate_email(email)?;
    let patient = queries::patients::get_patient_by_email(conn, &email)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Patient with email {} not found", email)))?;
    access::ensure_can_read_patient(caller, patient.id)?;
    Ok(patient)
}

/// Lookup by phone; a patient caller only finds their own profile
pub async fn get_patient_by_phone(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    phone: &str,
) -> Result<Patient> {
    let phone = validate_phone(phone)?;
    let patient = queries::patients::get_patient_by_phone(conn, &phone)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Patient with phone {} not found", phone)))?;
    access::ensure_can_read_patient(caller, patient.id)?;
    Ok(patient)
}

pub async fn list_patients(conn: &mut DbConn, caller: &AuthenticatedUser) -> Result<Vec<Patient>> {
    access::require_permission(caller, patient_permissions::READ_ALL)?;
    queries::patients::list_patients(conn).await
}

pub async fn search_patients(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    name: &str,
) -> Result<Vec<Patient>> {
    access::require_permission(caller, patient_permissions::SEARCH)?;
    let name = validate_required_string(name, "name")?;
    queries::patients::search_patients_by_name(conn, &name).await
}

/// Patients who have booked with the doctor (admin or that doctor)
pub async fn list_patients_by_doctor(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    doctor_id: Uuid,
) -> Result<Vec<Patient>> {
    access::ensure_can_view_doctor_schedule(caller, doctor_id)?;

    if queries::doctors::get_doctor_by_id(conn, doctor_id).await?.is_none() {
        return Err(Error::NotFound(format!("Doctor with ID {} not found", doctor_id)));
    }

    queries::patients::list_patients_by_doctor(conn, doctor_id).await
}

/// Partial update; email and phone uniqueness are re-checked only when they change
pub async fn update_patient(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    id: Uuid,
    request: UpdatePatientRequest,
) -> Result<Patient> {
    access::ensure_can_update_patient(caller, id)?;

    let mut patient = queries::patients::get_patient_by_id(conn, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    if let Some(name) = request.name {
        patient.name = validate_name(&name, "name")?;
    }

    if let Some(email) = request.email {
        let email = validate_email(&email)?;
        if patient.email.as_deref() != Some(email.as_str()) {
            ensure_email_free(conn, &email).await?;
            patient.email = Some(email);
        }
    }

    if let Some(phone) = request.phone {
        let phone = validate_phone(&phone)?;
        if patient.phone.as_deref() != Some(phone.as_str()) {
            ensure_phone_free(conn, &phone).await?;
            patient.phone = Some(phone);
        }
    }

    queries::patients::update_patient(conn, &patient).await
}

/// Deletes a patient with no appointments (admin only)
pub async fn delete_patient(conn: &mut DbConn, caller: &AuthenticatedUser, id: Uuid) -> Result<()> {
    access::require_permission(caller, patient_permissions::DELETE)?;

    if queries::patients::get_patient_by_id(conn, id).await?.is_none() {
        return Err(not_found(id));
    }

    let appointments = queries::appointments::count_appointments_by_patient(conn, id).await?;
    if appointments > 0 {
        return Err(Error::Conflict(format!(
            "Cannot delete patient with {} existing appointment(s)",
            appointments
        )));
    }

    queries::patients::delete_patient(conn, id).await?;
    Ok(())
}
