use crate::DbConn;
use crate::{
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::{
        doctors::{Doctor, DoctorWithBookings, NewDoctor},
        permissions::doctor_permissions,
        requests::{CreateDoctorRequest, UpdateDoctorRequest},
    },
    queries,
    services::access,
    validation::{
        validate_email, validate_name, validate_optional_email, validate_optional_phone,
        validate_optional_text, validate_phone, validate_required_string,
    },
};
use uuid::Uuid;

/// Default and maximum size of the most-booked ranking
const DEFAULT_RANKING_LIMIT: i64 = 10;
const MAX_RANKING_LIMIT: i64 = 100;

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Doctor with ID {} not found", id))
}

/// Creates a doctor profile (admin only)
pub async fn create_doctor(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    request: CreateDoctorRequest,
) -> Result<Doctor> {
    access::require_permission(caller, doctor_permissions::CREATE)?;

    let new_doctor = NewDoctor {
        user_id: None,
        name: validate_name(&request.name, "name")?,
        specialization: validate_optional_text(request.specialization.as_deref(), "specialization")?,
        email: validate_optional_email(request.email.as_deref())?,
        phone: validate_optional_phone(request.phone.as_deref())?,
    };

    if let Some(email) = new_doctor.email.as_deref() {
        if queries::doctors::get_doctor_by_email(conn, email).await?.is_some() {
            return Err(Error::Conflict("Doctor with this email already exists".to_string()));
        }
    }

    queries::doctors::create_doctor(conn, new_doctor).await
}

pub async fn get_doctor(conn: &mut DbConn, caller: &AuthenticatedUser, id: Uuid) -> Result<Doctor> {
    access::require_permission(caller, doctor_permissions::READ)?;
    queries::doctors::get_doctor_by_id(conn, id)
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn get_doctor_by_email(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    email: &str,
) -> Result<Doctor> {
    access::require_permission(caller, doctor_permissions::READ)?;
    let email = validate_email(email)?;
    queries::doctors::get_doctor_by_email(conn, &email)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Doctor with email {} not found", email)))
}

pub async fn list_doctors(conn: &mut DbConn, caller: &AuthenticatedUser) -> Result<Vec<Doctor>> {
    access::require_permission(caller, doctor_permissions::READ)?;
    queries::doctors::list_doctors(conn).await
}

pub async fn list_doctors_by_specialization(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    specialization: &str,
) -> Result<Vec<Doctor>> {
    access::require_permission(caller, doctor_permissions::READ)?;
    let specialization = validate_required_string(specialization, "specialization")?;
    queries::doctors::list_doctors_by_specialization(conn, &specialization).await
}

pub async fn search_doctors(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    name: &str,
) -> Result<Vec<Doctor>> {
    access::require_permission(caller, doctor_permissions::READ)?;
    let name = validate_required_string(name, "name")?;
    queries::doctors::search_doctors_by_name(conn, &name).await
}

/// Busiest doctors first; `limit` defaults to 10 and must be 1..=100
pub async fn list_most_booked_doctors(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    limit: Option<i64>,
) -> Result<Vec<DoctorWithBookings>> {
    access::require_permission(caller, doctor_permissions::VIEW_STATS)?;

    let limit = limit.unwrap_or(DEFAULT_RANKING_LIMIT);
    if !(1..=MAX_RANKING_LIMIT).contains(&limit) {
        return Err(Error::validation("limit", "Limit must be between 1 and 100"));
    }

    queries::doctors::list_most_booked_doctors(conn, limit).await
}

/// Partial update; email uniqueness is re-checked only when it changes
pub async fn update_doctor(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    id: Uuid,
    request: UpdateDoctorRequest,
) -> Result<Doctor> {
    access::ensure_can_update_doctor(caller, id)?;

    let mut doctor = queries::doctors::get_doctor_by_id(conn, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    if let Some(name) = request.name {
        doctor.name = validate_name(&name, "name")?;
    }

    if let Some(specialization) = request.specialization {
        doctor.specialization = validate_optional_text(Some(&specialization), "specialization")?;
    }

    if let Some(email) = request.email {
        let email = validate_email(&email)?;
        if doctor.email.as_deref() != Some(email.as_str()) {
            if queries::doctors::get_doctor_by_email(conn, &email).await?.is_some() {
                return Err(Error::Conflict("Doctor with this email already exists".to_string()));
            }
            doctor.email = Some(email);
        }
    }

    if let Some(phone) = request.phone {
        doctor.phone = Some(validate_phone(&phone)?);
    }

    queries::doctors::update_doctor(conn, &doctor).await
}

/// Deletes a doctor with no appointments (admin only)
pub async fn delete_doctor(conn: &mut DbConn, caller: &AuthenticatedUser, id: Uuid) -> Result<()> {
    access::require_permission(caller, doctor_permissions::DELETE)?;

    if queries::doctors::get_doctor_by_id(conn, id).await?.is_none() {
        return Err(not_found(id));
    }

    let appointments = queries::appointments::count_appointments_by_doctor(conn, id).await?;
    if appointments > 0 {
        return Err(Error::Conflict(format!(
            "Cannot delete doctor with {} existing appointment(s)",
            appointments
        )));
    }

    queries::doctors::delete_doctor(conn, id).await?;
    Ok(())
}
