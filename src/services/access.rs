//! Authorization rules combining role permissions with profile ownership.
//!
//! Every check returns `Forbidden` on failure so services can use `?`.

use uuid::Uuid;

use crate::{
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::{
        appointments::{Appointment, AppointmentStatus},
        permissions::{
            PermissionValidator, appointment_permissions, doctor_permissions,
            patient_permissions, user_permissions,
        },
    },
};

fn has(user: &AuthenticatedUser, permission: &str) -> bool {
    PermissionValidator::roles_have_permission(&user.roles, permission)
}

fn forbidden(message: &str) -> Error {
    Error::Forbidden(message.to_string())
}

/// Plain role permission check
pub fn require_permission(user: &AuthenticatedUser, permission: &str) -> Result<()> {
    if has(user, permission) {
        Ok(())
    } else {
        Err(forbidden("Insufficient permissions"))
    }
}

pub fn ensure_can_manage_users(user: &AuthenticatedUser) -> Result<()> {
    require_permission(user, user_permissions::MANAGE)
}

/// Admins see any account, everyone else only their own
pub fn ensure_can_view_user(user: &AuthenticatedUser, user_id: Uuid) -> Result<()> {
    if user.id == user_id || has(user, user_permissions::MANAGE) {
        Ok(())
    } else {
        Err(forbidden("You can only view your own account"))
    }
}

pub fn ensure_can_update_doctor(user: &AuthenticatedUser, doctor_id: Uuid) -> Result<()> {
    if has(user, doctor_permissions::UPDATE_ALL)
        || (has(user, doctor_permissions::UPDATE_OWN) && user.is_doctor(doctor_id))
    {
        Ok(())
    } else {
        Err(forbidden("You can only update your own doctor profile"))
    }
}

pub fn ensure_can_read_patient(user: &AuthenticatedUser, patient_id: Uuid) -> Result<()> {
    if has(user, patient_permissions::READ_ALL)
        || (has(user, patient_permissions::READ_OWN) && user.is_patient(patient_id))
    {
        Ok(())
    } else {
        Err(forbidden("You can only view your own patient profile"))
    }
}

pub fn ensure_can_update_patient(user: &AuthenticatedUser, patient_id: Uuid) -> Result<()> {
    if has(user, patient_permissions::UPDATE_ALL)
        || (has(user, patient_permissions::UPDATE_OWN) && user.is_patient(patient_id))
    {
        Ok(())
    } else {
        Err(forbidden("You can only update your own patient profile"))
    }
}

/// A doctor's appointment book and patient list: admin or that doctor
pub fn ensure_can_view_doctor_schedule(user: &AuthenticatedUser, doctor_id: Uuid) -> Result<()> {
    if has(user, appointment_permissions::READ_ALL)
        || (has(user, appointment_permissions::READ_OWN) && user.is_doctor(doctor_id))
    {
        Ok(())
    } else {
        Err(forbidden("You can only view your own schedule"))
    }
}

/// A patient's appointments: admin, any doctor, or that patient
pub fn ensure_can_view_patient_appointments(
    user: &AuthenticatedUser,
    patient_id: Uuid,
) -> Result<()> {
    if has(user, appointment_permissions::READ_ALL)
        || has(user, appointment_permissions::READ_PATIENTS)
        || (has(user, appointment_permissions::READ_OWN) && user.is_patient(patient_id))
    {
        Ok(())
    } else {
        Err(forbidden("You can only view your own appointments"))
    }
}

fn is_participant(user: &AuthenticatedUser, appointment: &Appointment) -> bool {
    user.is_doctor(appointment.doctor_id) || user.is_patient(appointment.patient_id)
}

pub fn ensure_can_view_appointment(
    user: &AuthenticatedUser,
    appointment: &Appointment,
) -> Result<()> {
    if has(user, appointment_permissions::READ_ALL)
        || (has(user, appointment_permissions::READ_OWN) && is_participant(user, appointment))
    {
        Ok(())
    } else {
        Err(forbidden("You can only view your own appointments"))
    }
}

/// Booking on behalf of someone else is admin-only
pub fn ensure_can_book(user: &AuthenticatedUser, doctor_id: Uuid, patient_id: Uuid) -> Result<()> {
    if has(user, appointment_permissions::BOOK_ALL)
        || (has(user, appointment_permissions::BOOK_OWN)
            && (user.is_patient(patient_id) || user.is_doctor(doctor_id)))
    {
        Ok(())
    } else {
        Err(forbidden("You can only book appointments for your own profile"))
    }
}

/// Reschedule or cancel: admin or a participant
pub fn ensure_can_modify_appointment(
    user: &AuthenticatedUser,
    appointment: &Appointment,
) -> Result<()> {
    if has(user, appointment_permissions::UPDATE_ALL)
        || (has(user, appointment_permissions::UPDATE_OWN) && is_participant(user, appointment))
    {
        Ok(())
    } else {
        Err(forbidden("You can only modify your own appointments"))
    }
}

/// Admin and the appointment's doctor may set any status; the patient may only
/// cancel. Resending the current status is not a change.
pub fn ensure_can_set_status(
    user: &AuthenticatedUser,
    appointment: &Appointment,
    status: AppointmentStatus,
) -> Result<()> {
    ensure_can_modify_appointment(user, appointment)?;

    if status == appointment.status
        || has(user, appointment_permissions::UPDATE_ALL)
        || (has(user, appointment_permissions::SET_STATUS) && user.is_doctor(appointment.doctor_id))
        || status == AppointmentStatus::Cancelled
    {
        Ok(())
    } else {
        Err(forbidden("Patients can only cancel appointments"))
    }
}
