pub mod appointments;
pub mod doctors;
pub mod patients;
pub mod users;

use crate::error::Error;

/// Maps constraint violations to `Conflict`; anything else stays a database error.
pub(crate) fn map_constraint_error(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return Error::Conflict(conflict_message(db.constraint()).to_string());
        }
        if db.is_foreign_key_violation() {
            return Error::Conflict("Record is still referenced by appointments".to_string());
        }
    }
    Error::Sqlx(e)
}

fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_username_key") => "Username is already taken",
        Some("users_email_key") => "Email is already registered",
        Some("doctors_email_key") => "Doctor with this email already exists",
        Some("patients_email_key") => "Patient with this email already exists",
        Some("patients_phone_key") => "Patient with this phone number already exists",
        Some("doctors_user_id_key") | Some("patients_user_id_key") => {
            "Account already has a linked profile"
        }
        Some("appointments_active_slot_key") => "Time slot is already booked",
        _ => "Record already exists",
    }
}

/// Builds a case-insensitive substring pattern for `ILIKE`, escaping wildcards.
pub(crate) fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_messages() {
        assert_eq!(
            conflict_message(Some("appointments_active_slot_key")),
            "Time slot is already booked"
        );
        assert_eq!(conflict_message(Some("users_username_key")), "Username is already taken");
        assert_eq!(conflict_message(None), "Record already exists");
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("smith"), "%smith%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        assert!(matches!(
            map_constraint_error(sqlx::Error::RowNotFound),
            Error::Sqlx(sqlx::Error::RowNotFound)
        ));
    }
}
