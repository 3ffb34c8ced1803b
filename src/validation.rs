//! Input validation utilities for the service layer.
//!
//! Validators return the sanitized value where one is produced (trimmed names,
//! lower-cased emails) so services store exactly what was checked.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime, Timelike};
use regex::Regex;

use crate::{
    config::BookingConfig,
    error::{Error, Result, ValidationErrors},
};

/// Maximum length of names, emails and specializations
pub const MAX_TEXT_LENGTH: usize = 255;

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+380|0)[0-9]{9}$").unwrap_or_else(|_| unreachable!("phone pattern is valid"))
});

/// Collects field failures so one response reports every invalid field
///
/// # Examples
/// ```
/// use booking::validation::{FieldErrors, validate_email, validate_password};
///
/// let mut errors = FieldErrors::default();
/// let email = errors.check(validate_email("nope")).unwrap();
/// errors.check(validate_password("short")).unwrap();
/// assert!(email.is_empty());
/// assert!(errors.finish().is_err());
/// ```
#[derive(Debug, Default)]
pub struct FieldErrors {
    fields: HashMap<String, String>,
}

impl FieldErrors {
    /// Records a validation failure and yields a placeholder value.
    ///
    /// Errors other than validation errors are passed straight through.
    pub fn check<T: Default>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(Error::Validation(ValidationErrors::Single { field, message })) => {
                self.fields.entry(field).or_insert(message);
                Ok(T::default())
            }
            Err(Error::Validation(ValidationErrors::Multiple { fields })) => {
                for (field, message) in fields {
                    self.fields.entry(field).or_insert(message);
                }
                Ok(T::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Fails with every recorded field, or succeeds if nothing was recorded
    pub fn finish(self) -> Result<()> {
        let mut fields = self.fields;
        match fields.len() {
            0 => Ok(()),
            1 => {
                let Some((field, message)) = fields.drain().next() else {
                    return Ok(());
                };
                Err(Error::validation(field, message))
            }
            _ => Err(Error::Validation(ValidationErrors::Multiple { fields })),
        }
    }
}

/// Validates email format and returns it trimmed and lower-cased
///
/// # Examples
/// ```
/// use booking::validation::validate_email;
///
/// assert_eq!(validate_email(" User@Example.com ").unwrap(), "user@example.com");
/// assert!(validate_email("invalid-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();

    if email.is_empty() {
        return Err(Error::validation("email", "Email cannot be empty"));
    }

    if email.len() > MAX_TEXT_LENGTH {
        return Err(Error::validation("email", "Email address is too long (max 255 characters)"));
    }

    let Some((local_part, domain)) = email.split_once('@') else {
        return Err(Error::validation("email", "Invalid email format: must contain @ symbol"));
    };

    if local_part.is_empty() || domain.is_empty() {
        return Err(Error::validation(
            "email",
            "Invalid email format: local part and domain cannot be empty",
        ));
    }

    if domain.contains('@') {
        return Err(Error::validation(
            "email",
            "Invalid email format: must contain exactly one @ symbol",
        ));
    }

    if local_part.len() > 64 {
        return Err(Error::validation(
            "email",
            "Invalid email format: local part is too long (max 64 characters)",
        ));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(Error::validation(
            "email",
            "Invalid email format: domain must contain a dot",
        ));
    }

    if email.contains("..") {
        return Err(Error::validation(
            "email",
            "Invalid email format: cannot contain consecutive dots",
        ));
    }

    let invalid_chars = ['<', '>', '(', ')', '[', ']', '\\', ',', ';', ':', '"', ' '];
    if let Some(char) = invalid_chars.iter().find(|c| email.contains(**c)) {
        return Err(Error::validation(
            "email",
            format!("Invalid email format: cannot contain '{}'", char),
        ));
    }

    Ok(email.to_lowercase())
}

/// Like [`validate_email`] but blank input means "no email".
pub fn validate_optional_email(email: Option<&str>) -> Result<Option<String>> {
    match email.map(str::trim) {
        None | Some("") => Ok(None),
        Some(email) => validate_email(email).map(Some),
    }
}

/// Validates password strength and format
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(Error::validation("password", "Password must be at least 8 characters long"));
    }

    if password.len() > 128 {
        return Err(Error::validation("password", "Password is too long (max 128 characters)"));
    }

    let lowered = password.to_lowercase();
    if ["password", "12345678", "qwerty123", "admin123"].contains(&lowered.as_str()) {
        return Err(Error::validation("password", "Password is too common and weak"));
    }

    if password.contains(' ') {
        return Err(Error::validation("password", "Password cannot contain spaces"));
    }

    Ok(())
}

/// Validates a login name: 3 to 50 letters, digits, dots, hyphens or underscores
pub fn validate_username(username: &str) -> Result<String> {
    let username = username.trim();

    if username.len() < 3 || username.len() > 50 {
        return Err(Error::validation(
            "username",
            "Username must be between 3 and 50 characters",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(Error::validation(
            "username",
            "Username can only contain letters, digits, dots, hyphens, and underscores",
        ));
    }

    Ok(username.to_string())
}

/// Validates a person's display name and returns it trimmed
pub fn validate_name(name: &str, field_name: &str) -> Result<String> {
    let name = validate_required_string(name, field_name)?;

    if name.chars().count() > MAX_TEXT_LENGTH {
        return Err(Error::validation(
            field_name,
            format!("{} must be at most 255 characters", field_name),
        ));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(Error::validation(
            field_name,
            format!("{} cannot contain control characters", field_name),
        ));
    }

    Ok(name)
}

/// Optional free text (e.g. specialization): blank becomes `None`
pub fn validate_optional_text(value: Option<&str>, field_name: &str) -> Result<Option<String>> {
    match value.map(sanitize_string) {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(None),
        Some(value) if value.chars().count() > MAX_TEXT_LENGTH => Err(Error::validation(
            field_name,
            format!("{} must be at most 255 characters", field_name),
        )),
        Some(value) => Ok(Some(value)),
    }
}

/// Validates a Ukrainian phone number: `+380XXXXXXXXX` or `0XXXXXXXXX`
pub fn validate_phone(phone: &str) -> Result<String> {
    let phone = phone.trim();

    if !PHONE_REGEX.is_match(phone) {
        return Err(Error::validation(
            "phone",
            "Phone number must match +380XXXXXXXXX or 0XXXXXXXXX",
        ));
    }

    Ok(phone.to_string())
}

/// Like [`validate_phone`] but blank input means "no phone".
pub fn validate_optional_phone(phone: Option<&str>) -> Result<Option<String>> {
    match phone.map(str::trim) {
        None | Some("") => Ok(None),
        Some(phone) => validate_phone(phone).map(Some),
    }
}

/// Appointments cannot be placed in the past
pub fn validate_appointment_date(date: NaiveDate, today: NaiveDate) -> Result<()> {
    if date < today {
        return Err(Error::validation(
            "appointment_date",
            "Appointment date must be today or in the future",
        ));
    }
    Ok(())
}

/// Checks the time is inside working hours (inclusive) and on the slot grid
pub fn validate_appointment_time(time: NaiveTime, booking: &BookingConfig) -> Result<()> {
    if time < booking.opening_time || time > booking.closing_time {
        return Err(Error::validation(
            "appointment_time",
            format!(
                "Appointment time must be between {} and {}",
                booking.opening_time.format("%H:%M"),
                booking.closing_time.format("%H:%M")
            ),
        ));
    }

    let slot_minutes = booking.slot_minutes.max(1);
    if time.minute() % slot_minutes != 0 || time.second() != 0 || time.nanosecond() != 0 {
        return Err(Error::validation(
            "appointment_time",
            format!(
                "Appointment time must be on a {}-minute boundary",
                slot_minutes
            ),
        ));
    }

    Ok(())
}

/// Sanitizes string input by trimming whitespace
pub fn sanitize_string(input: &str) -> String {
    input.trim().to_string()
}

/// Validates that a string is not empty after sanitization
///
/// # Returns
/// * `Ok(String)` with sanitized string
/// * `Err(Error)` if empty after sanitization
pub fn validate_required_string(input: &str, field_name: &str) -> Result<String> {
    let sanitized = sanitize_string(input);

    if sanitized.is_empty() {
        return Err(Error::validation(
            field_name,
            format!("{} cannot be empty", field_name),
        ));
    }

    Ok(sanitized)
}
