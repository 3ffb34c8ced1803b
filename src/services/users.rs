use crate::DbConn;
use crate::{
    config::{AdminConfig, Config},
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::{
        doctors::{Doctor, NewDoctor},
        patients::{NewPatient, Patient},
        users::{AuthResponse, LoginUser, NewUser, RegisterUser, Role, UpdateUser, User, UserIdentity},
    },
    queries,
    services::{access, jwt},
    validation::{
        FieldErrors, validate_email, validate_name, validate_optional_phone, validate_optional_text,
        validate_password, validate_username,
    },
};
use argon2::Argon2;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use secrecy::ExposeSecret;
use sqlx::Acquire;
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Hashes a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

/// Verifies a password against a password hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| Error::Internal(format!("Invalid password hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Internal(format!("Password verification failed: {}", e))),
    }
}

/// Removes duplicates while keeping the first occurrence order
fn dedup_roles(roles: Vec<Role>) -> Vec<Role> {
    let mut unique = Vec::with_capacity(roles.len());
    for role in roles {
        if !unique.contains(&role) {
            unique.push(role);
        }
    }
    unique
}

/// Roles a user may request at sign-up; ADMIN is granted only by another admin
fn resolve_registration_roles(requested: Option<Vec<Role>>) -> Result<Vec<Role>> {
    let roles = dedup_roles(requested.unwrap_or_else(|| vec![Role::Patient]));

    if roles.is_empty() {
        return Err(Error::validation("roles", "At least one role is required"));
    }
    if roles.contains(&Role::Admin) {
        return Err(Error::validation("roles", "ADMIN role cannot be self-assigned"));
    }

    Ok(roles)
}

/// Builds the token response shared by register and login
pub fn build_auth_response(user: &User, config: &Config) -> Result<AuthResponse> {
    let issued = jwt::generate_jwt(
        user.id,
        &user.username,
        config.jwt.secret.expose_secret(),
        config.jwt.access_token_expiration_minutes,
    )?;

    Ok(AuthResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        roles: user.roles.clone(),
    })
}

/// Registers a new account and its doctor/patient profiles in one transaction
pub async fn register_user(
    conn: &mut DbConn,
    config: &Config,
    request: RegisterUser,
) -> Result<AuthResponse> {
    // 1. Validate inputs, reporting every invalid field at once
    let mut errors = FieldErrors::default();
    let username = errors.check(validate_username(&request.username))?;
    let email = errors.check(validate_email(&request.email))?;
    errors.check(validate_password(&request.password))?;
    let roles = errors.check(resolve_registration_roles(request.roles))?;

    let needs_profile = roles.contains(&Role::Doctor) || roles.contains(&Role::Patient);
    let full_name = if needs_profile {
        Some(errors.check(validate_name(
            request.full_name.as_deref().unwrap_or(""),
            "full_name",
        ))?)
    } else {
        None
    };
    let phone = errors.check(validate_optional_phone(request.phone.as_deref()))?;
    let specialization = errors.check(validate_optional_text(
        request.specialization.as_deref(),
        "specialization",
    ))?;
    errors.finish()?;

    let password_hash = hash_password(&request.password)?;

    // 2. Start transaction
    let mut tx = conn
        .begin()
        .await
        .map_err(|e| Error::Internal(format!("Failed to begin transaction: {}", e)))?;

    // 3. Create the account
    let user = queries::users::create_user(
        &mut tx,
        NewUser {
            username,
            email: email.clone(),
            password_hash,
            roles,
        },
    )
    .await?;

    // 4. Create or claim profiles
    if let Some(name) = full_name {
        if user.has_role(Role::Doctor) {
            let doctor = NewDoctor {
                user_id: Some(user.id),
                name: name.clone(),
                specialization: specialization.clone(),
                email: Some(email.clone()),
                phone: phone.clone(),
            };
            attach_doctor_profile(&mut tx, doctor).await?;
        }
        if user.has_role(Role::Patient) {
            let patient = NewPatient {
                user_id: Some(user.id),
                name,
                email: Some(email),
                phone,
            };
            attach_patient_profile(&mut tx, patient).await?;
        }
    }

    // 5. Commit transaction
    tx.commit()
        .await
        .map_err(|e| Error::Internal(format!("Failed to commit transaction: {}", e)))?;

    build_auth_response(&user, config)
}

/// Links an unclaimed doctor profile with the same email, or creates a new one
async fn attach_doctor_profile(conn: &mut DbConn, new_doctor: NewDoctor) -> Result<Doctor> {
    let existing = match new_doctor.email.as_deref() {
        Some(email) => queries::doctors::get_doctor_by_email(conn, email).await?,
        None => None,
    };

    match existing {
        Some(doctor) if doctor.user_id.is_some() => Err(Error::Conflict(
            "Doctor profile with this email is already linked to another account".to_string(),
        )),
        Some(mut doctor) => {
            doctor.user_id = new_doctor.user_id;
            if doctor.specialization.is_none() {
                doctor.specialization = new_doctor.specialization;
            }
            if doctor.phone.is_none() {
                doctor.phone = new_doctor.phone;
            }
            queries::doctors::update_doctor(conn, &doctor).await
        }
        None => queries::doctors::create_doctor(conn, new_doctor).await,
    }
}

/// Links an unclaimed patient profile with the same email, or creates a new one
async fn attach_patient_profile(conn: &mut DbConn, new_patient: NewPatient) -> Result<Patient> {
    let existing = match new_patient.email.as_deref() {
        Some(email) => queries::patients::get_patient_by_email(conn, email).await?,
        None => None,
    };

    match existing {
        Some(patient) if patient.user_id.is_some() => Err(Error::Conflict(
            "Patient profile with this email is already linked to another account".to_string(),
        )),
        Some(mut patient) => {
            patient.user_id = new_patient.user_id;
            if patient.phone.is_none() {
                patient.phone = new_patient.phone;
            }
            queries::patients::update_patient(conn, &patient).await
        }
        None => queries::patients::create_patient(conn, new_patient).await,
    }
}

/// Authenticates by username and password
pub async fn login_user(conn: &mut DbConn, config: &Config, request: LoginUser) -> Result<AuthResponse> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(Error::validation("username", "Username cannot be empty"));
    }
    if request.password.is_empty() {
        return Err(Error::validation("password", "Password cannot be empty"));
    }

    let user = queries::users::get_user_by_username(conn, username)
        .await?
        .ok_or_else(|| Error::Authentication(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(Error::Authentication(INVALID_CREDENTIALS.to_string()));
    }

    if !user.enabled {
        return Err(Error::Authentication("Account is disabled".to_string()));
    }

    build_auth_response(&user, config)
}

/// The caller's account with linked profile ids
pub async fn get_current_user(conn: &mut DbConn, user_id: Uuid) -> Result<UserIdentity> {
    queries::users::get_user_identity(conn, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User with ID {} not found", user_id)))
}

/// Creates the configured administrator if a password is set and the username is free.
/// Returns the new account, or `None` when nothing was created.
pub async fn ensure_admin_account(conn: &mut DbConn, admin: &AdminConfig) -> Result<Option<User>> {
    let Some(password) = admin.password.as_ref() else {
        return Ok(None);
    };

    let username = validate_username(&admin.username)?;
    if queries::users::get_user_by_username(conn, &username).await?.is_some() {
        return Ok(None);
    }

    let email = validate_email(&admin.email)?;
    validate_password(password.expose_secret())?;

    let user = queries::users::create_user(
        conn,
        NewUser {
            username,
            email,
            password_hash: hash_password(password.expose_secret())?,
            roles: vec![Role::Admin],
        },
    )
    .await?;

    Ok(Some(user))
}

pub async fn list_users(conn: &mut DbConn, caller: &AuthenticatedUser) -> Result<Vec<User>> {
    access::ensure_can_manage_users(caller)?;
    queries::users::list_users(conn).await
}

pub async fn get_user(conn: &mut DbConn, caller: &AuthenticatedUser, user_id: Uuid) -> Result<User> {
    access::ensure_can_view_user(caller, user_id)?;
    queries::users::get_user_by_id(conn, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User with ID {} not found", user_id)))
}

/// Admin update of email, enabled flag and roles. Absent fields are kept.
pub async fn update_user(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    user_id: Uuid,
    request: UpdateUser,
) -> Result<User> {
    access::ensure_can_manage_users(caller)?;

    let mut user = queries::users::get_user_by_id(conn, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User with ID {} not found", user_id)))?;

    if let Some(email) = request.email {
        user.email = validate_email(&email)?;
    }

    if let Some(enabled) = request.enabled {
        if !enabled && user_id == caller.id {
            return Err(Error::validation("enabled", "You cannot disable your own account"));
        }
        user.enabled = enabled;
    }

    if let Some(roles) = request.roles {
        let roles = dedup_roles(roles);
        if roles.is_empty() {
            return Err(Error::validation("roles", "At least one role is required"));
        }
        if user_id == caller.id && !roles.contains(&Role::Admin) {
            return Err(Error::validation("roles", "You cannot remove your own ADMIN role"));
        }
        user.roles = roles;
    }

    queries::users::update_user(conn, &user).await
}

/// Deletes an account. Its profiles stay in place, unlinked.
pub async fn delete_user(conn: &mut DbConn, caller: &AuthenticatedUser, user_id: Uuid) -> Result<()> {
    access::ensure_can_manage_users(caller)?;

    if user_id == caller.id {
        return Err(Error::validation("id", "You cannot delete your own account"));
    }

    let rows_affected = queries::users::delete_user(conn, user_id).await?;
    if rows_affected == 0 {
        return Err(Error::NotFound(format!("User with ID {} not found", user_id)));
    }

    Ok(())
}
