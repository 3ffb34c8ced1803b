//! JWT authentication middleware
//!
//! Validates the Bearer token, loads the caller's account and linked
//! profiles, and exposes them to handlers as [`AuthenticatedUser`].

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    models::users::{Role, UserIdentity},
    queries,
    services::jwt::authenticate_jwt_token,
    state::AppState,
};

/// Authenticated caller, added to request extensions by [`jwt_auth_middleware`]
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    /// User's unique identifier
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
    /// Doctor profile linked to this account, if any
    pub doctor_id: Option<Uuid>,
    /// Patient profile linked to this account, if any
    pub patient_id: Option<Uuid>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// True when the caller holds the DOCTOR role and owns this doctor profile
    pub fn is_doctor(&self, doctor_id: Uuid) -> bool {
        self.has_role(Role::Doctor) && self.doctor_id == Some(doctor_id)
    }

    /// True when the caller holds the PATIENT role and owns this patient profile
    pub fn is_patient(&self, patient_id: Uuid) -> bool {
        self.has_role(Role::Patient) && self.patient_id == Some(patient_id)
    }
}

impl From<UserIdentity> for AuthenticatedUser {
    fn from(identity: UserIdentity) -> Self {
        Self {
            id: identity.user.id,
            username: identity.user.username,
            email: identity.user.email,
            roles: identity.user.roles,
            doctor_id: identity.doctor_id,
            patient_id: identity.patient_id,
        }
    }
}

/// JWT authentication middleware
///
/// # Behavior
/// 1. Extracts the token from `Authorization: Bearer <token>`
/// 2. Validates JWT signature and expiration
/// 3. Loads the user and linked profile ids (one query per request)
/// 4. Rejects unknown or disabled accounts
/// 5. Adds `AuthenticatedUser` to request extensions
///
/// # Usage
/// Apply this middleware to protected routes using `route_layer()`:
///
/// ```ignore
/// Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(
///         state.clone(),
///         jwt_auth_middleware,
///     ))
/// ```
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let auth_header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());

    let user_id = authenticate_jwt_token(auth_header, state.config.jwt.secret.expose_secret())?;

    // The connection goes back to the pool before the handler acquires its own
    let identity = {
        let mut conn = state
            .pool
            .acquire()
            .await
            .map_err(|e| Error::Internal(format!("Failed to acquire database connection: {}", e)))?;

        queries::users::get_user_identity(&mut conn, user_id)
            .await?
            .ok_or_else(|| Error::Authentication("User not found".to_string()))?
    };

    if !identity.user.enabled {
        return Err(Error::Authentication("Account is disabled".to_string()));
    }

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(identity));
    Ok(next.run(request).await)
}
