use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user_id as string
    pub sub: String,
    /// Login name, informational only
    pub username: String,
    /// Expiration time as Unix timestamp
    pub exp: i64,
    /// Issued at time as Unix timestamp
    pub iat: i64,
}

/// A signed access token and the moment it stops being accepted
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Generates an HS256 access token for a user
///
/// # Example
/// ```rust,no_run
/// use booking::services::jwt::generate_jwt;
/// use uuid::Uuid;
///
/// let issued = generate_jwt(Uuid::now_v7(), "jdoe", "my-secret", 60)?;
/// assert!(!issued.token.is_empty());
/// # Ok::<(), booking::error::Error>(())
/// ```
pub fn generate_jwt(
    user_id: Uuid,
    username: &str,
    secret: &str,
    expiration_minutes: i64,
) -> Result<IssuedToken> {
    let now = Utc::now();
    let expires_at = now + Duration::minutes(expiration_minutes);

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| Error::Internal(format!("Failed to generate JWT: {}", e)))?;

    Ok(IssuedToken { token, expires_at })
}

/// Verifies a JWT token and returns the claims if valid
///
/// # Errors
/// Returns `Authentication` if the token is malformed, expired, or has a bad signature
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => Error::Authentication("Token has expired".to_string()),
        ErrorKind::InvalidSignature => {
            Error::Authentication("Invalid token signature".to_string())
        }
        _ => Error::Authentication(format!("Invalid token: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Extracts user_id from a valid JWT token
pub fn get_user_id_from_token(token: &str, secret: &str) -> Result<Uuid> {
    let claims = verify_jwt(token, secret)?;
    Uuid::parse_str(&claims.sub)
        .map_err(|_| Error::Authentication("Invalid user_id in token".to_string()))
}

/// Validates JWT from Authorization header and returns user_id
/// Format: "Authorization: Bearer <token>"
pub fn authenticate_jwt_token(auth_header: Option<&str>, secret: &str) -> Result<Uuid> {
    let token = extract_token_from_header(auth_header)?;
    get_user_id_from_token(token, secret)
}

/// Extracts the Bearer token from the Authorization header
fn extract_token_from_header(auth_header: Option<&str>) -> Result<&str> {
    match auth_header {
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim()),
            Some(_) => Err(Error::Authentication("Empty token".to_string())),
            None => Err(Error::Authentication(
                "Invalid Authorization header format. Expected: 'Bearer <token>'".to_string(),
            )),
        },
        None => Err(Error::Authentication("Missing Authorization header".to_string())),
    }
}
