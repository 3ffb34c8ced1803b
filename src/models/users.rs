use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Account roles. A user holds a set of these.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// A user joined with the ids of the profiles linked to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user: User,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Admin-side partial update of an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub enabled: Option<bool>,
    pub roles: Option<Vec<Role>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    /// Display name for the doctor/patient profile created alongside the account
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUser {
    pub username: String,
    pub password: String,
}

/// Returned by both register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
}

/// Parses role names as stored in the `users.roles` column.
pub fn parse_roles(values: &[String]) -> Result<Vec<Role>, strum::ParseError> {
    values.iter().map(|value| value.parse()).collect()
}

pub fn role_names(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|role| role.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_names() {
        let names = role_names(&[Role::Admin, Role::Patient]);
        assert_eq!(names, vec!["ADMIN".to_string(), "PATIENT".to_string()]);
        assert_eq!(parse_roles(&names).unwrap(), vec![Role::Admin, Role::Patient]);
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("doctor".parse::<Role>().unwrap(), Role::Doctor);
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::now_v7(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            roles: vec![Role::Patient],
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["roles"][0], "PATIENT");
    }
}
