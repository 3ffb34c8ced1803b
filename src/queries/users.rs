use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    models::users::{NewUser, User, UserIdentity, parse_roles, role_names},
    queries::map_constraint_error,
};

use crate::DbConn;

/// Row shape of `users`; roles are stored as a text array.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    roles: Vec<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let roles = parse_roles(&row.roles).map_err(|e| {
            Error::Internal(format!("Invalid role stored for user {}: {}", row.id, e))
        })?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            roles,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    #[sqlx(flatten)]
    user: UserRow,
    doctor_id: Option<Uuid>,
    patient_id: Option<Uuid>,
}

/// Creates a new user in the database.
pub async fn create_user(conn: &mut DbConn, new_user: NewUser) -> Result<User> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (username, email, password_hash, roles)
        VALUES ($1, $2, $3, $4)
        RETURNING id, username, email, password_hash, roles, enabled, created_at, updated_at
        "#,
    )
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(role_names(&new_user.roles))
    .fetch_one(conn)
    .await
    .map_err(map_constraint_error)?;

    row.try_into()
}

/// Gets a single user by their ID. The user may not exist.
pub async fn get_user_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, email, password_hash, roles, enabled, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    row.map(User::try_from).transpose()
}

/// Gets a single user by username. The user may not exist.
pub async fn get_user_by_username(conn: &mut DbConn, username: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, email, password_hash, roles, enabled, created_at, updated_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    row.map(User::try_from).transpose()
}

/// Loads a user together with the ids of their linked doctor and patient profiles.
pub async fn get_user_identity(conn: &mut DbConn, id: Uuid) -> Result<Option<UserIdentity>> {
    let row = sqlx::query_as::<_, IdentityRow>(
        r#"
        SELECT u.id, u.username, u.email, u.password_hash, u.roles, u.enabled,
               u.created_at, u.updated_at,
               d.id AS doctor_id, p.id AS patient_id
        FROM users u
        LEFT JOIN doctors d ON d.user_id = u.id
        LEFT JOIN patients p ON p.user_id = u.id
        WHERE u.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    row.map(|row| {
        Ok(UserIdentity {
            user: row.user.try_into()?,
            doctor_id: row.doctor_id,
            patient_id: row.patient_id,
        })
    })
    .transpose()
}

/// Lists all users, newest first.
pub async fn list_users(conn: &mut DbConn) -> Result<Vec<User>> {
    let rows = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, email, password_hash, roles, enabled, created_at, updated_at
        FROM users
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    rows.into_iter().map(User::try_from).collect()
}

/// Updates a user's email, roles and enabled flag.
pub async fn update_user(conn: &mut DbConn, user: &User) -> Result<User> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users
        SET email = $1, roles = $2, enabled = $3, updated_at = now()
        WHERE id = $4
        RETURNING id, username, email, password_hash, roles, enabled, created_at, updated_at
        "#,
    )
    .bind(&user.email)
    .bind(role_names(&user.roles))
    .bind(user.enabled)
    .bind(user.id)
    .fetch_optional(conn)
    .await
    .map_err(map_constraint_error)?
    .ok_or_else(|| Error::NotFound(format!("User with ID {} not found", user.id)))?;

    row.try_into()
}

/// Deletes a user by their ID. Linked profiles are unlinked by the foreign key.
pub async fn delete_user(conn: &mut DbConn, id: Uuid) -> Result<u64> {
    let rows_affected = sqlx::query(
        r#"
        DELETE FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(conn)
    .await
    .map_err(Error::Sqlx)?
    .rows_affected();

    Ok(rows_affected)
}
