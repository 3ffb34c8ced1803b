use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub specialization: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDoctor {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub specialization: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A doctor together with the number of appointments booked with them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DoctorWithBookings {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub doctor: Doctor,
    pub appointment_count: i64,
}
