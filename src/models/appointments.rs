use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    Decode, Encode, Postgres,
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Lifecycle tag of a booking. Any status may follow any other.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    /// Whether the appointment still occupies its slot.
    pub fn occupies_slot(self) -> bool {
        self != AppointmentStatus::Cancelled
    }
}

// Stored as its SCREAMING_SNAKE_CASE name in a TEXT column
impl sqlx::Type<Postgres> for AppointmentStatus {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <&str as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl Encode<'_, Postgres> for AppointmentStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <&str as Encode<Postgres>>::encode(self.as_ref(), buf)
    }
}

impl<'r> Decode<'r, Postgres> for AppointmentStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let name = <&str as Decode<Postgres>>::decode(value)?;
        Ok(name.parse()?)
    }
}

/// An appointment joined with the names of its doctor and patient.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
}

/// Fully resolved values written back on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentChanges {
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
}

/// Filters for the admin appointment listing. All bounds are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
