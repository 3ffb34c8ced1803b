use crate::models::appointments::AppointmentStatus;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// HTTP API request for creating a doctor profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub specialization: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// HTTP API request for creating a patient profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// HTTP API request for booking an appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
}

/// Reschedule and/or change status
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<NaiveTime>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameSearchQuery {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MostBookedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookedSlotsQuery {
    pub date: NaiveDate,
}

/// Response for the booked-slots lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlots {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub booked_times: Vec<NaiveTime>,
}
