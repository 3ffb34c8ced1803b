//! Booking, conflict detection and schedule views

mod common;

use chrono::{Days, Local};
use common::{
    TestApp, TestUser, book, create_admin, future_date, register_doctor, register_patient,
};

async fn booked_id(response: reqwest::Response) -> String {
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["appointment"]["id"].as_str().unwrap().to_string()
}

async fn set_status(app: &TestApp, user: &TestUser, id: &str, status: &str) -> reqwest::Response {
    app.client
        .put(app.url(&format!("/api/v1/appointments/{id}")))
        .header("Authorization", user.bearer())
        .json(&serde_json::json!({ "status": status }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_patient_books_appointment() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;
    let date = future_date(5);

    let response = book(&app, &patient, doctor.doctor_id(), patient.patient_id(), date, "09:15:00").await;

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let appointment = &body["appointment"];
    assert_eq!(appointment["status"], "SCHEDULED");
    assert_eq!(appointment["appointment_date"], date.to_string());
    assert_eq!(appointment["appointment_time"], "09:15:00");
    assert_eq!(appointment["doctor_name"], "doctor Tester");
    assert_eq!(appointment["patient_name"], "patient Tester");
}

#[tokio::test]
async fn test_double_booking_returns_409() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let first = register_patient(&app).await;
    let second = register_patient(&app).await;
    let date = future_date(6);

    let response = book(&app, &first, doctor.doctor_id(), first.patient_id(), date, "10:00:00").await;
    assert_eq!(response.status(), 201);

    let response = book(&app, &second, doctor.doctor_id(), second.patient_id(), date, "10:00:00").await;
    assert_eq!(response.status(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "CONFLICT");

    // A neighbouring slot is still free
    let response = book(&app, &second, doctor.doctor_id(), second.patient_id(), date, "10:05:00").await;
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn test_cancel_frees_the_slot() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let first = register_patient(&app).await;
    let second = register_patient(&app).await;
    let date = future_date(7);

    let id = booked_id(book(&app, &first, doctor.doctor_id(), first.patient_id(), date, "14:00:00").await).await;

    let cancel = app
        .client
        .patch(app.url(&format!("/api/v1/appointments/{id}/cancel")))
        .header("Authorization", first.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(cancel.status(), 204);

    let response = book(&app, &second, doctor.doctor_id(), second.patient_id(), date, "14:00:00").await;
    assert_eq!(response.status(), 201);

    // The cancelled booking cannot come back while the slot is taken
    let revive = set_status(&app, &doctor, &id, "SCHEDULED").await;
    assert_eq!(revive.status(), 409);
}

#[tokio::test]
async fn test_booking_in_the_past_returns_400() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;
    let yesterday = Local::now().date_naive() - Days::new(1);

    let response = book(&app, &patient, doctor.doctor_id(), patient.patient_id(), yesterday, "10:00:00").await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["fields"]["appointment_date"].is_string());
}

#[tokio::test]
async fn test_booking_outside_working_hours_or_grid_returns_400() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;
    let date = future_date(8);

    for time in ["08:55:00", "18:05:00", "20:00:00", "09:07:00", "09:10:30"] {
        let response = book(&app, &patient, doctor.doctor_id(), patient.patient_id(), date, time).await;
        assert_eq!(response.status(), 400, "time {time} should be rejected");
    }

    // Both ends of the working day are bookable
    for time in ["09:00:00", "18:00:00"] {
        let response = book(&app, &patient, doctor.doctor_id(), patient.patient_id(), date, time).await;
        assert_eq!(response.status(), 201, "time {time} should be accepted");
    }
}

#[tokio::test]
async fn test_booking_unknown_doctor_returns_404() {
    let Some(app) = TestApp::with_database().await else { return };
    let patient = register_patient(&app).await;

    let response = book(
        &app,
        &patient,
        uuid::Uuid::now_v7(),
        patient.patient_id(),
        future_date(3),
        "10:00:00",
    )
    .await;

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_patient_cannot_book_for_someone_else() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;
    let other = register_patient(&app).await;

    let response = book(&app, &patient, doctor.doctor_id(), other.patient_id(), future_date(4), "11:00:00").await;

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_status_changes_by_role() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;

    let id = booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), future_date(9), "12:00:00").await).await;

    // Patients may only cancel
    let response = set_status(&app, &patient, &id, "CONFIRMED").await;
    assert_eq!(response.status(), 403);

    let response = set_status(&app, &doctor, &id, "CONFIRMED").await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["appointment"]["status"], "CONFIRMED");

    let response = set_status(&app, &patient, &id, "CANCELLED").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_reschedule_checks_new_slot() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;
    let date = future_date(11);

    booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), date, "15:00:00").await).await;
    let id = booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), date, "15:30:00").await).await;

    let clash = app
        .client
        .put(app.url(&format!("/api/v1/appointments/{id}")))
        .header("Authorization", patient.bearer())
        .json(&serde_json::json!({ "appointment_time": "15:00:00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(clash.status(), 409);

    let moved = app
        .client
        .put(app.url(&format!("/api/v1/appointments/{id}")))
        .header("Authorization", patient.bearer())
        .json(&serde_json::json!({ "appointment_date": future_date(12), "appointment_time": "16:00:00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(moved.status(), 200);
    let body: serde_json::Value = moved.json().await.unwrap();
    assert_eq!(body["appointment"]["appointment_time"], "16:00:00");
    assert_eq!(body["appointment"]["appointment_date"], future_date(12).to_string());
}

#[tokio::test]
async fn test_restoring_cancelled_appointment_into_taken_slot_returns_409() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let first = register_patient(&app).await;
    let second = register_patient(&app).await;
    let date = future_date(23);

    let id = booked_id(book(&app, &first, doctor.doctor_id(), first.patient_id(), date, "13:00:00").await).await;
    let response = set_status(&app, &first, &id, "CANCELLED").await;
    assert_eq!(response.status(), 200);

    booked_id(book(&app, &second, doctor.doctor_id(), second.patient_id(), date, "13:00:00").await).await;

    let response = set_status(&app, &doctor, &id, "SCHEDULED").await;
    assert_eq!(response.status(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_patient_reschedule_may_resend_current_status() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;

    let id = booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), future_date(24), "10:30:00").await).await;

    let response = app
        .client
        .put(app.url(&format!("/api/v1/appointments/{id}")))
        .header("Authorization", patient.bearer())
        .json(&serde_json::json!({ "appointment_time": "11:30:00", "status": "SCHEDULED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["appointment"]["appointment_time"], "11:30:00");
    assert_eq!(body["appointment"]["status"], "SCHEDULED");

    // Changing the status is still reserved for staff
    let response = set_status(&app, &patient, &id, "CONFIRMED").await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_booked_slots_lists_active_times() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;
    let date = future_date(13);

    booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), date, "13:00:00").await).await;
    let cancelled = booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), date, "09:00:00").await).await;
    let response = set_status(&app, &patient, &cancelled, "CANCELLED").await;
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .get(app.url(&format!(
            "/api/v1/appointments/doctor/{}/booked-slots?date={date}",
            doctor.doctor_id()
        )))
        .header("Authorization", patient.bearer())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["slots"]["booked_times"], serde_json::json!(["13:00:00"]));
}

#[tokio::test]
async fn test_schedule_views_respect_ownership() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let other_doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;
    let other_patient = register_patient(&app).await;

    booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), future_date(15), "10:00:00").await).await;

    let get = |user: &TestUser, path: String| {
        let request = app
            .client
            .get(app.url(&path))
            .header("Authorization", user.bearer());
        async move { request.send().await.unwrap().status() }
    };

    let schedule = format!("/api/v1/appointments/doctor/{}", doctor.doctor_id());
    assert_eq!(get(&doctor, schedule.clone()).await, 200);
    assert_eq!(get(&other_doctor, schedule.clone()).await, 403);
    assert_eq!(get(&patient, schedule).await, 403);

    let upcoming = format!("/api/v1/appointments/patient/{}/upcoming", patient.patient_id());
    assert_eq!(get(&patient, upcoming.clone()).await, 200);
    // Doctors may look up any patient's appointments
    assert_eq!(get(&other_doctor, upcoming.clone()).await, 200);
    assert_eq!(get(&other_patient, upcoming).await, 403);
}

#[tokio::test]
async fn test_patient_upcoming_and_history() {
    let Some(app) = TestApp::with_database().await else { return };
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;

    let future = booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), future_date(16), "10:00:00").await).await;
    let done = booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), future_date(17), "10:00:00").await).await;
    let response = set_status(&app, &doctor, &done, "COMPLETED").await;
    assert_eq!(response.status(), 200);

    let upcoming: serde_json::Value = app
        .client
        .get(app.url(&format!("/api/v1/appointments/patient/{}/upcoming", patient.patient_id())))
        .header("Authorization", patient.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(upcoming["count"], 2);
    assert_eq!(upcoming["appointments"][0]["id"], future);

    let history: serde_json::Value = app
        .client
        .get(app.url(&format!("/api/v1/appointments/patient/{}/history", patient.patient_id())))
        .header("Authorization", patient.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // Completed appointments count as history even when dated in the future
    assert_eq!(history["count"], 1);
    assert_eq!(history["appointments"][0]["id"], done);
}

#[tokio::test]
async fn test_admin_listing_filters_and_validates_range() {
    let Some(app) = TestApp::with_database().await else { return };
    let admin = create_admin(&app).await;
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;
    let date = future_date(18);

    let id = booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), date, "17:00:00").await).await;

    let response = app
        .client
        .get(app.url(&format!("/api/v1/appointments?status=SCHEDULED&from={date}&to={date}")))
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let appointments = body["appointments"].as_array().unwrap();
    assert!(appointments.iter().any(|a| a["id"] == id));
    assert!(appointments.iter().all(|a| a["status"] == "SCHEDULED"));
    assert!(appointments.iter().all(|a| a["appointment_date"] == date.to_string()));

    let inverted = app
        .client
        .get(app.url(&format!("/api/v1/appointments?from={}&to={date}", future_date(19))))
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(inverted.status(), 400);

    let forbidden = app
        .client
        .get(app.url("/api/v1/appointments"))
        .header("Authorization", patient.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);
}

#[tokio::test]
async fn test_delete_appointment_is_admin_only() {
    let Some(app) = TestApp::with_database().await else { return };
    let admin = create_admin(&app).await;
    let doctor = register_doctor(&app, "Cardiology").await;
    let patient = register_patient(&app).await;

    let id = booked_id(book(&app, &patient, doctor.doctor_id(), patient.patient_id(), future_date(20), "16:30:00").await).await;

    let denied = app
        .client
        .delete(app.url(&format!("/api/v1/appointments/{id}")))
        .header("Authorization", doctor.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 403);

    let deleted = app
        .client
        .delete(app.url(&format!("/api/v1/appointments/{id}")))
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 204);

    let gone = app
        .client
        .get(app.url(&format!("/api/v1/appointments/{id}")))
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), 404);
}
