use booking::{config::AdminConfig, services::users::ensure_admin_account};
use chrono::{Days, Local, NaiveDate};
use nanoid::nanoid;
use reqwest::{Response, StatusCode};
use secrecy::SecretString;
use serde_json::Value;
use uuid::Uuid;

use super::TestApp;

const LOWER_ALNUM: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];
const DIGITS: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

pub const TEST_PASSWORD: &str = "password123";

/// Unique identifier with a readable prefix, e.g. `test_doc_k3j9x0a1b2c3`
pub fn unique_name(prefix: &str) -> String {
    format!("test_{}_{}", prefix, nanoid!(12, &LOWER_ALNUM))
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}@example.com", unique_name(prefix))
}

/// Random number in the local `0XXXXXXXXX` format
pub fn unique_phone() -> String {
    format!("0{}", nanoid!(9, &DIGITS))
}

/// A weekday-agnostic date safely in the future
pub fn future_date(days: u64) -> NaiveDate {
    Local::now().date_naive() + Days::new(days)
}

/// A registered account with its bearer token and linked profile ids
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn doctor_id(&self) -> Uuid {
        self.doctor_id.expect("account has no doctor profile")
    }

    pub fn patient_id(&self) -> Uuid {
        self.patient_id.expect("account has no patient profile")
    }
}

fn parse_uuid(value: &Value) -> Option<Uuid> {
    value.as_str().map(|s| Uuid::parse_str(s).unwrap())
}

/// Logs in and resolves profile ids through `/auth/me`
pub async fn login(app: &TestApp, username: &str, password: &str) -> TestUser {
    let response = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&serde_json::json!({
            "username": username,
            "password": password,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "login failed for {username}");

    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let me: Value = app
        .client
        .get(app.url("/api/v1/auth/me"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    TestUser {
        id: parse_uuid(&me["user"]["id"]).unwrap(),
        username: username.to_string(),
        email: me["user"]["email"].as_str().unwrap().to_string(),
        token,
        doctor_id: parse_uuid(&me["doctor_id"]),
        patient_id: parse_uuid(&me["patient_id"]),
    }
}

/// Registers an account with the given role and logs in
pub async fn register(app: &TestApp, role: &str, extra: Value) -> TestUser {
    let username = unique_name(&role.to_lowercase());
    let mut body = serde_json::json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": TEST_PASSWORD,
        "roles": [role],
        "full_name": format!("{} Tester", role.to_lowercase()),
    });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            body.insert(key.clone(), value.clone());
        }
    }

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED, "register failed for {username}");

    login(app, &username, TEST_PASSWORD).await
}

pub async fn register_patient(app: &TestApp) -> TestUser {
    register(app, "PATIENT", serde_json::json!({})).await
}

pub async fn register_doctor(app: &TestApp, specialization: &str) -> TestUser {
    register(
        app,
        "DOCTOR",
        serde_json::json!({ "specialization": specialization }),
    )
    .await
}

/// Seeds a fresh administrator through the startup path and logs in
pub async fn create_admin(app: &TestApp) -> TestUser {
    let username = unique_name("admin");
    let admin = AdminConfig {
        username: username.clone(),
        email: format!("{username}@example.com"),
        password: Some(SecretString::from(TEST_PASSWORD)),
    };

    let mut conn = app.pool.acquire().await.unwrap();
    let created = ensure_admin_account(&mut conn, &admin).await.unwrap();
    assert!(created.is_some(), "admin account should be created");

    login(app, &username, TEST_PASSWORD).await
}

/// Books an appointment and returns the raw response
pub async fn book(
    app: &TestApp,
    user: &TestUser,
    doctor_id: Uuid,
    patient_id: Uuid,
    date: NaiveDate,
    time: &str,
) -> Response {
    app.client
        .post(app.url("/api/v1/appointments"))
        .header("Authorization", user.bearer())
        .json(&serde_json::json!({
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "appointment_date": date,
            "appointment_time": time,
        }))
        .send()
        .await
        .unwrap()
}
