//! Registration, login and account administration over HTTP

mod common;

use common::{TEST_PASSWORD, TestApp, create_admin, register_doctor, register_patient, unique_name};

#[tokio::test]
async fn test_register_defaults_to_patient_with_profile() {
    let Some(app) = TestApp::with_database().await else { return };
    let username = unique_name("reg");

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@Example.com", username.to_uppercase()),
            "password": TEST_PASSWORD,
            "full_name": "Olena Test",
            "phone": common::unique_phone(),
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["roles"], serde_json::json!(["PATIENT"]));
    // Emails are stored lower-cased
    assert_eq!(body["email"], format!("{username}@example.com"));

    let user = common::login(&app, &username, TEST_PASSWORD).await;
    assert!(user.patient_id.is_some());
    assert!(user.doctor_id.is_none());
}

#[tokio::test]
async fn test_register_doctor_creates_linked_doctor_profile() {
    let Some(app) = TestApp::with_database().await else { return };

    let doctor = register_doctor(&app, "Cardiology").await;

    let response = app
        .client
        .get(app.url(&format!("/api/v1/doctors/{}", doctor.doctor_id())))
        .header("Authorization", doctor.bearer())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["doctor"]["specialization"], "Cardiology");
    assert_eq!(body["doctor"]["user_id"], doctor.id.to_string());
}

#[tokio::test]
async fn test_register_rejects_admin_role() {
    let Some(app) = TestApp::with_database().await else { return };
    let username = unique_name("sneaky");

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": TEST_PASSWORD,
            "roles": ["ADMIN"],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["fields"]["roles"].is_string());
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let Some(app) = TestApp::with_database().await else { return };
    let username = unique_name("short");

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "abc",
            "full_name": "Short Password",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_register_reports_every_invalid_field() {
    let Some(app) = TestApp::with_database().await else { return };

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&serde_json::json!({
            "username": unique_name("many"),
            "email": "not-an-email",
            "password": "abc",
            "full_name": "Many Mistakes",
            "phone": "12345",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["fields"]["email"].is_string());
    assert!(body["fields"]["password"].is_string());
    assert!(body["fields"]["phone"].is_string());
    assert!(body["fields"]["username"].is_null());
}

#[tokio::test]
async fn test_authenticated_requests_fit_in_a_single_connection_pool() {
    let Some(app) = TestApp::with_database_config(|config| config.database.max_connections = 1).await
    else {
        return;
    };
    let patient = register_patient(&app).await;

    for path in ["/api/v1/auth/me", "/api/v1/doctors"] {
        let response = app
            .client
            .get(app.url(path))
            .header("Authorization", patient.bearer())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "{path}");
    }
}

#[tokio::test]
async fn test_register_duplicate_username_returns_409() {
    let Some(app) = TestApp::with_database().await else { return };
    let existing = register_patient(&app).await;

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&serde_json::json!({
            "username": existing.username,
            "email": common::unique_email("dup"),
            "password": TEST_PASSWORD,
            "full_name": "Duplicate User",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_login_with_wrong_password_returns_401() {
    let Some(app) = TestApp::with_database().await else { return };
    let user = register_patient(&app).await;

    let response = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&serde_json::json!({
            "username": user.username,
            "password": "wrong-password",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_login_unknown_user_returns_401() {
    let Some(app) = TestApp::with_database().await else { return };

    let response = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&serde_json::json!({
            "username": unique_name("ghost"),
            "password": TEST_PASSWORD,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_me_lists_effective_permissions() {
    let Some(app) = TestApp::with_database().await else { return };
    let user = register_patient(&app).await;

    let response = app
        .client
        .get(app.url("/api/v1/auth/me"))
        .header("Authorization", user.bearer())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let permissions: Vec<String> = serde_json::from_value(body["permissions"].clone()).unwrap();
    assert!(permissions.contains(&"appointments:book_own".to_string()));
    assert!(!permissions.contains(&"users:manage".to_string()));
    // Password hashes never leave the server
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_users_listing_requires_admin() {
    let Some(app) = TestApp::with_database().await else { return };
    let patient = register_patient(&app).await;
    let admin = create_admin(&app).await;

    let forbidden = app
        .client
        .get(app.url("/api/v1/users"))
        .header("Authorization", patient.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);

    let allowed = app
        .client
        .get(app.url("/api/v1/users"))
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);
    let body: serde_json::Value = allowed.json().await.unwrap();
    assert!(body["count"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn test_disabled_account_is_locked_out() {
    let Some(app) = TestApp::with_database().await else { return };
    let patient = register_patient(&app).await;
    let admin = create_admin(&app).await;

    let response = app
        .client
        .patch(app.url(&format!("/api/v1/users/{}", patient.id)))
        .header("Authorization", admin.bearer())
        .json(&serde_json::json!({ "enabled": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Existing token stops working
    let me = app
        .client
        .get(app.url("/api/v1/auth/me"))
        .header("Authorization", patient.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), 401);

    // And so does a fresh login
    let login = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&serde_json::json!({
            "username": patient.username,
            "password": TEST_PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 401);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let Some(app) = TestApp::with_database().await else { return };
    let admin = create_admin(&app).await;

    let response = app
        .client
        .delete(app.url(&format!("/api/v1/users/{}", admin.id)))
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}
