//! HTTP route table
//!
//! Everything lives under `/api/v1`. Health and the auth entry points are
//! public; every other route passes through [`jwt_auth_middleware`].

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{appointments, auth, doctors, health, patients, users},
    middleware::jwt_auth_middleware,
    state::AppState,
};

/// Builds the application router with all layers applied.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        // Accounts
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        // Doctors
        .route(
            "/doctors",
            get(doctors::list_doctors).post(doctors::create_doctor),
        )
        .route("/doctors/search", get(doctors::search_doctors))
        .route("/doctors/most-booked", get(doctors::list_most_booked_doctors))
        .route("/doctors/email/{email}", get(doctors::get_doctor_by_email))
        .route(
            "/doctors/specialization/{specialization}",
            get(doctors::list_doctors_by_specialization),
        )
        .route(
            "/doctors/{id}",
            get(doctors::get_doctor)
                .put(doctors::update_doctor)
                .delete(doctors::delete_doctor),
        )
        // Patients
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route("/patients/search", get(patients::search_patients))
        .route("/patients/email/{email}", get(patients::get_patient_by_email))
        .route("/patients/phone/{phone}", get(patients::get_patient_by_phone))
        .route(
            "/patients/by-doctor/{doctor_id}",
            get(patients::list_patients_by_doctor),
        )
        .route(
            "/patients/{id}",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        // Appointments
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/appointments/{id}",
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        .route(
            "/appointments/{id}/cancel",
            patch(appointments::cancel_appointment),
        )
        .route(
            "/appointments/doctor/{doctor_id}",
            get(appointments::list_doctor_appointments),
        )
        .route(
            "/appointments/doctor/{doctor_id}/upcoming",
            get(appointments::list_upcoming_doctor_appointments),
        )
        .route(
            "/appointments/doctor/{doctor_id}/booked-slots",
            get(appointments::get_booked_slots),
        )
        .route(
            "/appointments/patient/{patient_id}",
            get(appointments::list_patient_appointments),
        )
        .route(
            "/appointments/patient/{patient_id}/upcoming",
            get(appointments::list_upcoming_patient_appointments),
        )
        .route(
            "/appointments/patient/{patient_id}/history",
            get(appointments::list_patient_history),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
