use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::{
    appointment_routes, AppointmentState, FixedClock, InMemoryAppointmentStore, LifecycleEventBus,
    SlotCalendar,
};
use doctor_cell::{Doctor, InMemoryDoctorDirectory};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    router: Router,
    config: TestConfig,
    doctor: Doctor,
}

fn test_app() -> TestApp {
    let config = TestConfig::default();
    let doctor = Doctor::new("Dr. Sofia Marquez", "Cardiology");
    let now = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(7, 0, 0).unwrap();

    let state = AppointmentState::new(
        SlotCalendar::new(config.scheduling.clone()),
        Arc::new(InMemoryAppointmentStore::new()),
        Arc::new(InMemoryDoctorDirectory::with_doctors(vec![doctor.clone()])),
        LifecycleEventBus::default(),
        Arc::new(FixedClock::new(now)),
    );

    TestApp {
        router: appointment_routes(config.to_arc(), Arc::new(state)),
        config,
        doctor,
    }
}

impl TestApp {
    async fn call(&self, method: Method, uri: &str, user: &TestUser, body: Option<Value>) -> (StatusCode, Value) {
        let token = JwtTestUtils::create_test_token(user, &self.config.jwt_secret, None);
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, JwtTestUtils::bearer(&token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn booking(&self, time: &str) -> Value {
        json!({ "doctor_id": self.doctor.id, "date": "2025-03-10", "time": time })
    }
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_book_then_conflict() {
    let app = test_app();
    let first = TestUser::patient("first@example.com");
    let second = TestUser::patient("second@example.com");

    let (status, body) = app.call(Method::POST, "/", &first, Some(app.booking("09:00"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], "scheduled");
    assert_eq!(body["appointment"]["scheduled_at"], "2025-03-10T09:00:00");

    let (status, body) = app.call(Method::POST, "/", &second, Some(app.booking("09:00"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already has an appointment"));
}

#[tokio::test]
async fn test_invalid_booking_is_bad_request() {
    let app = test_app();
    let patient = TestUser::patient("p@example.com");

    let (status, _) = app.call(Method::POST, "/", &patient, Some(app.booking("09:10"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_availability_lists_grid_after_buffer() {
    let app = test_app();
    let patient = TestUser::patient("p@example.com");
    let uri = format!("/availability?doctor_id={}&date=2025-03-10", app.doctor.id);

    let (status, body) = app.call(Method::GET, &uri, &patient, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"][0], "08:00");
    assert_eq!(body["date_disabled"], false);
}

#[tokio::test]
async fn test_unknown_doctor_availability_is_not_found() {
    let app = test_app();
    let patient = TestUser::patient("p@example.com");
    let uri = format!("/availability?doctor_id={}&date=2025-03-10", Uuid::new_v4());

    let (status, _) = app.call(Method::GET, &uri, &patient, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lifecycle_over_http() {
    let app = test_app();
    let patient = TestUser::patient("p@example.com");
    let doctor = TestUser::doctor("doc@example.com").with_id(app.doctor.id);

    let (_, body) = app.call(Method::POST, "/", &patient, Some(app.booking("10:00"))).await;
    let id = body["appointment"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.call(Method::POST, &format!("/{}/complete", id), &patient, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(Method::POST, &format!("/{}/complete", id), &doctor, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "completed");

    let (status, _) = app.call(Method::POST, &format!("/{}/cancel", id), &doctor, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.call(Method::GET, &format!("/{}", id), &patient, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid_actions"], json!([]));
}

#[tokio::test]
async fn test_list_returns_callers_appointments() {
    let app = test_app();
    let patient = TestUser::patient("p@example.com");
    app.call(Method::POST, "/", &patient, Some(app.booking("16:00"))).await;
    app.call(Method::POST, "/", &patient, Some(app.booking("11:00"))).await;

    let (status, body) = app.call(Method::GET, "/", &patient, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["appointments"][0]["time"], "11:00");
    assert_eq!(body["appointments"][0]["doctor_name"], "Dr. Sofia Marquez");
}

#[tokio::test]
async fn test_unknown_appointment_is_not_found() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com").with_id(app.doctor.id);

    let (status, _) = app
        .call(Method::POST, &format!("/{}/cancel", Uuid::new_v4()), &doctor, None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
