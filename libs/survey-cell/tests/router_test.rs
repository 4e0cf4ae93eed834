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
    Actor, Appointment, AppointmentLifecycleService, BookingConflictGuard, FixedClock,
    InMemoryAppointmentStore, LifecycleEventBus,
};
use doctor_cell::{Doctor, InMemoryDoctorDirectory};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
use survey_cell::{survey_routes, InMemorySurveyStore, SurveyPromptService, SurveyService, SurveyState};

struct TestApp {
    router: Router,
    config: TestConfig,
    guard: BookingConflictGuard,
    lifecycle: AppointmentLifecycleService,
    doctor: Doctor,
}

fn test_app() -> TestApp {
    let config = TestConfig::default();
    let doctor = Doctor::new("Dr. Priya Raman", "Endocrinology");
    let directory = Arc::new(InMemoryDoctorDirectory::with_doctors(vec![doctor.clone()]));
    let appointments = Arc::new(InMemoryAppointmentStore::new());
    let clock = Arc::new(FixedClock::new(
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(18, 0, 0).unwrap(),
    ));
    let events = LifecycleEventBus::default();

    let prompts = SurveyPromptService::new();
    let state = SurveyState {
        service: SurveyService::new(Arc::new(InMemorySurveyStore::new()), appointments.clone(), clock.clone())
            .with_prompts(prompts.clone()),
        prompts,
    };

    TestApp {
        router: survey_routes(config.to_arc(), Arc::new(state)),
        config,
        guard: BookingConflictGuard::new(appointments.clone(), events.clone()),
        lifecycle: AppointmentLifecycleService::new(appointments, directory, events, clock),
        doctor,
    }
}

impl TestApp {
    async fn completed_visit(&self, patient: &TestUser) -> Appointment {
        let at = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let appointment = self.guard.book(self.doctor.id, patient.id, at, at).await.unwrap();
        self.lifecycle
            .complete(&Actor::doctor(self.doctor.id), appointment.id)
            .await
            .unwrap()
    }

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
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn test_survey_round_over_http() {
    let app = test_app();
    let patient = TestUser::patient("patient@example.com");
    let visit = app.completed_visit(&patient).await;

    let (status, body) = app.call(Method::GET, "/eligible", &patient, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment_ids"], json!([visit.id]));

    let survey = json!({ "appointment_id": visit.id, "rating": 5, "comment": "Clear explanations" });
    let (status, body) = app.call(Method::POST, "/", &patient, Some(survey.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["survey"]["rating"], 5);

    let (status, _) = app.call(Method::POST, "/", &patient, Some(survey)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.call(Method::GET, "/eligible", &patient, None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = test_app();
    let patient = TestUser::patient("patient@example.com");
    let at = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(11, 0, 0).unwrap();
    let scheduled = app.guard.book(app.doctor.id, patient.id, at, at).await.unwrap();

    let (status, _) = app
        .call(Method::POST, "/", &patient, Some(json!({ "appointment_id": scheduled.id, "rating": 9 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::POST, "/", &patient, Some(json!({ "appointment_id": scheduled.id, "rating": 3 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .call(Method::POST, "/", &patient, Some(json!({ "appointment_id": Uuid::new_v4(), "rating": 3 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let doctor = TestUser::doctor("doc@example.com").with_id(app.doctor.id);
    let (status, _) = app.call(Method::GET, "/eligible", &doctor, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_prompts_drain_empty_queue() {
    let app = test_app();
    let patient = TestUser::patient("patient@example.com");

    let (status, body) = app.call(Method::GET, "/prompts", &patient, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompts"], json!([]));
}
