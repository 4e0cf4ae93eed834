// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use doctor_cell::DoctorDirectory;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{Actor, AppointmentError, AvailabilityQuery, BookAppointmentRequest};
use crate::services::booking::AppointmentBookingService;
use crate::services::clock::Clock;
use crate::services::events::LifecycleEventBus;
use crate::services::lifecycle::{AppointmentLifecycle, AppointmentLifecycleService};
use crate::services::query::AppointmentQueryService;
use crate::services::slots::SlotCalendar;
use crate::services::store::AppointmentStore;

pub struct AppointmentState {
    pub booking: AppointmentBookingService,
    pub lifecycle: AppointmentLifecycleService,
    pub queries: AppointmentQueryService,
}

impl AppointmentState {
    /// Wire every appointment service over one shared store and event bus.
    pub fn new(
        calendar: SlotCalendar,
        store: Arc<dyn AppointmentStore>,
        doctors: Arc<dyn DoctorDirectory>,
        events: LifecycleEventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            booking: AppointmentBookingService::new(
                calendar,
                store.clone(),
                doctors.clone(),
                events.clone(),
                clock.clone(),
            ),
            lifecycle: AppointmentLifecycleService::new(store.clone(), doctors.clone(), events, clock.clone()),
            queries: AppointmentQueryService::new(store, doctors, clock),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::Unauthorized(msg) => AppError::Forbidden(msg),
            AppointmentError::NotFound(_) | AppointmentError::DoctorNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            AppointmentError::Conflict { .. } | AppointmentError::InvalidTransition { .. } => {
                AppError::Conflict(e.to_string())
            }
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

pub async fn get_availability(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let availability = state.booking.availability(query.doctor_id, query.date).await?;
    Ok(Json(json!(availability)))
}

pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = state.booking.book_appointment(&Actor::from(&user), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
        })),
    ))
}

// ==============================================================================
// QUERY HANDLERS
// ==============================================================================

pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.queries.list_for_actor(&Actor::from(&user)).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .queries
        .get_appointment(&Actor::from(&user), appointment_id)
        .await?;

    Ok(Json(json!({
        "appointment": appointment,
        "valid_actions": AppointmentLifecycle::valid_actions(appointment.status),
    })))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.lifecycle.cancel(&Actor::from(&user), appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment canceled"
    })))
}

pub async fn complete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.lifecycle.complete(&Actor::from(&user), appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}
