use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::DoctorError;
use crate::services::DoctorDirectory;

pub struct DoctorState {
    pub directory: Arc<dyn DoctorDirectory>,
}

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotFound(_) => AppError::NotFound(e.to_string()),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

pub async fn list_doctors(State(state): State<Arc<DoctorState>>) -> Result<Json<Value>, AppError> {
    let doctors = state.directory.list_doctors().await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

pub async fn get_doctor(
    State(state): State<Arc<DoctorState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = state.directory.get_doctor(doctor_id).await?;
    Ok(Json(json!(doctor)))
}
