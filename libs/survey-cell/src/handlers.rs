use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use appointment_cell::Actor;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{SubmitSurveyRequest, SurveyError};
use crate::services::{SurveyPromptService, SurveyService};

pub struct SurveyState {
    pub service: SurveyService,
    pub prompts: SurveyPromptService,
}

impl From<SurveyError> for AppError {
    fn from(e: SurveyError) -> Self {
        match e {
            SurveyError::Validation(msg) => AppError::ValidationError(msg),
            SurveyError::NotFound(_) => AppError::NotFound(e.to_string()),
            SurveyError::Unauthorized(msg) => AppError::Forbidden(msg),
            SurveyError::NotEligible { .. } => AppError::Unprocessable(e.to_string()),
            SurveyError::AlreadySubmitted(_) => AppError::Conflict(e.to_string()),
            SurveyError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

pub async fn get_eligible(
    State(state): State<Arc<SurveyState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let eligible = state.service.eligible_appointments(&Actor::from(&user)).await?;

    Ok(Json(json!({
        "appointment_ids": eligible,
        "total": eligible.len()
    })))
}

pub async fn submit_survey(
    State(state): State<Arc<SurveyState>>,
    Extension(user): Extension<User>,
    Json(request): Json<SubmitSurveyRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let survey = state.service.submit(&Actor::from(&user), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "survey": survey,
        })),
    ))
}

pub async fn take_prompts(
    State(state): State<Arc<SurveyState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let prompts = state.prompts.take_prompts(user.id);
    Ok(Json(json!({ "prompts": prompts })))
}
