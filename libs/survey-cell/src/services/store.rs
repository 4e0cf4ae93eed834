use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};

use crate::models::Survey;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurveyStoreError {
    /// The appointment already has a survey.
    #[error("survey already exists for appointment")]
    Duplicate,

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Must reject a second survey for the same appointment.
    async fn insert(&self, survey: Survey) -> Result<Survey, SurveyStoreError>;

    async fn submitted_survey_appointment_ids(&self, patient_id: Uuid) -> Result<HashSet<Uuid>, SurveyStoreError>;
}

#[derive(Default)]
pub struct InMemorySurveyStore {
    by_appointment: RwLock<HashMap<Uuid, Survey>>,
}

impl InMemorySurveyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SurveyStore for InMemorySurveyStore {
    async fn insert(&self, survey: Survey) -> Result<Survey, SurveyStoreError> {
        let mut surveys = self.by_appointment.write().await;
        if surveys.contains_key(&survey.appointment_id) {
            return Err(SurveyStoreError::Duplicate);
        }
        surveys.insert(survey.appointment_id, survey.clone());
        Ok(survey)
    }

    async fn submitted_survey_appointment_ids(&self, patient_id: Uuid) -> Result<HashSet<Uuid>, SurveyStoreError> {
        Ok(self
            .by_appointment
            .read()
            .await
            .values()
            .filter(|s| s.patient_id == patient_id)
            .map(|s| s.appointment_id)
            .collect())
    }
}

/// PostgREST-backed store; `surveys.appointment_id` is unique in the schema,
/// so a duplicate comes back as HTTP 409.
pub struct SupabaseSurveyStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseSurveyStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[derive(Deserialize)]
struct SurveyRef {
    appointment_id: Uuid,
}

#[async_trait]
impl SurveyStore for SupabaseSurveyStore {
    async fn insert(&self, survey: Survey) -> Result<Survey, SurveyStoreError> {
        debug!("Inserting survey for appointment {}", survey.appointment_id);

        let body = serde_json::to_value(&survey).map_err(|e| SurveyStoreError::Backend(e.to_string()))?;

        let result: Vec<Survey> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/surveys",
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(detail) => {
                    warn!("Duplicate survey for appointment {}: {}", survey.appointment_id, detail);
                    SurveyStoreError::Duplicate
                }
                other => SurveyStoreError::Backend(other.to_string()),
            })?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| SurveyStoreError::Backend("insert returned no row".to_string()))
    }

    async fn submitted_survey_appointment_ids(&self, patient_id: Uuid) -> Result<HashSet<Uuid>, SurveyStoreError> {
        let path = format!("/rest/v1/surveys?select=appointment_id&patient_id=eq.{}", patient_id);

        let rows: Vec<SurveyRef> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SurveyStoreError::Backend(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.appointment_id).collect())
    }
}
