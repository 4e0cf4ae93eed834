use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use appointment_cell::{Actor, AppointmentStatus, AppointmentStore, Clock, StoreError};
use shared_models::auth::Role;

use crate::models::{SubmitSurveyRequest, Survey, SurveyError};
use crate::services::eligibility::SurveyEligibilityTracker;
use crate::services::prompts::SurveyPromptService;
use crate::services::store::{SurveyStore, SurveyStoreError};

const MIN_RATING: u8 = 1;
const MAX_RATING: u8 = 5;
const MAX_COMMENT_CHARS: usize = 2000;

impl From<StoreError> for SurveyError {
    fn from(e: StoreError) -> Self {
        SurveyError::DatabaseError(e.to_string())
    }
}

impl From<SurveyStoreError> for SurveyError {
    fn from(e: SurveyStoreError) -> Self {
        SurveyError::DatabaseError(e.to_string())
    }
}

pub struct SurveyService {
    surveys: Arc<dyn SurveyStore>,
    appointments: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    prompts: Option<SurveyPromptService>,
}

impl SurveyService {
    pub fn new(
        surveys: Arc<dyn SurveyStore>,
        appointments: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            surveys,
            appointments,
            clock,
            prompts: None,
        }
    }

    /// Withdraw queued prompts from `prompts` once their survey is stored.
    pub fn with_prompts(mut self, prompts: SurveyPromptService) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Completed, not yet surveyed appointments of the calling patient, in
    /// appointment order.
    pub async fn eligible_appointments(&self, actor: &Actor) -> Result<Vec<Uuid>, SurveyError> {
        if actor.role != Role::Patient {
            return Err(SurveyError::Unauthorized("only patients take surveys".to_string()));
        }

        let appointments = self.appointments.list_for_patient(actor.user_id).await?;
        let submitted = self.surveys.submitted_survey_appointment_ids(actor.user_id).await?;
        let eligible = SurveyEligibilityTracker::eligible_for_survey(actor.user_id, &appointments, &submitted);

        Ok(appointments
            .iter()
            .filter(|a| eligible.contains(&a.id))
            .map(|a| a.id)
            .collect())
    }

    #[instrument(skip(self, request), fields(appointment_id = %request.appointment_id))]
    pub async fn submit(&self, actor: &Actor, request: SubmitSurveyRequest) -> Result<Survey, SurveyError> {
        if !(MIN_RATING..=MAX_RATING).contains(&request.rating) {
            return Err(SurveyError::Validation(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        let comment = request
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if comment.as_ref().is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS) {
            return Err(SurveyError::Validation(format!(
                "comment must be at most {} characters",
                MAX_COMMENT_CHARS
            )));
        }

        let appointment = self
            .appointments
            .get(request.appointment_id)
            .await?
            .ok_or(SurveyError::NotFound(request.appointment_id))?;

        if actor.role != Role::Patient || appointment.patient_id != actor.user_id {
            warn!("User {} tried to survey appointment {}", actor.user_id, appointment.id);
            return Err(SurveyError::Unauthorized(
                "only the appointment's patient can submit its survey".to_string(),
            ));
        }

        if appointment.status != AppointmentStatus::Completed {
            return Err(SurveyError::NotEligible {
                appointment_id: appointment.id,
                status: appointment.status,
            });
        }

        let survey = Survey {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            rating: request.rating,
            comment,
            created_at: self.clock.now(),
        };

        let stored = self.surveys.insert(survey).await.map_err(|e| match e {
            SurveyStoreError::Duplicate => SurveyError::AlreadySubmitted(appointment.id),
            other => other.into(),
        })?;

        if let Some(prompts) = &self.prompts {
            prompts.dismiss(stored.patient_id, stored.appointment_id);
        }

        info!("Survey {} stored for appointment {} (rating {})", stored.id, stored.appointment_id, stored.rating);
        Ok(stored)
    }
}
