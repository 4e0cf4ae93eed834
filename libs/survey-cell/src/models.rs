use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::AppointmentStatus;

/// Patient satisfaction survey. At most one per appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSurveyRequest {
    pub appointment_id: Uuid,
    /// 1 (poor) to 5 (excellent).
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Pending "rate your visit" prompt queued when an appointment completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyPrompt {
    pub appointment_id: Uuid,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurveyError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Appointment {appointment_id} is {status}; only completed appointments can be surveyed")]
    NotEligible {
        appointment_id: Uuid,
        status: AppointmentStatus,
    },

    #[error("A survey was already submitted for appointment {0}")]
    AlreadySubmitted(Uuid),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
