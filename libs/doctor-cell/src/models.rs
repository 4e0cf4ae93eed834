use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Doctor as published by the directory. Scheduling only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    #[serde(default)]
    pub contact: Option<String>,
    /// Free-text working hours as entered by the clinic. Display only;
    /// bookable slots come from the clinic-wide grid.
    #[serde(default)]
    pub work_schedule: Option<String>,
}

impl Doctor {
    pub fn new(full_name: &str, specialty: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.to_string(),
            specialty: specialty.to_string(),
            contact: None,
            work_schedule: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
