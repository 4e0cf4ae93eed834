use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use appointment_cell::{Appointment, AppointmentStatus};

/// Which of a patient's appointments still await a survey.
///
/// Derived on every call from the appointments and the ids already surveyed;
/// nothing is stored.
pub struct SurveyEligibilityTracker;

impl SurveyEligibilityTracker {
    pub fn eligible_for_survey(
        patient_id: Uuid,
        appointments: &[Appointment],
        submitted_ids: &HashSet<Uuid>,
    ) -> HashSet<Uuid> {
        let eligible: HashSet<Uuid> = appointments
            .iter()
            .filter(|a| Self::is_eligible(patient_id, a, submitted_ids))
            .map(|a| a.id)
            .collect();

        debug!(
            "{} of {} appointments eligible for survey for patient {}",
            eligible.len(),
            appointments.len(),
            patient_id
        );

        eligible
    }

    pub fn is_eligible(patient_id: Uuid, appointment: &Appointment, submitted_ids: &HashSet<Uuid>) -> bool {
        appointment.patient_id == patient_id
            && appointment.status == AppointmentStatus::Completed
            && !submitted_ids.contains(&appointment.id)
    }
}
