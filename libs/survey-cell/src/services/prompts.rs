use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use appointment_cell::services::events::AppointmentCompleted;
use appointment_cell::{spawn_listener, LifecycleEvent, LifecycleEventBus};

use crate::models::SurveyPrompt;

/// Best-effort "rate your visit" prompts, queued per patient from
/// completion events and drained by polling. A prompt lost to a restart or a
/// lagging listener is not replayed; the appointment stays eligible anyway.
#[derive(Clone, Default)]
pub struct SurveyPromptService {
    pending: Arc<Mutex<HashMap<Uuid, Vec<SurveyPrompt>>>>,
}

impl SurveyPromptService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start queueing prompts from `bus`.
    pub fn listen(&self, bus: &LifecycleEventBus) -> JoinHandle<()> {
        let prompts = self.clone();
        spawn_listener("survey-prompt", bus.subscribe(), move |event| {
            if let LifecycleEvent::Completed(completed) = event {
                prompts.record(completed);
            }
        })
    }

    pub fn record(&self, completed: AppointmentCompleted) {
        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let queue = pending.entry(completed.patient_id).or_default();

        if queue.iter().any(|p| p.appointment_id == completed.appointment_id) {
            return;
        }

        debug!("Queued survey prompt for appointment {}", completed.appointment_id);
        queue.push(SurveyPrompt {
            appointment_id: completed.appointment_id,
            doctor_name: completed.doctor_name,
            specialty: completed.specialty,
            date: completed.date,
        });
    }

    /// Withdraw the prompt for an appointment that no longer needs a survey.
    pub fn dismiss(&self, patient_id: Uuid, appointment_id: Uuid) {
        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(queue) = pending.get_mut(&patient_id) {
            queue.retain(|p| p.appointment_id != appointment_id);
            if queue.is_empty() {
                pending.remove(&patient_id);
            }
        }
    }

    /// Remove and return every pending prompt of `patient_id`.
    pub fn take_prompts(&self, patient_id: Uuid) -> Vec<SurveyPrompt> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&patient_id)
            .unwrap_or_default()
    }

    /// Patients with at least one queued prompt.
    pub fn pending_patients(&self) -> usize {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}
