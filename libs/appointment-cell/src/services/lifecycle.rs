// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::{DoctorDirectory, DoctorError};
use shared_models::auth::Role;

use crate::models::{Actor, Appointment, AppointmentError, AppointmentStatus, LifecycleAction};
use crate::services::booking::doctor_error;
use crate::services::clock::Clock;
use crate::services::events::{
    AppointmentCanceled, AppointmentCompleted, LifecycleEvent, LifecycleEventBus,
};
use crate::services::store::{AppointmentStore, StoreError};

/// Appointment state machine.
///
/// ```text
/// Scheduled --cancel (patient|doctor)--> Canceled
/// Scheduled --complete (doctor)--------> Completed
/// ```
///
/// Completed and Canceled are terminal. Nothing moves on its own: an
/// appointment whose time has passed stays Scheduled until its doctor
/// completes it.
pub struct AppointmentLifecycle;

impl AppointmentLifecycle {
    pub fn next_status(
        current: AppointmentStatus,
        action: LifecycleAction,
    ) -> Result<AppointmentStatus, AppointmentError> {
        match (current, action) {
            (AppointmentStatus::Scheduled, LifecycleAction::Cancel) => Ok(AppointmentStatus::Canceled),
            (AppointmentStatus::Scheduled, LifecycleAction::Complete) => Ok(AppointmentStatus::Completed),
            (from, action) => {
                warn!("Invalid status transition attempted: {} on {}", action, from);
                Err(AppointmentError::InvalidTransition { from, action })
            }
        }
    }

    pub fn valid_actions(current: AppointmentStatus) -> &'static [LifecycleAction] {
        match current {
            AppointmentStatus::Scheduled => &[LifecycleAction::Cancel, LifecycleAction::Complete],
            AppointmentStatus::Completed | AppointmentStatus::Canceled => &[],
        }
    }

    /// Only the appointment's own patient or doctor may cancel; only its
    /// doctor may complete.
    pub fn authorize(
        appointment: &Appointment,
        actor: &Actor,
        action: LifecycleAction,
    ) -> Result<(), AppointmentError> {
        let is_patient = actor.role == Role::Patient && appointment.patient_id == actor.user_id;
        let is_doctor = actor.role == Role::Doctor && appointment.doctor_id == actor.user_id;

        let allowed = match action {
            LifecycleAction::Cancel => is_patient || is_doctor,
            LifecycleAction::Complete => is_doctor,
        };

        if allowed {
            Ok(())
        } else {
            Err(AppointmentError::Unauthorized(format!(
                "{} {} may not {} appointment {}",
                actor.role, actor.user_id, action, appointment.id
            )))
        }
    }
}

pub struct AppointmentLifecycleService {
    store: Arc<dyn AppointmentStore>,
    doctors: Arc<dyn DoctorDirectory>,
    events: LifecycleEventBus,
    clock: Arc<dyn Clock>,
}

impl AppointmentLifecycleService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        doctors: Arc<dyn DoctorDirectory>,
        events: LifecycleEventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            doctors,
            events,
            clock,
        }
    }

    pub async fn cancel(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.apply(actor, appointment_id, LifecycleAction::Cancel).await
    }

    pub async fn complete(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.apply(actor, appointment_id, LifecycleAction::Complete).await
    }

    #[instrument(skip(self))]
    async fn apply(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        action: LifecycleAction,
    ) -> Result<Appointment, AppointmentError> {
        let current = self
            .store
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        AppointmentLifecycle::authorize(&current, actor, action)?;
        let next = AppointmentLifecycle::next_status(current.status, action)?;

        // Resolved before the write so the event can be published right after it.
        let completed_by = match action {
            LifecycleAction::Complete => Some(self.doctor_display(current.doctor_id).await?),
            LifecycleAction::Cancel => None,
        };

        let updated = self
            .store
            .transition(appointment_id, current.status, next, self.clock.now())
            .await
            .map_err(|e| match e {
                StoreError::StatusMismatch(found) => {
                    warn!("Lost transition race on {}: now {}", appointment_id, found);
                    AppointmentError::InvalidTransition { from: found, action }
                }
                StoreError::NotFound => AppointmentError::NotFound(appointment_id),
                other => other.into(),
            })?;

        info!("Appointment {} {} -> {} by {}", updated.id, current.status, updated.status, actor.role);

        let event = match completed_by {
            Some((doctor_name, specialty)) => LifecycleEvent::Completed(AppointmentCompleted {
                appointment_id: updated.id,
                doctor_name,
                specialty,
                patient_id: updated.patient_id,
                date: updated.scheduled_at.date(),
            }),
            None => LifecycleEvent::Canceled(AppointmentCanceled {
                appointment_id: updated.id,
                doctor_id: updated.doctor_id,
                patient_id: updated.patient_id,
                canceled_by: actor.role,
            }),
        };
        self.events.publish(event);

        Ok(updated)
    }

    /// Doctor name and specialty for the completion event. A doctor missing
    /// from the directory does not block completion.
    async fn doctor_display(&self, doctor_id: Uuid) -> Result<(String, String), AppointmentError> {
        match self.doctors.get_doctor(doctor_id).await {
            Ok(doctor) => Ok((doctor.full_name, doctor.specialty)),
            Err(DoctorError::NotFound(_)) => {
                debug!("Doctor {} missing from directory, completing without display data", doctor_id);
                Ok((String::new(), String::new()))
            }
            Err(e) => Err(doctor_error(e)),
        }
    }
}
