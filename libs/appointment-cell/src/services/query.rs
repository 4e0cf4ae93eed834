// libs/appointment-cell/src/services/query.rs
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::{Doctor, DoctorDirectory};
use shared_models::auth::Role;

use crate::models::{Actor, Appointment, AppointmentError, AppointmentSummary};
use crate::services::booking::doctor_error;
use crate::services::clock::Clock;
use crate::services::ordering::AppointmentSortPresenter;
use crate::services::slots::SlotCalendar;
use crate::services::store::AppointmentStore;

pub struct AppointmentQueryService {
    store: Arc<dyn AppointmentStore>,
    doctors: Arc<dyn DoctorDirectory>,
    clock: Arc<dyn Clock>,
}

impl AppointmentQueryService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        doctors: Arc<dyn DoctorDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, doctors, clock }
    }

    /// Visible to its patient, its doctor and admins.
    pub async fn get_appointment(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        if actor.role != Role::Admin && !appointment.involves(actor.user_id) {
            warn!("User {} tried to read appointment {}", actor.user_id, appointment_id);
            return Err(AppointmentError::Unauthorized(
                "not a participant of this appointment".to_string(),
            ));
        }

        Ok(appointment)
    }

    /// The caller's own appointments in display order.
    pub async fn list_for_actor(&self, actor: &Actor) -> Result<Vec<AppointmentSummary>, AppointmentError> {
        let appointments = match actor.role {
            Role::Patient => self.store.list_for_patient(actor.user_id).await?,
            Role::Doctor => self.store.list_for_doctor(actor.user_id).await?,
            Role::Admin => {
                return Err(AppointmentError::Unauthorized(
                    "admins have no personal appointment list".to_string(),
                ))
            }
        };

        debug!("Listing {} appointments for {} {}", appointments.len(), actor.role, actor.user_id);

        let doctors: HashMap<Uuid, Doctor> = self
            .doctors
            .list_doctors()
            .await
            .map_err(doctor_error)?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        let summaries: Vec<AppointmentSummary> = appointments
            .iter()
            .map(|a| summarize(a, doctors.get(&a.doctor_id)))
            .collect();

        Ok(AppointmentSortPresenter::sorted(summaries, self.clock.now()))
    }
}

pub fn summarize(appointment: &Appointment, doctor: Option<&Doctor>) -> AppointmentSummary {
    AppointmentSummary {
        id: appointment.id,
        doctor_id: appointment.doctor_id,
        patient_id: appointment.patient_id,
        doctor_name: doctor.map(|d| d.full_name.clone()).unwrap_or_default(),
        specialty: doctor.map(|d| d.specialty.clone()).unwrap_or_default(),
        date: appointment.scheduled_at.format("%Y-%m-%d").to_string(),
        time: SlotCalendar::format_slot(appointment.scheduled_at.time()),
        status: appointment.status,
    }
}
