// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::{DoctorDirectory, DoctorError};
use shared_models::auth::Role;

use crate::models::{
    Actor, Appointment, AppointmentError, AppointmentStatus, AvailabilityResponse,
    BookAppointmentRequest,
};
use crate::services::clock::Clock;
use crate::services::events::{AppointmentCreated, LifecycleEvent, LifecycleEventBus};
use crate::services::slots::SlotCalendar;
use crate::services::store::{AppointmentStore, StoreError};

impl From<StoreError> for AppointmentError {
    fn from(e: StoreError) -> Self {
        AppointmentError::DatabaseError(e.to_string())
    }
}

pub(crate) fn doctor_error(e: DoctorError) -> AppointmentError {
    match e {
        DoctorError::NotFound(id) => AppointmentError::DoctorNotFound(id),
        DoctorError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
    }
}

// ==============================================================================
// COMMIT PATH
// ==============================================================================

/// Owns the only write path that creates appointments.
///
/// Exclusivity is delegated to the store's insert; there is no read-then-write
/// check here, so concurrent bookers of one slot are linearized by the store.
#[derive(Clone)]
pub struct BookingConflictGuard {
    store: Arc<dyn AppointmentStore>,
    events: LifecycleEventBus,
}

impl BookingConflictGuard {
    pub fn new(store: Arc<dyn AppointmentStore>, events: LifecycleEventBus) -> Self {
        Self { store, events }
    }

    #[instrument(skip(self))]
    pub async fn book(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        scheduled_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<Appointment, AppointmentError> {
        let scheduled_at = SlotCalendar::candidate_instant(scheduled_at.date(), scheduled_at.time());

        let candidate = Appointment {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            scheduled_at,
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };

        let appointment = self.store.insert(candidate).await.map_err(|e| match e {
            StoreError::SlotTaken => {
                warn!("Booking conflict for doctor {} at {}", doctor_id, scheduled_at);
                AppointmentError::Conflict {
                    doctor_id,
                    scheduled_at,
                }
            }
            other => other.into(),
        })?;

        info!(
            "Appointment {} booked with doctor {} at {}",
            appointment.id, appointment.doctor_id, appointment.scheduled_at
        );

        self.events.publish(LifecycleEvent::Created(AppointmentCreated {
            appointment_id: appointment.id,
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            scheduled_at: appointment.scheduled_at,
        }));

        Ok(appointment)
    }
}

// ==============================================================================
// BOOKING REQUESTS
// ==============================================================================

pub struct AppointmentBookingService {
    calendar: SlotCalendar,
    guard: BookingConflictGuard,
    store: Arc<dyn AppointmentStore>,
    doctors: Arc<dyn DoctorDirectory>,
    clock: Arc<dyn Clock>,
}

impl AppointmentBookingService {
    pub fn new(
        calendar: SlotCalendar,
        store: Arc<dyn AppointmentStore>,
        doctors: Arc<dyn DoctorDirectory>,
        events: LifecycleEventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            calendar,
            guard: BookingConflictGuard::new(store.clone(), events),
            store,
            doctors,
            clock,
        }
    }

    pub fn calendar(&self) -> &SlotCalendar {
        &self.calendar
    }

    /// Validate a booking form and commit it.
    #[instrument(skip(self, request))]
    pub async fn book_appointment(
        &self,
        actor: &Actor,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let doctor_id = request
            .doctor_id
            .ok_or_else(|| AppointmentError::Validation("doctor is required".to_string()))?;
        let date = request
            .date
            .ok_or_else(|| AppointmentError::Validation("date is required".to_string()))?;
        let raw_time = request
            .time
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppointmentError::Validation("time is required".to_string()))?;
        let time = SlotCalendar::parse_slot(raw_time).ok_or_else(|| {
            AppointmentError::Validation(format!("time must be HH:MM, got {:?}", raw_time))
        })?;

        let patient_id = Self::resolve_patient(actor, request.patient_id)?;

        self.doctors.get_doctor(doctor_id).await.map_err(doctor_error)?;

        let now = self.clock.now();
        if !self.calendar.is_bookable(date, time, now) {
            debug!("Rejected {} {} for doctor {}: not a bookable slot", date, raw_time, doctor_id);
            return Err(AppointmentError::Validation(format!(
                "{} {} is not a bookable slot",
                date,
                SlotCalendar::format_slot(time)
            )));
        }

        self.guard
            .book(doctor_id, patient_id, SlotCalendar::candidate_instant(date, time), now)
            .await
    }

    fn resolve_patient(actor: &Actor, requested: Option<Uuid>) -> Result<Uuid, AppointmentError> {
        match actor.role {
            Role::Patient => match requested {
                Some(other) if other != actor.user_id => Err(AppointmentError::Unauthorized(
                    "patients can only book for themselves".to_string(),
                )),
                _ => Ok(actor.user_id),
            },
            Role::Doctor | Role::Admin => requested.ok_or_else(|| {
                AppointmentError::Validation("patient is required when booking on behalf".to_string())
            }),
        }
    }

    /// Advisory slot list for the date picker.
    pub async fn availability(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<AvailabilityResponse, AppointmentError> {
        self.doctors.get_doctor(doctor_id).await.map_err(doctor_error)?;

        let existing = self.store.list_for_doctor_on(doctor_id, date).await?;
        let now = self.clock.now();

        let slots = self
            .calendar
            .filter_available(date, now, &existing)
            .into_iter()
            .map(SlotCalendar::format_slot)
            .collect();

        Ok(AvailabilityResponse {
            doctor_id,
            date,
            slots,
            date_disabled: self.calendar.is_date_disabled(date, now),
            existing_bookings: existing.len(),
        })
    }
}
