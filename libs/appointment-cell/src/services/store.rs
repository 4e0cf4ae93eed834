// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Method;
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};

use crate::models::{Appointment, AppointmentStatus};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Another active appointment already holds the (doctor, instant) pair.
    #[error("slot already taken")]
    SlotTaken,

    #[error("appointment not found")]
    NotFound,

    /// Compare-and-set lost: the row is no longer in the expected status.
    #[error("appointment is {0}")]
    StatusMismatch(AppointmentStatus),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// The shared appointment table.
///
/// Implementations are the serialization point for bookings: `insert` must
/// atomically reject a second active row for the same doctor and instant,
/// and `transition` must only apply when the row still has status `from`.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError>;

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError>;

    async fn transition(
        &self,
        appointment_id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        at: NaiveDateTime,
    ) -> Result<Appointment, StoreError>;

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    /// Active appointments of a doctor on one calendar day.
    async fn list_for_doctor_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError>;
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

#[derive(Default)]
struct Tables {
    appointments: HashMap<Uuid, Appointment>,
    /// Unique index over active rows: (doctor, instant) -> appointment.
    active_slots: HashMap<(Uuid, NaiveDateTime), Uuid>,
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    tables: RwLock<Tables>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then(a.id.cmp(&b.id)));
    appointments
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (appointment.doctor_id, appointment.scheduled_at);

        if appointment.status.occupies_slot() {
            if tables.active_slots.contains_key(&key) {
                return Err(StoreError::SlotTaken);
            }
            tables.active_slots.insert(key, appointment.id);
        }

        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tables.read().await.appointments.get(&appointment_id).cloned())
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        at: NaiveDateTime,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.write().await;

        let appointment = tables
            .appointments
            .get_mut(&appointment_id)
            .ok_or(StoreError::NotFound)?;

        if appointment.status != from {
            return Err(StoreError::StatusMismatch(appointment.status));
        }

        appointment.status = to;
        appointment.updated_at = at;
        let updated = appointment.clone();

        if !to.occupies_slot() {
            let key = (updated.doctor_id, updated.scheduled_at);
            if tables.active_slots.get(&key) == Some(&updated.id) {
                tables.active_slots.remove(&key);
            }
        }

        Ok(updated)
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(sorted(
            tables
                .appointments
                .values()
                .filter(|a| a.patient_id == patient_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(sorted(
            tables
                .appointments
                .values()
                .filter(|a| a.doctor_id == doctor_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_for_doctor_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(sorted(
            tables
                .appointments
                .values()
                .filter(|a| {
                    a.doctor_id == doctor_id
                        && a.scheduled_at.date() == date
                        && a.status.occupies_slot()
                })
                .cloned()
                .collect(),
        ))
    }
}

// ==============================================================================
// SUPABASE (POSTGREST) STORE
// ==============================================================================

/// PostgREST-backed store. Exclusivity relies on the partial unique index
/// `appointments_active_slot_idx` from `sql/schema.sql`; PostgREST reports a
/// violation as HTTP 409.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn select(&self, filters: &str) -> Result<Vec<Appointment>, StoreError> {
        let path = format!("/rest/v1/appointments?{}&order=scheduled_at.asc", filters);
        self.supabase
            .request::<Vec<Appointment>>(Method::GET, &path, None)
            .await
            .map_err(backend_error)
    }
}

fn backend_error(e: DatabaseError) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        debug!(
            "Inserting appointment {} for doctor {} at {}",
            appointment.id, appointment.doctor_id, appointment.scheduled_at
        );

        let body = serde_json::to_value(&appointment)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let result: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(detail) => {
                    warn!("Active slot index rejected appointment {}: {}", appointment.id, detail);
                    StoreError::SlotTaken
                }
                other => backend_error(other),
            })?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("insert returned no row".to_string()))
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(backend_error)?;

        Ok(result.into_iter().next())
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        at: NaiveDateTime,
    ) -> Result<Appointment, StoreError> {
        // The status filter makes the PATCH a compare-and-set.
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment_id, from
        );
        let body = json!({
            "status": to,
            "updated_at": timestamp(at),
        });

        let result: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(backend_error)?;

        if let Some(updated) = result.into_iter().next() {
            return Ok(updated);
        }

        match self.get(appointment_id).await? {
            Some(current) => Err(StoreError::StatusMismatch(current.status)),
            None => Err(StoreError::NotFound),
        }
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        self.select(&format!("patient_id=eq.{}", patient_id)).await
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        self.select(&format!("doctor_id=eq.{}", doctor_id)).await
    }

    async fn list_for_doctor_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let start = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        let end = start + chrono::Duration::days(1);
        self.select(&format!(
            "doctor_id=eq.{}&status=neq.{}&scheduled_at=gte.{}&scheduled_at=lt.{}",
            doctor_id,
            AppointmentStatus::Canceled,
            timestamp(start),
            timestamp(end),
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    fn appointment(doctor_id: Uuid, scheduled_at: NaiveDateTime) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id: Uuid::new_v4(),
            scheduled_at,
            status: AppointmentStatus::Scheduled,
            created_at: scheduled_at,
            updated_at: scheduled_at,
        }
    }

    #[test]
    fn test_in_memory_unique_active_slot() {
        let store = InMemoryAppointmentStore::new();
        let doctor = Uuid::new_v4();
        let at = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(9, 0, 0).unwrap();

        let first = block_on(store.insert(appointment(doctor, at))).unwrap();
        assert_eq!(block_on(store.insert(appointment(doctor, at))), Err(StoreError::SlotTaken));

        block_on(store.transition(first.id, AppointmentStatus::Scheduled, AppointmentStatus::Canceled, at)).unwrap();
        assert!(block_on(store.insert(appointment(doctor, at))).is_ok());
    }

    #[test]
    fn test_in_memory_transition_compares_status() {
        let store = InMemoryAppointmentStore::new();
        let at = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let row = block_on(store.insert(appointment(Uuid::new_v4(), at))).unwrap();

        block_on(store.transition(row.id, AppointmentStatus::Scheduled, AppointmentStatus::Completed, at)).unwrap();
        let stale = block_on(store.transition(row.id, AppointmentStatus::Scheduled, AppointmentStatus::Canceled, at));

        assert_eq!(stale, Err(StoreError::StatusMismatch(AppointmentStatus::Completed)));
    }
}
