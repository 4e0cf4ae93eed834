use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};

use crate::models::{Doctor, DoctorError};

const DOCTOR_COLUMNS: &str = "id,full_name,specialty,contact,work_schedule";

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    /// All doctors, ordered by display name.
    async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError>;

    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError>;
}

#[derive(Default)]
pub struct InMemoryDoctorDirectory {
    doctors: RwLock<HashMap<Uuid, Doctor>>,
}

impl InMemoryDoctorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doctors(doctors: impl IntoIterator<Item = Doctor>) -> Self {
        Self {
            doctors: RwLock::new(doctors.into_iter().map(|d| (d.id, d)).collect()),
        }
    }

    pub async fn insert(&self, doctor: Doctor) {
        self.doctors.write().await.insert(doctor.id, doctor);
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        let mut doctors: Vec<Doctor> = self.doctors.read().await.values().cloned().collect();
        doctors.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        Ok(doctors)
    }

    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.doctors
            .read()
            .await
            .get(&doctor_id)
            .cloned()
            .ok_or(DoctorError::NotFound(doctor_id))
    }
}

pub struct SupabaseDoctorDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

fn db_error(e: DatabaseError) -> DoctorError {
    DoctorError::DatabaseError(e.to_string())
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors from directory");

        let path = format!("/rest/v1/doctors?select={}&order=full_name.asc", DOCTOR_COLUMNS);
        self.supabase
            .request::<Vec<Doctor>>(Method::GET, &path, None)
            .await
            .map_err(db_error)
    }

    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor {}", doctor_id);

        let path = format!("/rest/v1/doctors?select={}&id=eq.{}", DOCTOR_COLUMNS, doctor_id);
        let result: Vec<Doctor> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(db_error)?;

        result.into_iter().next().ok_or(DoctorError::NotFound(doctor_id))
    }
}
