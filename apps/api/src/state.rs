use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use appointment_cell::{
    AppointmentState, AppointmentStore, Clock, InMemoryAppointmentStore, LifecycleEventBus,
    SlotCalendar, SupabaseAppointmentStore,
};
use doctor_cell::handlers::DoctorState;
use doctor_cell::{Doctor, DoctorDirectory, InMemoryDoctorDirectory, SupabaseDoctorDirectory};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use survey_cell::{
    InMemorySurveyStore, SupabaseSurveyStore, SurveyPromptService, SurveyService, SurveyState,
    SurveyStore,
};

/// Per-cell router state sharing one set of stores and one event bus.
pub struct AppServices {
    pub config: Arc<AppConfig>,
    pub events: LifecycleEventBus,
    pub doctors: Arc<DoctorState>,
    pub appointments: Arc<AppointmentState>,
    pub surveys: Arc<SurveyState>,
}

impl AppServices {
    /// `seed_doctors` fills the in-memory directory; Supabase mode reads the
    /// `doctors` table instead and ignores them.
    pub fn build(config: AppConfig, clock: Arc<dyn Clock>, seed_doctors: Vec<Doctor>) -> Self {
        let (directory, appointment_store, survey_store): (
            Arc<dyn DoctorDirectory>,
            Arc<dyn AppointmentStore>,
            Arc<dyn SurveyStore>,
        ) = if config.is_configured() {
            info!("Using Supabase storage at {}", config.supabase_url);
            if !seed_doctors.is_empty() {
                warn!("Ignoring {} seed doctors, the directory is read from Supabase", seed_doctors.len());
            }
            let supabase = Arc::new(SupabaseClient::new(&config));
            (
                Arc::new(SupabaseDoctorDirectory::new(supabase.clone())),
                Arc::new(SupabaseAppointmentStore::new(supabase.clone())),
                Arc::new(SupabaseSurveyStore::new(supabase)),
            )
        } else {
            if seed_doctors.is_empty() {
                warn!("Using in-memory storage with an empty doctor directory; set SEED_DOCTORS_FILE to make doctors bookable");
            } else {
                info!("Using in-memory storage with {} seeded doctors", seed_doctors.len());
            }
            (
                Arc::new(InMemoryDoctorDirectory::with_doctors(seed_doctors)),
                Arc::new(InMemoryAppointmentStore::new()),
                Arc::new(InMemorySurveyStore::new()),
            )
        };

        let events = LifecycleEventBus::default();

        let appointments = AppointmentState::new(
            SlotCalendar::new(config.scheduling.clone()),
            appointment_store.clone(),
            directory.clone(),
            events.clone(),
            clock.clone(),
        );

        let prompts = SurveyPromptService::new();
        let surveys = SurveyState {
            service: SurveyService::new(survey_store, appointment_store, clock)
                .with_prompts(prompts.clone()),
            prompts,
        };

        Self {
            config: Arc::new(config),
            events,
            doctors: Arc::new(DoctorState { directory }),
            appointments: Arc::new(appointments),
            surveys: Arc::new(surveys),
        }
    }
}

/// Doctors listed in the JSON array at `SEED_DOCTORS_FILE`, if set.
pub fn seed_doctors_from_env() -> anyhow::Result<Vec<Doctor>> {
    match std::env::var("SEED_DOCTORS_FILE") {
        Ok(path) => load_seed_doctors(Path::new(&path)),
        Err(_) => Ok(Vec::new()),
    }
}

pub fn load_seed_doctors(path: &Path) -> anyhow::Result<Vec<Doctor>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed doctors from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid seed doctors in {}", path.display()))
}
