use axum::{routing::get, Router};

use appointment_cell::appointment_routes;
use doctor_cell::router::doctor_routes;
use survey_cell::survey_routes;

use crate::state::AppServices;

pub fn create_router(services: &AppServices) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic portal API is running!" }))
        .nest("/doctors", doctor_routes(services.config.clone(), services.doctors.clone()))
        .nest(
            "/appointments",
            appointment_routes(services.config.clone(), services.appointments.clone()),
        )
        .nest("/surveys", survey_routes(services.config.clone(), services.surveys.clone()))
}
