use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, SurveyState};

pub fn survey_routes(config: Arc<AppConfig>, state: Arc<SurveyState>) -> Router {
    Router::new()
        .route("/", post(handlers::submit_survey))
        .route("/eligible", get(handlers::get_eligible))
        .route("/prompts", get(handlers::take_prompts))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
