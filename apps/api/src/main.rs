use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;
mod state;

use appointment_cell::{spawn_notification_logger, SystemClock};
use shared_config::AppConfig;

use crate::state::AppServices;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic portal API server");

    let config = AppConfig::from_env();
    let port = config.server_port;
    info!(
        "Slot grid {:02}:00-{:02}:00 every {} min, booking buffer {} min",
        config.scheduling.opening_hour,
        config.scheduling.closing_hour,
        config.scheduling.slot_minutes,
        config.scheduling.booking_buffer_minutes
    );

    let seed_doctors = state::seed_doctors_from_env()?;
    let services = AppServices::build(config, Arc::new(SystemClock), seed_doctors);

    // Lifecycle event listeners
    spawn_notification_logger(&services.events);
    services.surveys.prompts.listen(&services.events);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(&services)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
