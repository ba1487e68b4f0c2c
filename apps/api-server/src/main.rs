//! # Quota API Server
//!
//! Actix-web front that gates every request class through the admission
//! control layer before the handlers run.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use background::{Scheduler, SchedulerConfig};
use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting quota API server on {}:{}",
        config.host,
        config.port
    );

    // Build application state (stores, monitor, gate)
    let state = AppState::new(&config).await;

    // Background sweeper keeps the local counter table bounded.
    let scheduler = start_scheduler(&state).await;

    let app_state = state.clone();
    HttpServer::new(move || {
        let state = app_state.clone();
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, &state))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    if let Some(mut scheduler) = scheduler {
        if let Err(error) = scheduler.shutdown().await {
            tracing::warn!(error = %error, "Scheduler shutdown failed");
        }
    }

    Ok(())
}

/// Start the sweep scheduler. Failures are logged, never fatal - the
/// sweeper is advisory cleanup, the limiter stays correct without it.
async fn start_scheduler(state: &AppState) -> Option<Scheduler> {
    let config = SchedulerConfig::from_env();
    if !config.enabled {
        tracing::info!("Scheduler disabled");
        return None;
    }

    let scheduler = match Scheduler::new().await {
        Ok(scheduler) => scheduler,
        Err(error) => {
            tracing::error!(error = %error, "Failed to create scheduler");
            return None;
        }
    };

    let local = state.local.clone();
    let registered = scheduler
        .add_repeated(config.sweep_interval, move || {
            let local = local.clone();
            async move {
                local.sweep().await;
            }
        })
        .await;

    if let Err(error) = registered {
        tracing::error!(error = %error, "Failed to register sweep job");
    }

    if let Err(error) = scheduler.start().await {
        tracing::error!(error = %error, "Failed to start scheduler");
        return None;
    }

    Some(scheduler)
}
