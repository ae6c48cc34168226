mod config;
mod domain;
mod error;
mod middleware;
mod routes;
mod schemas;
mod services;
mod state;
mod store;

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::Router;
use config::AppConfig;
use middleware::cors::build_cors_layer;
use middleware::request_id::propagate_request_id;
use state::AppState;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::from_env();
    let state = AppState::build(config)?;

    if let Err(error) = state.store.ensure_schema().await {
        tracing::warn!(error = %error, "Schema setup failed at startup, continuing lazily");
    }

    services::events::spawn_logging_subscriber(&state.events);

    if state.config.scheduler_enabled {
        tokio::spawn(services::scheduler::run_background_scheduler(state.clone()));
    } else {
        tracing::info!("Background scheduler disabled by configuration");
    }

    if state.config.internal_api_key.is_none() {
        tracing::warn!("INTERNAL_API_KEY is not set — internal cron endpoints are disabled");
    }

    // Rate limiting: burst bucket refilling per second, keyed by peer IP.
    let governor_config = GovernorConfigBuilder::default()
        .per_second(state.config.rate_limit_per_second)
        .burst_size(state.config.rate_limit_burst_size)
        .finish()
        .ok_or("invalid governor config")?;

    let app = Router::new()
        .nest(&state.config.api_prefix, routes::v1_router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024)) // 2 MB
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(axum::middleware::from_fn(propagate_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&state.config))
        .layer(GovernorLayer::new(governor_config))
        .with_state(state.clone());

    let socket_addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(socket_addr).await?;

    tracing::info!(
        app_name = %state.config.app_name,
        environment = %state.config.environment,
        api_prefix = %state.config.api_prefix,
        file_store = state.store.is_file_backed(),
        "Backend listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    tracing::info!("Shutdown signal received, finishing in-flight requests");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
