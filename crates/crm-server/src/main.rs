//! Association CRM server

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crm_api::AppState;
use crm_chatbot::{model_from_config, ChatbotService};
use crm_core::config::{AppConfig, ServerConfig};
use crm_db::{Database, ReadOnlyQueryRunner};

mod bootstrap;
mod health;

use health::ReadinessProbe;

const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("JWT_SECRET is not set; using the built-in development secret");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting association CRM"
    );

    let db = Database::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    if config.database.migrate {
        db.migrate().await.context("failed to apply migrations")?;
    }
    bootstrap::ensure_admin(db.pool(), &config.auth).await?;

    let model = model_from_config(&config.chatbot).context("failed to build the chatbot client")?;
    let runner = ReadOnlyQueryRunner::new(
        db.pool().clone(),
        Duration::from_millis(config.chatbot.statement_timeout_ms),
    );
    let chatbot = Arc::new(ChatbotService::new(
        model,
        Arc::new(runner),
        config.chatbot.max_prompt_rows,
    ));
    if chatbot.is_enabled() {
        info!(model = %config.chatbot.model, "Chatbot enabled");
    } else {
        info!("Chatbot running in demo mode");
    }

    let readiness = Arc::new(ReadinessProbe::new(Some(db.clone()), chatbot.is_enabled()));

    let addr = config.server_addr();
    let app = build_router(
        AppState::new(db.pool().clone(), config.clone(), chatbot),
        readiness,
        &config.server,
    )?;

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing; `LOG_FORMAT=json` switches to JSON lines
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,crm_server=debug,crm_api=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

fn cors_layer(server: &ServerConfig) -> anyhow::Result<CorsLayer> {
    let layer = match server.cors_allowed_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("invalid CORS_ALLOWED_ORIGIN '{}'", origin))?,
            )
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };
    Ok(layer)
}

/// Build the application router
fn build_router(
    state: AppState,
    readiness: Arc<ReadinessProbe>,
    server: &ServerConfig,
) -> anyhow::Result<Router> {
    let health_routes = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(readiness);

    Ok(Router::new()
        .merge(health_routes)
        .merge(crm_api::router().with_state(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(server)?)
                .layer(TimeoutLayer::new(Duration::from_secs(
                    server.request_timeout_seconds,
                ))),
        ))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
