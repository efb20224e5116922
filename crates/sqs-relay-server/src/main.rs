//! # SQS Relay Server
//!
//! Binary entry point for the relay server.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Resolves the configured queue (fatal on failure)
//! - Serves gRPC until SIGINT or SIGTERM

use sqs_gateway::QueueGateway;
use sqs_relay_server::config::CONFIG_FILE_ENV;
use sqs_relay_server::{start_server, LoggingConfig, ServerConfig, ServerError};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let explicit_path = std::env::var(CONFIG_FILE_ENV).ok();
    let loaded = ServerConfig::load(explicit_path.as_deref());

    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting SQS relay server");
    if let Some(path) = explicit_path.as_deref().filter(|p| !p.is_empty()) {
        info!(path = %path, "Loading configuration from explicit path");
    }

    if let Err(e) = run(loaded).await {
        error!(error = %e, "SQS relay server stopped with an error");
        std::process::exit(e.exit_code());
    }
}

async fn run(loaded: Result<ServerConfig, ServerError>) -> Result<(), ServerError> {
    let config = loaded?;
    config.validate()?;

    info!(
        provider = %config.gateway.provider,
        queue = %config.gateway.queue_name,
        region = %config.gateway.region,
        "Connecting queue gateway"
    );
    let gateway = QueueGateway::connect(&config.gateway).await?;

    start_server(&config, gateway, shutdown_signal()).await
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sqs_relay_server={level},sqs_gateway={level}",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Resolves on SIGINT, or SIGTERM on unix
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
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
