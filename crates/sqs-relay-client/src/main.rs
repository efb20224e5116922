//! # SQS Relay Client
//!
//! Binary entry point for the polling client. Runs until Ctrl+C, or exits
//! with a non-zero code once the error budget is spent.

use clap::Parser;
use sqs_relay_client::{run_client, Cli, ClientConfig, LoggingConfig};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let loaded = ClientConfig::load(&cli);

    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load client configuration; aborting");
            std::process::exit(e.exit_code());
        }
    };

    info!(
        server = %config.server_address,
        polling_interval_seconds = config.polling.polling_interval_seconds,
        visibility_timeout = config.polling.visibility_timeout,
        wait_time = config.polling.wait_time,
        max_messages = config.polling.max_messages,
        error_limit = config.polling.error_limit,
        "Starting SQS relay client"
    );

    if let Err(e) = run_client(&config, shutdown_signal()).await {
        error!(error = %e, "SQS relay client stopped with an error");
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("sqs_relay_client={}", logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT (Ctrl+C), stopping"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
