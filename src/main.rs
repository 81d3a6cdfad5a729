// sevlog: HTTP server writing per-severity request logs
// Wires together config, diagnostics, the request logger and the server

use anyhow::{Context, Result};
use sevlog::{config, logger, server};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::AppConfig::load().context("Failed to load configuration")?;

    logger::init(&config).context("Failed to initialize logger")?;

    tracing::info!(
        server_bind = %format!("{}:{}", config.server_bind_address, config.server_port),
        environment = %config.environment,
        log_dir = %config.log_dir.display(),
        context_fields = ?config.context_fields,
        log_level = ?config.log_level,
        log_format = ?config.log_format,
        "sevlog starting"
    );

    // A logger that cannot open all of its sinks aborts startup.
    let request_logger = logger::configure(config.logger_config(), config.context_fields.clone())
        .build()
        .context("Failed to open severity log files")?;

    let server = server::LogServer::new(config, Arc::new(request_logger));

    tracing::info!("Initialization complete, starting server");

    server.run().await.context("Server error")?;

    Ok(())
}
