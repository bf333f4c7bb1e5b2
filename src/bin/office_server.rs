//! Site Office REST API Server
//!
//! Serves the command queue, document generation/analysis, learning
//! examples and the Yandex Disk proxy, and runs the command agent in the
//! background.
//!
//! ## Usage
//!
//! ```bash
//! # In-memory store
//! cargo run --bin office_server
//!
//! # PostgreSQL store
//! OFFICE_STORE=postgres DATABASE_URL=postgresql://localhost/site_office \
//!   cargo run --bin office_server --features database
//!
//! curl -X POST http://localhost:8000/api/commands \
//!   -H "Content-Type: application/json" \
//!   -d '{"text": "создай акт приема-передачи для квартиры 45"}'
//!
//! curl http://localhost:8000/api/health
//! ```

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use site_office::api::create_router;
use site_office::{OfficeConfig, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("site_office=info,office_server=info,tower_http=debug")
            }),
        )
        .init();

    let config = OfficeConfig::load().context("Failed to load configuration")?;
    let services = Services::from_config(&config).await?;

    // Background agent
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let agent_handle = if config.agent.enabled {
        Some(Arc::new(services.agent(&config)).spawn(shutdown_rx))
    } else {
        info!("Command agent disabled");
        None
    };

    let app = create_router(services.app_state());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = agent_handle {
        let _ = handle.await;
    }
    info!("Server stopped");
    Ok(())
}
