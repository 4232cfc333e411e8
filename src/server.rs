//! MCP server initialization for the stdio transport.
//!
//! [`serve_stdio`] wires the database, notification dispatcher, scheduler,
//! and MCP tool handler into a running server, and tears them down in order
//! on shutdown: transport first, then the scheduler (waiting for its
//! in-flight check-due pass), then the database.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use rmcp::ServiceExt;
use tokio::sync::watch;

use crate::config::MosaicConfig;
use crate::db;
use crate::notify::NotificationDispatcher;
use crate::scheduler::Scheduler;
use crate::tools::MosaicTools;

/// Start the Mosaic MCP server over stdio transport.
pub async fn serve_stdio(config: MosaicConfig) -> Result<()> {
    tracing::info!("starting Mosaic MCP server on stdio");

    let db_path = config.resolved_db_path()?;
    let conn = db::open_database(&db_path)?;
    let db = Arc::new(Mutex::new(conn));

    let dispatcher = Arc::new(NotificationDispatcher::from_config(&config.notifications));
    if config.notifications.bridge_url.is_none() {
        tracing::warn!("no notification bridge configured; reminders will not notify");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handle = if config.scheduler.enabled {
        let scheduler = Scheduler::new(
            Arc::clone(&db),
            Arc::clone(&dispatcher),
            Duration::from_secs(config.scheduler.tick_seconds.max(1)),
        );
        Some(tokio::spawn(scheduler.run(shutdown_rx)))
    } else {
        tracing::info!("scheduler disabled by configuration");
        None
    };

    let config = Arc::new(config);
    let tools = MosaicTools::new(db, dispatcher, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;

    // Stop accepting work, then let the scheduler finish its current pass.
    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "scheduler task join failed");
        }
    }

    tracing::info!("MCP server shut down");
    Ok(())
}
