//! HTTP API exposing the most recent collection cycle.
//!
//! The server consumes a stream of cycle reports and keeps the latest one
//! available at `/api/metrics`.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use handlers::AppState;
pub use router::create_app;

use crate::error::{ExecError, Result};
use crate::metrics::CycleReport;
use futures_util::stream::BoxStream;
use tokio_stream::StreamExt;
use tracing::info;

/// Start the web server with the provided configuration and report stream.
pub async fn start_web_server(
    config: WebConfig,
    mut reports: BoxStream<'static, CycleReport>,
) -> Result<()> {
    let state = AppState::new();
    let app = create_app(&config, state.clone());

    let addr = config.socket_addr()?;

    info!("Starting exec_gather web server on http://{}", addr);
    info!("API endpoint: http://{}/api/metrics", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExecError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    let _collection_task = tokio::spawn(async move {
        while let Some(report) = reports.next().await {
            info!(
                "Cycle finished: {} metrics from {} commands in {}ms",
                report.metrics.len(),
                report.commands,
                report.duration_ms
            );
            state.publish(report).await;
        }
    });

    axum::serve(listener, app)
        .await
        .map_err(|e| ExecError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
