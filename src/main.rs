//! Notes graph server.
//!
//! Serves the link graph of a directory of Markdown notes:
//!
//! - `/`: HTML page with a settled layout rendered as SVG
//! - `/api/get-notes-graph`: the graph as JSON
//! - `/api/layout`: a headless layout run as JSON

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use notes_graph::{router, AppState, Config};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let addr = config.addr.clone();
    let notes_dir = config.notes_dir.clone();
    let app = router(Arc::new(AppState::new(config)));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));

    info!(%addr, notes_dir = %notes_dir.display(), "notes graph server running");

    axum::serve(listener, app).await.expect("Server error");
}
