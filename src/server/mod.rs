//! HTTP API for the enrichment pipeline.
//!
//! Thin JSON layer over the pipeline core; all validation happens in the
//! guard and executor, handlers only translate errors to status codes.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::context::PipelineContext;

/// Shared state for the API server.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<PipelineContext>,
}

/// Start the API server.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let ctx = PipelineContext::open(settings)?;
    let app = create_router(AppState { ctx: Arc::new(ctx) });

    let addr: SocketAddr = settings.server.bind.parse()?;
    tracing::info!("Starting API server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
