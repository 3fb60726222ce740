//! Web server for summarising uploaded documents.
//!
//! Serves an HTML upload form plus a small JSON API:
//! - `GET /` and `POST /summarise`: browser form and result page
//! - `POST /api/summarise`: multipart upload, JSON summary
//! - `GET /api/modes`, `GET /health`: discovery and liveness

mod assets;
mod handlers;
mod routes;
mod template_structs;

pub use routes::create_router;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Settings;
use crate::llm::{LlmClient, TextGenerator};
use crate::loader::DocumentLoader;
use crate::summarise::{SummariseError, Summariser};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub summariser: Arc<Summariser>,
    pub loader: Arc<DocumentLoader>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// State backed by the configured hosted model.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        if settings.llm.provider.requires_api_key() && settings.llm.api_key().is_none() {
            warn!(
                "No API key configured for {}; summarise requests will fail",
                settings.llm.provider
            );
        }
        let client = LlmClient::new(settings.llm.clone())?;
        Ok(Self::with_generator(settings, Arc::new(client))?)
    }

    /// State backed by an arbitrary text generator.
    pub fn with_generator(
        settings: Settings,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, SummariseError> {
        let summariser = settings.build_summariser(generator)?;
        Ok(Self {
            summariser: Arc::new(summariser),
            loader: Arc::new(settings.document_loader()),
            settings: Arc::new(settings),
        })
    }
}

/// Start the web server and run until Ctrl-C.
pub async fn serve(settings: Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("Starting server at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            // Without a signal handler the server runs until killed
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
