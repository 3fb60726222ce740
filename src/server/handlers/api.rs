//! Informational API endpoints.

use axum::{extract::State, response::IntoResponse, Json};

use super::super::AppState;
use crate::summarise::{ChainType, SummaryMode};

/// Health check with the configured model name.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.summariser.model_name(),
    }))
}

/// Available modes and strategies, plus the configured defaults.
pub async fn api_modes(State(state): State<AppState>) -> impl IntoResponse {
    let modes: Vec<_> = SummaryMode::ALL
        .iter()
        .map(|m| serde_json::json!({ "name": m.as_str(), "description": m.description() }))
        .collect();
    let chain_types: Vec<_> = ChainType::ALL
        .iter()
        .map(|c| serde_json::json!({ "name": c.as_str(), "description": c.description() }))
        .collect();

    Json(serde_json::json!({
        "modes": modes,
        "chain_types": chain_types,
        "defaults": {
            "mode": state.settings.default_mode,
            "chain_type": state.settings.default_chain,
        },
    }))
}
