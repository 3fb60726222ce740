//! Upload form and summarise handlers.

use askama::Template;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::warn;

use super::super::template_structs::{
    chain_options, mode_options, IndexTemplate, ResultTemplate, APP_TITLE,
};
use super::super::AppState;
use super::helpers::{summarise_upload, RequestError, UploadForm};
use crate::summarise::{ChainType, SummaryMode, SummaryOutcome};

/// Upload form with the configured defaults preselected.
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    render_form(
        state.settings.default_mode,
        state.settings.default_chain,
        None,
    )
}

fn render_form(mode: SummaryMode, chain: ChainType, error: Option<String>) -> Html<String> {
    let template = IndexTemplate {
        title: APP_TITLE,
        modes: mode_options(mode),
        chains: chain_options(chain),
        error,
    };
    Html(
        template
            .render()
            .unwrap_or_else(|e| format!("Template error: {}", e)),
    )
}

/// Summarise an upload from the HTML form and render the result page.
pub async fn summarise_form(State(state): State<AppState>, multipart: Multipart) -> Response {
    let defaults = (state.settings.default_mode, state.settings.default_chain);

    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return form_error(defaults.0, defaults.1, e),
    };
    // Keep the user's choices selected when re-rendering the form
    let mode = form.mode_or(defaults.0).unwrap_or(defaults.0);
    let chain = form.chain_or(defaults.1).unwrap_or(defaults.1);

    let result = match (form.mode_or(defaults.0), form.chain_or(defaults.1)) {
        (Ok(mode), Ok(chain)) => summarise_upload(&state, &form, mode, chain).await,
        (Err(e), _) | (_, Err(e)) => Err(e),
    };

    match result {
        Ok((document, outcome)) => {
            let template = ResultTemplate {
                title: APP_TITLE,
                modes: mode_options(mode),
                chains: chain_options(chain),
                file_name: &document.file_name,
                summary: &outcome.summary,
                mode: outcome.mode,
                chain_type: outcome.chain,
                model: &outcome.model,
                model_calls: outcome.model_calls,
            };
            Html(
                template
                    .render()
                    .unwrap_or_else(|e| format!("Template error: {}", e)),
            )
            .into_response()
        }
        Err(e) => form_error(mode, chain, e),
    }
}

fn form_error(mode: SummaryMode, chain: ChainType, error: RequestError) -> Response {
    warn!("Summarise request failed: {}", error.message());
    let message = format!(
        "An error occurred while generating the summary: {}",
        error.message()
    );
    (error.status(), render_form(mode, chain, Some(message))).into_response()
}

/// JSON body of a successful API summary.
#[derive(Debug, Serialize)]
pub struct ApiSummary<'a> {
    pub file_name: &'a str,
    #[serde(flatten)]
    pub outcome: &'a SummaryOutcome,
}

/// Summarise an upload and return JSON.
pub async fn api_summarise(State(state): State<AppState>, multipart: Multipart) -> Response {
    let result = async {
        let form = UploadForm::read(multipart).await?;
        let mode = form.mode_or(state.settings.default_mode)?;
        let chain = form.chain_or(state.settings.default_chain)?;
        summarise_upload(&state, &form, mode, chain).await
    }
    .await;

    match result {
        Ok((document, outcome)) => Json(ApiSummary {
            file_name: &document.file_name,
            outcome: &outcome,
        })
        .into_response(),
        Err(e) => {
            warn!("API summarise request failed: {}", e.message());
            api_error(e.status(), e.message())
        }
    }
}

/// `{"error": message}` with the given status.
pub fn api_error(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
