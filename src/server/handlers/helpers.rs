//! Multipart upload parsing and error mapping shared by the summarise handlers.

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use tracing::warn;

use super::super::AppState;
use crate::loader::LoadedDocument;
use crate::summarise::{ChainType, SummariseError, SummaryMode, SummaryOutcome};

/// Fields of the upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub mode: Option<String>,
    pub chain_type: Option<String>,
    pub file: Option<(String, Bytes)>,
}

impl UploadForm {
    /// Read every field of a multipart body; unknown fields are ignored.
    pub async fn read(mut multipart: Multipart) -> Result<Self, RequestError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "mode" => form.mode = non_empty(field.text().await?),
                "chain_type" => form.chain_type = non_empty(field.text().await?),
                "file" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let data = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen
                    if !file_name.is_empty() || !data.is_empty() {
                        form.file = Some((file_name, data));
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Requested mode, or `default` when the field was absent.
    pub fn mode_or(&self, default: SummaryMode) -> Result<SummaryMode, RequestError> {
        match &self.mode {
            Some(raw) => Ok(raw.parse::<SummaryMode>().map_err(SummariseError::from)?),
            None => Ok(default),
        }
    }

    /// Requested strategy, or `default` when the field was absent.
    pub fn chain_or(&self, default: ChainType) -> Result<ChainType, RequestError> {
        match &self.chain_type {
            Some(raw) => Ok(raw.parse::<ChainType>().map_err(SummariseError::from)?),
            None => Ok(default),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Why a summarise request failed.
#[derive(Debug)]
pub enum RequestError {
    Multipart(MultipartError),
    MissingFile,
    Summarise(SummariseError),
    Internal(String),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Multipart(e) => e.status(),
            Self::MissingFile => StatusCode::BAD_REQUEST,
            Self::Summarise(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Summarise(e) if e.is_upstream_error() => StatusCode::BAD_GATEWAY,
            Self::Summarise(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Multipart(e) => format!("Invalid upload: {}", e.body_text()),
            Self::MissingFile => "Please upload a PDF or text file".to_string(),
            Self::Summarise(e) => e.to_string(),
            Self::Internal(msg) => msg.clone(),
        }
    }
}

impl From<MultipartError> for RequestError {
    fn from(e: MultipartError) -> Self {
        Self::Multipart(e)
    }
}

impl From<SummariseError> for RequestError {
    fn from(e: SummariseError) -> Self {
        Self::Summarise(e)
    }
}

/// Load, persist and summarise an uploaded file.
pub async fn summarise_upload(
    state: &AppState,
    form: &UploadForm,
    mode: SummaryMode,
    chain: ChainType,
) -> Result<(LoadedDocument, SummaryOutcome), RequestError> {
    let (file_name, bytes) = form.file.clone().ok_or(RequestError::MissingFile)?;

    let loader = state.loader.clone();
    let document = tokio::task::spawn_blocking(move || {
        let document = loader.load(&bytes, &file_name)?;
        if let Err(e) = loader.persist(&bytes, document.kind) {
            warn!("Failed to save upload {}: {}", document.file_name, e);
        }
        Ok::<_, SummariseError>(document)
    })
    .await
    .map_err(|e| RequestError::Internal(format!("Document loading task failed: {}", e)))??;

    let outcome = state
        .summariser
        .summarise_detailed(&document.pages, mode, chain)
        .await?;

    Ok((document, outcome))
}
