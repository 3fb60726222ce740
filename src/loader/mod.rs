//! Document loading: uploaded bytes to plain text.
//!
//! Two formats are supported, chosen by file extension:
//! - `.txt`: UTF-8 text, read as a single document
//! - `.pdf`: text layer extracted page by page
//!
//! Uploads can optionally be persisted to a directory under a
//! content-addressed name.

mod pdf;

use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

/// Separator placed between pages when a document is flattened.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Errors that can occur while loading a document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File is not valid UTF-8 text: {0}")]
    InvalidEncoding(String),

    #[error("File has a .pdf extension but is not a PDF")]
    NotAPdf,

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("No extractable text found in {0}")]
    NoText(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    /// Determine the kind from a file name's extension (text after the last dot).
    pub fn from_file_name(file_name: &str) -> Result<Self, LoadError> {
        let ext = extension_of(file_name);
        match ext.as_str() {
            "txt" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            _ => Err(LoadError::UnsupportedFileType(ext)),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Text => "text/plain",
        }
    }
}

/// Lower-cased text after the last `.`; the whole name when there is no dot.
pub fn extension_of(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    base.rsplit('.').next().unwrap_or(base).to_lowercase()
}

/// A unit of text handed to the summariser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub content: String,
    /// 1-based page number for PDF pages.
    pub page: Option<u32>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            page: None,
        }
    }

    pub fn page(content: impl Into<String>, page: u32) -> Self {
        Self {
            content: content.into(),
            page: Some(page),
        }
    }

    /// Whether the document has no non-whitespace content.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Result of loading one file.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub file_name: String,
    pub kind: FileKind,
    pub pages: Vec<Document>,
}

impl LoadedDocument {
    /// All page contents joined with a blank line.
    pub fn content(&self) -> String {
        self.pages
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|d| d.content.chars().count()).sum()
    }
}

/// Loads uploaded documents and optionally keeps a copy on disk.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    upload_dir: Option<PathBuf>,
    upload_prefix: String,
}

impl DocumentLoader {
    /// Loader that does not persist uploads.
    pub fn new() -> Self {
        Self {
            upload_dir: None,
            upload_prefix: "upload".to_string(),
        }
    }

    /// Persist every upload into `dir` as `{prefix}-{hash}.{ext}`.
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>, prefix: &str) -> Self {
        self.upload_dir = Some(dir.into());
        self.upload_prefix = prefix.to_string();
        self
    }

    /// Extract text from `bytes`, dispatching on the file name's extension.
    pub fn load(&self, bytes: &[u8], file_name: &str) -> Result<LoadedDocument, LoadError> {
        let kind = FileKind::from_file_name(file_name)?;
        debug!("Loading {} ({:?}, {} bytes)", file_name, kind, bytes.len());

        let pages = match kind {
            FileKind::Text => vec![Document::new(decode_text(bytes)?)],
            FileKind::Pdf => {
                if !is_pdf(bytes) {
                    return Err(LoadError::NotAPdf);
                }
                pdf::extract_pages(bytes)?
            }
        };

        if pages.iter().all(Document::is_blank) {
            return Err(LoadError::NoText(file_name.to_string()));
        }

        Ok(LoadedDocument {
            file_name: file_name.to_string(),
            kind,
            pages,
        })
    }

    /// Read a file from disk and load it.
    pub fn load_path(&self, path: &Path) -> Result<LoadedDocument, LoadError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.load(&bytes, &file_name)
    }

    /// Write the upload to the configured directory, returning its path.
    ///
    /// Returns `Ok(None)` when no upload directory is configured.
    pub fn persist(&self, bytes: &[u8], kind: FileKind) -> Result<Option<PathBuf>, LoadError> {
        let Some(dir) = &self.upload_dir else {
            return Ok(None);
        };

        let hash = hex::encode(Sha256::digest(bytes));
        let path = dir.join(format!(
            "{}-{}.{}",
            self.upload_prefix,
            &hash[..8],
            kind.extension()
        ));

        std::fs::create_dir_all(dir)?;
        if !path.exists() {
            std::fs::write(&path, bytes)?;
        }
        info!("Saved upload to {}", path.display());
        Ok(Some(path))
    }
}

/// Decode UTF-8 text, dropping a leading byte-order mark.
fn decode_text(bytes: &[u8]) -> Result<String, LoadError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| LoadError::InvalidEncoding(e.to_string()))
}

/// Check the PDF magic via content sniffing.
fn is_pdf(bytes: &[u8]) -> bool {
    infer::get(bytes).is_some_and(|t| t.mime_type() == "application/pdf")
}
