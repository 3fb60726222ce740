//! PDF text-layer extraction.
//!
//! `lopdf` gives per-page text; when it fails or finds nothing, `pdf-extract`
//! is tried over the whole file and its output becomes a single document.

use tracing::{debug, warn};

use super::{Document, LoadError};

/// Extract one document per page, falling back to whole-file extraction.
pub(super) fn extract_pages(bytes: &[u8]) -> Result<Vec<Document>, LoadError> {
    with_fallback(extract_with_lopdf(bytes), || extract_with_pdf_extract(bytes))
}

/// Keep per-page output when it has any text, otherwise run `fallback`.
fn with_fallback<F>(
    primary: Result<Vec<Document>, LoadError>,
    fallback: F,
) -> Result<Vec<Document>, LoadError>
where
    F: FnOnce() -> Result<Vec<Document>, LoadError>,
{
    match primary {
        Ok(pages) if pages.iter().any(|p| !p.is_blank()) => {
            debug!("lopdf extracted {} pages", pages.len());
            Ok(pages)
        }
        Ok(_) => {
            debug!("lopdf found no text, trying pdf-extract");
            fallback()
        }
        Err(e) => {
            warn!("lopdf failed ({}), trying pdf-extract", e);
            fallback().map_err(|fallback_err| {
                LoadError::Pdf(format!("{}; fallback: {}", e, fallback_err))
            })
        }
    }
}

fn extract_with_lopdf(bytes: &[u8]) -> Result<Vec<Document>, LoadError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| LoadError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    for (page_num, _page_id) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => pages.push(Document::page(normalize(&text), page_num)),
            Err(e) => {
                // One unreadable page should not sink the document
                warn!("Failed to extract text from page {}: {}", page_num, e);
                pages.push(Document::page(String::new(), page_num));
            }
        }
    }
    Ok(pages)
}

fn extract_with_pdf_extract(bytes: &[u8]) -> Result<Vec<Document>, LoadError> {
    // pdf-extract panics on some malformed inputs
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| LoadError::Pdf("pdf-extract panicked on malformed input".to_string()))?;
    let text = result.map_err(|e| LoadError::Pdf(e.to_string()))?;
    Ok(vec![Document::new(normalize(&text))])
}

/// Trim trailing whitespace on each line and collapse runs of blank lines.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}
