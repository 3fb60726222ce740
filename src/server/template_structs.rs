//! Askama template structs for the web interface.
//!
//! Each struct corresponds to an HTML template in the templates/ directory.

use askama::Template;

use crate::summarise::{ChainType, SummaryMode};

/// Page heading and document title.
pub const APP_TITLE: &str = "Document Summarisation App";

/// One entry of a `<select>`.
pub struct SelectOption {
    pub value: &'static str,
    pub description: &'static str,
    pub selected: bool,
}

/// Summary mode options with `selected` preselected.
pub fn mode_options(selected: SummaryMode) -> Vec<SelectOption> {
    SummaryMode::ALL
        .into_iter()
        .map(|mode| SelectOption {
            value: mode.as_str(),
            description: mode.description(),
            selected: mode == selected,
        })
        .collect()
}

/// Strategy options with `selected` preselected.
pub fn chain_options(selected: ChainType) -> Vec<SelectOption> {
    ChainType::ALL
        .into_iter()
        .map(|chain| SelectOption {
            value: chain.as_str(),
            description: chain.description(),
            selected: chain == selected,
        })
        .collect()
}

/// Upload form, optionally with an error from a previous attempt.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub title: &'a str,
    pub modes: Vec<SelectOption>,
    pub chains: Vec<SelectOption>,
    pub error: Option<String>,
}

/// Upload form followed by a finished summary.
#[derive(Template)]
#[template(path = "result.html")]
pub struct ResultTemplate<'a> {
    pub title: &'a str,
    pub modes: Vec<SelectOption>,
    pub chains: Vec<SelectOption>,
    pub file_name: &'a str,
    pub summary: &'a str,
    pub mode: SummaryMode,
    pub chain_type: ChainType,
    pub model: &'a str,
    pub model_calls: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_preselects_options() {
        let html = IndexTemplate {
            title: APP_TITLE,
            modes: mode_options(SummaryMode::Bullet),
            chains: chain_options(ChainType::Refine),
            error: None,
        }
        .render()
        .unwrap();

        assert!(html.contains("<title>Document Summarisation App</title>"));
        assert!(html.contains(r#"<option value="bullet" title="Bullet-point summary" selected>"#));
        assert!(html.contains(r#"<option value="refine""#));
        assert!(html.contains(r#"accept=".pdf,.txt""#));
        assert!(!html.contains(r#"class="error""#));
    }

    #[test]
    fn test_result_escapes_summary() {
        let html = ResultTemplate {
            title: APP_TITLE,
            modes: mode_options(SummaryMode::Prose),
            chains: chain_options(ChainType::Stuff),
            file_name: "report.txt",
            summary: "<script>alert(1)</script>",
            mode: SummaryMode::Prose,
            chain_type: ChainType::Stuff,
            model: "gemini-1.5-flash",
            model_calls: 1,
        }
        .render()
        .unwrap();

        assert!(html.contains("Selected file: report.txt"));
        assert!(html.contains("<h2>Summary</h2>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
