//! Summarisation orchestration.
//!
//! A [`Summariser`] renders documents into the prompt template for a
//! [`SummaryMode`] and drives a [`TextGenerator`] through one of three
//! [`ChainType`] strategies:
//!
//! - `stuff`: all text in a single prompt
//! - `map_reduce`: summarise each chunk, then combine the partial summaries
//! - `refine`: summarise the first chunk, then fold in each later chunk

mod chain;
mod mode;
mod prompts;
mod split;
mod template;

pub use chain::{ChainType, UnknownChainType};
pub use mode::{SummaryMode, UnknownMode};
pub use prompts::{TemplateSet, COMBINE_FILE, REFINE_FILE};
pub use split::TextSplitter;
pub use template::{PromptTemplate, TemplateError};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::llm::{LlmError, TextGenerator};
use crate::loader::{Document, LoadError, PAGE_SEPARATOR};
use crate::utils::{format_duration, preview};

/// Separator between partial summaries handed to the combine step.
const PARTIAL_SEPARATOR: &str = "\n";

/// Errors that can occur while producing a summary.
#[derive(Debug, Error)]
pub enum SummariseError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    UnknownMode(#[from] UnknownMode),

    #[error(transparent)]
    UnknownChainType(#[from] UnknownChainType),

    #[error("The document contains no text to summarise")]
    EmptyInput,

    #[error("The model returned an empty response")]
    EmptyResponse,
}

impl SummariseError {
    /// Whether the error was caused by the request rather than the model or the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Load(_) | Self::UnknownMode(_) | Self::UnknownChainType(_) | Self::EmptyInput
        )
    }

    /// Whether the hosted model failed or misbehaved.
    pub fn is_upstream_error(&self) -> bool {
        matches!(self, Self::Llm(_) | Self::EmptyResponse)
    }
}

/// A finished summary with bookkeeping about how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryOutcome {
    pub summary: String,
    pub mode: SummaryMode,
    #[serde(rename = "chain_type")]
    pub chain: ChainType,
    pub model: String,
    /// Number of prompts sent to the model.
    pub model_calls: usize,
    /// Number of text units the strategy worked over.
    pub chunks: usize,
}

/// Drives a text generator through a chaining strategy.
pub struct Summariser {
    generator: Arc<dyn TextGenerator>,
    templates: TemplateSet,
    splitter: TextSplitter,
    map_concurrency: usize,
}

impl Summariser {
    /// Summariser with built-in templates, default chunking and sequential map calls.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self, SummariseError> {
        Ok(Self {
            generator,
            templates: TemplateSet::builtin()?,
            splitter: TextSplitter::default(),
            map_concurrency: 1,
        })
    }

    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// Maximum number of map prompts in flight at once (at least 1).
    pub fn with_map_concurrency(mut self, concurrency: usize) -> Self {
        self.map_concurrency = concurrency.max(1);
        self
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Summarise `documents`, returning only the summary text.
    pub async fn summarise(
        &self,
        documents: &[Document],
        mode: SummaryMode,
        chain: ChainType,
    ) -> Result<String, SummariseError> {
        Ok(self.summarise_detailed(documents, mode, chain).await?.summary)
    }

    /// Summarise a single piece of text.
    pub async fn summarise_text(
        &self,
        text: &str,
        mode: SummaryMode,
        chain: ChainType,
    ) -> Result<String, SummariseError> {
        self.summarise(&[Document::new(text)], mode, chain).await
    }

    /// Summarise `documents` and report how the summary was produced.
    pub async fn summarise_detailed(
        &self,
        documents: &[Document],
        mode: SummaryMode,
        chain: ChainType,
    ) -> Result<SummaryOutcome, SummariseError> {
        let documents: Vec<Document> = documents
            .iter()
            .filter(|d| !d.is_blank())
            .cloned()
            .collect();
        if documents.is_empty() {
            return Err(SummariseError::EmptyInput);
        }

        let started = Instant::now();
        info!(
            "Summarising {} document(s) with mode={} chain_type={} model={}",
            documents.len(),
            mode,
            chain,
            self.model_name()
        );

        let (summary, model_calls, chunks) = match chain {
            ChainType::Stuff => self.stuff(&documents, mode).await?,
            ChainType::MapReduce => self.map_reduce(&documents, mode).await?,
            ChainType::Refine => self.refine(&documents, mode).await?,
        };

        info!(
            "Summary ready: {} chars from {} model call(s) in {}",
            summary.chars().count(),
            model_calls,
            format_duration(started.elapsed())
        );

        Ok(SummaryOutcome {
            summary,
            mode,
            chain,
            model: self.model_name().to_string(),
            model_calls,
            chunks,
        })
    }

    async fn stuff(
        &self,
        documents: &[Document],
        mode: SummaryMode,
    ) -> Result<(String, usize, usize), SummariseError> {
        let content = documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);
        let prompt = self.templates.for_mode(mode).render_content(&content)?;
        let summary = self.call(&prompt).await?;
        Ok((summary, 1, 1))
    }

    async fn map_reduce(
        &self,
        documents: &[Document],
        mode: SummaryMode,
    ) -> Result<(String, usize, usize), SummariseError> {
        let chunks = self.splitter.split_documents(documents);
        let template = self.templates.for_mode(mode);
        let prompts = chunks
            .iter()
            .map(|chunk| template.render_content(&chunk.content))
            .collect::<Result<Vec<_>, _>>()?;

        let total = prompts.len();
        debug!(
            "map_reduce: {} chunk(s), concurrency {}",
            total, self.map_concurrency
        );

        // Map futures must not borrow `self` or `prompts`: handlers awaiting
        // this need it `Send` for every lifetime. `buffered` keeps input order.
        let generator = Arc::clone(&self.generator);
        let partials: Vec<String> = stream::iter(prompts.into_iter().enumerate())
            .map(move |(i, prompt)| {
                let generator = Arc::clone(&generator);
                async move {
                    debug!("map step {}/{}", i + 1, total);
                    complete(generator.as_ref(), &prompt).await
                }
            })
            .buffered(self.map_concurrency)
            .try_collect()
            .await?;

        let combined = partials.join(PARTIAL_SEPARATOR);
        let prompt = self.templates.combine().render_content(&combined)?;
        let summary = self.call(&prompt).await?;

        Ok((summary, partials.len() + 1, chunks.len()))
    }

    /// The first chunk goes through the mode template so the running summary
    /// starts in the requested style; the refine template never sees an empty
    /// existing summary.
    async fn refine(
        &self,
        documents: &[Document],
        mode: SummaryMode,
    ) -> Result<(String, usize, usize), SummariseError> {
        let chunks = self.splitter.split_documents(documents);
        let Some((first, rest)) = chunks.split_first() else {
            return Err(SummariseError::EmptyInput);
        };

        let prompt = self.templates.for_mode(mode).render_content(&first.content)?;
        let mut summary = self.call(&prompt).await?;

        for (i, chunk) in rest.iter().enumerate() {
            debug!("refine step {}/{}", i + 2, chunks.len());
            let vars = HashMap::from([
                ("existing_summary", summary.as_str()),
                ("content", chunk.content.as_str()),
            ]);
            let prompt = self.templates.refine().render(&vars)?;
            summary = self.call(&prompt).await?;
        }

        Ok((summary, chunks.len(), chunks.len()))
    }

    async fn call(&self, prompt: &str) -> Result<String, SummariseError> {
        complete(self.generator.as_ref(), prompt).await
    }
}

/// One model call with a trimmed, non-empty response.
async fn complete(generator: &dyn TextGenerator, prompt: &str) -> Result<String, SummariseError> {
    let response = generator.generate(prompt).await?;
    let response = response.trim();
    if response.is_empty() {
        return Err(SummariseError::EmptyResponse);
    }
    debug!("model replied: {}", preview(response, 80));
    Ok(response.to_string())
}
