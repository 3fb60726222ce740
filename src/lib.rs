//! Summarist - document summarisation with hosted LLMs.
//!
//! Loads PDF and plain-text documents, renders prompt templates for one of
//! several summary modes, and drives a hosted model through one of three
//! chaining strategies (stuff, map-reduce, refine).

pub mod cli;
pub mod config;
pub mod llm;
pub mod loader;
pub mod server;
pub mod summarise;
pub mod utils;

pub use config::Settings;
pub use llm::{LlmClient, LlmConfig, LlmError, TextGenerator};
pub use loader::{Document, DocumentLoader, FileKind, LoadError, LoadedDocument};
pub use summarise::{ChainType, SummariseError, Summariser, SummaryMode, SummaryOutcome};
