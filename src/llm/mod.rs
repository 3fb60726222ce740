//! LLM integration for document summarisation.
//!
//! Sends rendered prompts to a hosted model (Gemini by default) and returns
//! the generated text.

mod client;
mod retry;

pub use client::{
    parse_temperature, preset, LlmClient, LlmConfig, LlmError, LlmProvider, ProviderPreset,
    TextGenerator,
};
pub use retry::{backoff_delay, parse_retry_after};
