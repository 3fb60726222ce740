//! LLM client configuration.

use serde::{Deserialize, Serialize};

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Google Gemini `generateContent` API (default)
    #[default]
    Gemini,
    /// OpenAI-compatible chat completions (OpenAI, Groq, Together.ai, etc.)
    OpenAI,
    /// Ollama API (local)
    Ollama,
}

impl LlmProvider {
    /// Parse a provider name. Groq and Together are OpenAI-compatible.
    pub fn parse(s: &str) -> Option<Self> {
        preset(s).map(|p| p.provider)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }

    /// Whether requests must carry an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint, key variables and default model for a named provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderPreset {
    pub provider: LlmProvider,
    pub endpoint: &'static str,
    pub key_vars: &'static [&'static str],
    pub default_model: &'static str,
}

const PRESETS: &[(&str, ProviderPreset)] = &[
    (
        "gemini",
        ProviderPreset {
            provider: LlmProvider::Gemini,
            endpoint: "https://generativelanguage.googleapis.com",
            key_vars: &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            default_model: "gemini-1.5-flash",
        },
    ),
    (
        "openai",
        ProviderPreset {
            provider: LlmProvider::OpenAI,
            endpoint: "https://api.openai.com",
            key_vars: &["OPENAI_API_KEY"],
            default_model: "gpt-4o-mini",
        },
    ),
    (
        "groq",
        ProviderPreset {
            provider: LlmProvider::OpenAI,
            endpoint: "https://api.groq.com/openai",
            key_vars: &["GROQ_API_KEY"],
            default_model: "llama-3.1-8b-instant",
        },
    ),
    (
        "together",
        ProviderPreset {
            provider: LlmProvider::OpenAI,
            endpoint: "https://api.together.xyz",
            key_vars: &["TOGETHER_API_KEY"],
            default_model: "meta-llama/Llama-3.3-70B-Instruct-Turbo",
        },
    ),
    (
        "ollama",
        ProviderPreset {
            provider: LlmProvider::Ollama,
            endpoint: "http://localhost:11434",
            key_vars: &[],
            default_model: "llama3.2",
        },
    ),
];

/// Look up a provider preset by name (case-insensitive).
pub fn preset(name: &str) -> Option<ProviderPreset> {
    let name = name.trim().to_lowercase();
    PRESETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, p)| *p)
}

/// Configuration for the LLM client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider API flavour
    #[serde(default)]
    pub provider: LlmProvider,
    /// Named preset the provider was chosen through ("groq", "together", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_name: Option<String>,
    /// API base URL (provider-specific defaults apply)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key; never serialized
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Model to use for summarisation
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,
    /// Maximum tokens in each response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries on 429/503 before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before every request, in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    5
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            preset_name: None,
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            request_delay_ms: 0,
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_PROVIDER`: "gemini" (default), "openai", "groq", "together" or "ollama"
    /// - `LLM_ENDPOINT`: API base URL (defaults based on provider)
    /// - `LLM_API_KEY`: API key for any provider
    /// - `GOOGLE_API_KEY` / `GEMINI_API_KEY`, `OPENAI_API_KEY`, `GROQ_API_KEY`,
    ///   `TOGETHER_API_KEY`: provider-specific keys
    /// - `DEFAULT_LLM_MODEL` or `LLM_MODEL`: model name (`LLM_MODEL` wins)
    /// - `DEFAULT_TEMPERATURE` or `LLM_TEMPERATURE`: unparsable values mean 0.0
    /// - `LLM_MAX_TOKENS`, `LLM_TIMEOUT_SECS`, `LLM_MAX_RETRIES`, `LLM_DELAY_MS`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Provider switch moves endpoint and model along with it, unless they
        // were customised away from the previous provider's defaults.
        let mut active = self.active_preset();
        if let Some(name) = var("LLM_PROVIDER") {
            match preset(&name) {
                Some(next) => {
                    if let Some(prev) = active {
                        if self.endpoint == prev.endpoint {
                            self.endpoint = next.endpoint.to_string();
                        }
                        if self.model == prev.default_model {
                            self.model = next.default_model.to_string();
                        }
                    }
                    self.provider = next.provider;
                    self.preset_name = Some(name.trim().to_lowercase());
                    active = Some(next);
                }
                None => tracing::warn!("Unknown LLM_PROVIDER '{}', keeping {}", name, self.provider),
            }
        }

        if let Some(endpoint) = var("LLM_ENDPOINT") {
            self.endpoint = endpoint;
        }
        self.endpoint = self.endpoint.trim_end_matches('/').to_string();

        if let Some(key) = var("LLM_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            if let Some(p) = active {
                self.api_key = p.key_vars.iter().find_map(|k| var(*k));
            }
        }

        if let Some(model) = var("LLM_MODEL").or_else(|| var("DEFAULT_LLM_MODEL")) {
            self.model = model;
        }
        if let Some(val) = var("LLM_TEMPERATURE").or_else(|| var("DEFAULT_TEMPERATURE")) {
            self.temperature = parse_temperature(&val);
        }
        if let Some(n) = var("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.max_tokens = n;
        }
        if let Some(n) = var("LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.timeout_secs = n;
        }
        if let Some(n) = var("LLM_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.max_retries = n;
        }
        if let Some(n) = var("LLM_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.request_delay_ms = n;
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Switch to a named preset, taking its endpoint and default model.
    pub fn with_preset(mut self, name: &str) -> Option<Self> {
        let p = preset(name)?;
        self.provider = p.provider;
        self.preset_name = Some(name.trim().to_lowercase());
        self.endpoint = p.endpoint.to_string();
        self.model = p.default_model.to_string();
        Some(self)
    }

    /// Preset the config was built from, else the one named after the provider.
    pub fn active_preset(&self) -> Option<ProviderPreset> {
        self.preset_name
            .as_deref()
            .and_then(preset)
            .filter(|p| p.provider == self.provider)
            .or_else(|| preset(self.provider.as_str()))
    }

    /// API key with surrounding whitespace removed, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Parse a temperature value; anything unparsable or non-finite is 0.0.
pub fn parse_temperature(raw: &str) -> f32 {
    match raw.trim().parse::<f32>() {
        Ok(t) if t.is_finite() => t,
        _ => {
            tracing::warn!("Invalid temperature '{}', using 0.0", raw);
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_target_gemini() {
        let config = LlmConfig::default();
        assert_eq!(config.provider, LlmProvider::Gemini);
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.temperature, 0.0);
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_google_key_and_model_from_env() {
        let config = LlmConfig::default().with_overrides_from(lookup(&[
            ("GOOGLE_API_KEY", "g-key"),
            ("DEFAULT_LLM_MODEL", "gemini-1.5-pro"),
            ("DEFAULT_TEMPERATURE", "0.4"),
        ]));
        assert_eq!(config.api_key(), Some("g-key"));
        assert_eq!(config.model, "gemini-1.5-pro");
        assert!((config.temperature - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bad_temperature_falls_back_to_zero() {
        let config = LlmConfig::default()
            .with_temperature(0.7)
            .with_overrides_from(lookup(&[("DEFAULT_TEMPERATURE", "warm")]));
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn test_provider_switch_moves_defaults() {
        let config = LlmConfig::default().with_overrides_from(lookup(&[
            ("LLM_PROVIDER", "groq"),
            ("GROQ_API_KEY", "gsk"),
            ("GOOGLE_API_KEY", "ignored"),
        ]));
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.endpoint, "https://api.groq.com/openai");
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.api_key(), Some("gsk"));
    }

    #[test]
    fn test_custom_endpoint_survives_provider_switch() {
        let config = LlmConfig::default()
            .with_endpoint("http://proxy.local/")
            .with_overrides_from(lookup(&[("LLM_PROVIDER", "ollama")]));
        assert_eq!(config.provider, LlmProvider::Ollama);
        assert_eq!(config.endpoint, "http://proxy.local");
        assert!(!config.provider.requires_api_key());
    }

    #[test]
    fn test_explicit_key_wins() {
        let config = LlmConfig::default().with_overrides_from(lookup(&[
            ("LLM_API_KEY", "explicit"),
            ("GOOGLE_API_KEY", "g-key"),
        ]));
        assert_eq!(config.api_key(), Some("explicit"));
    }

    #[test]
    fn test_preset_keeps_its_key_variables() {
        let config = LlmConfig::default()
            .with_preset("together")
            .unwrap()
            .with_overrides_from(lookup(&[
                ("OPENAI_API_KEY", "wrong"),
                ("TOGETHER_API_KEY", "tg-key"),
            ]));
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.endpoint, "https://api.together.xyz");
        assert_eq!(config.api_key(), Some("tg-key"));
    }

    #[test]
    fn test_switch_away_from_groq_moves_defaults() {
        let config = LlmConfig::default()
            .with_preset("groq")
            .unwrap()
            .with_overrides_from(lookup(&[("LLM_PROVIDER", "openai")]));
        assert_eq!(config.endpoint, "https://api.openai.com");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.active_preset().map(|p| p.key_vars), Some(&["OPENAI_API_KEY"][..]));
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let config = LlmConfig::default().with_api_key("secret");
        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("secret"));
    }
}
