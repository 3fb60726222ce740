//! Configuration management for summarist.
//!
//! Settings are layered, lowest precedence first: built-in defaults, a TOML
//! config file, environment variables (after `.env` is loaded), then CLI flags
//! applied by the individual commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{parse_temperature, LlmConfig, TextGenerator};
use crate::loader::DocumentLoader;
use crate::summarise::{
    ChainType, SummariseError, Summariser, SummaryMode, TemplateSet, TextSplitter,
};

/// Config file looked for in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILENAME: &str = "summarist.toml";

/// Default web server bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3030";

/// Default request body limit (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize settings: {0}")]
    Serialize(String),
}

/// Effective application settings.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Summary mode preselected in the UI and CLI.
    pub default_mode: SummaryMode,
    /// Chaining strategy preselected in the UI and CLI.
    pub default_chain: ChainType,
    /// Directory whose template files replace the built-in prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    /// Directory uploads are persisted to; nothing is written when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<PathBuf>,
    /// File name prefix for persisted uploads.
    pub upload_prefix: String,
    pub chunk_chars: usize,
    pub chunk_overlap: usize,
    /// Parallel map calls in map_reduce.
    pub map_concurrency: usize,
    /// Web server bind address.
    pub bind: String,
    /// Request body limit in bytes.
    pub max_upload_bytes: usize,
    /// Config file these settings were loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
    pub llm: LlmConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_mode: SummaryMode::default(),
            default_chain: ChainType::default(),
            templates_dir: None,
            upload_dir: None,
            upload_prefix: "upload".to_string(),
            chunk_chars: 12_000,
            chunk_overlap: 200,
            map_concurrency: 1,
            bind: DEFAULT_BIND.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            source_path: None,
            llm: LlmConfig::default(),
        }
    }
}

impl Settings {
    /// Apply environment variable overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(mode) = var("DEFAULT_MODE") {
            self.default_mode = parse_mode_or_default(&mode);
        }
        if let Some(chain) = var("DEFAULT_CHAIN_TYPE") {
            self.default_chain = parse_chain_or_default(&chain);
        }
        if let Some(prefix) = var("UPLOAD_FILENAME") {
            self.upload_prefix = prefix;
        }
        if let Some(dir) = var("SUMMARIST_TEMPLATES_DIR") {
            self.templates_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = var("SUMMARIST_UPLOAD_DIR") {
            self.upload_dir = Some(PathBuf::from(dir));
        }
        if let Some(n) = parse_var(&var, "SUMMARIST_CHUNK_CHARS") {
            self.chunk_chars = n;
        }
        if let Some(n) = parse_var(&var, "SUMMARIST_CHUNK_OVERLAP") {
            self.chunk_overlap = n;
        }
        if let Some(n) = parse_var(&var, "SUMMARIST_MAP_CONCURRENCY") {
            self.map_concurrency = n;
        }
        if let Some(bind) = var("SUMMARIST_BIND") {
            self.bind = bind;
        }
        if let Some(n) = parse_var(&var, "SUMMARIST_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = n;
        }

        self.llm = self.llm.with_overrides_from(&lookup);
        self
    }

    /// Prompt templates, with any overrides from `templates_dir`.
    pub fn templates(&self) -> Result<TemplateSet, SummariseError> {
        let templates = match &self.templates_dir {
            Some(dir) => TemplateSet::load(dir)?,
            None => TemplateSet::builtin()?,
        };
        Ok(templates)
    }

    /// Loader honouring the upload directory settings.
    pub fn document_loader(&self) -> DocumentLoader {
        match &self.upload_dir {
            Some(dir) => DocumentLoader::new().with_upload_dir(dir, &self.upload_prefix),
            None => DocumentLoader::new(),
        }
    }

    /// Summariser driving `generator` with these settings' templates and chunking.
    pub fn build_summariser(
        &self,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Summariser, SummariseError> {
        Ok(Summariser::new(generator)?
            .with_templates(self.templates()?)
            .with_splitter(TextSplitter::new(self.chunk_chars, self.chunk_overlap))
            .with_map_concurrency(self.map_concurrency))
    }

    /// Settings as TOML, with the API key masked.
    pub fn to_toml_redacted(&self) -> Result<String, ConfigError> {
        let mut value =
            toml::Value::try_from(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if self.llm.api_key().is_some() {
            if let Some(llm) = value.get_mut("llm").and_then(|v| v.as_table_mut()) {
                llm.insert(
                    "api_key".to_string(),
                    toml::Value::String("<redacted>".to_string()),
                );
            }
        }

        toml::to_string_pretty(&value).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

fn parse_var<T, V>(var: &V, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    V: Fn(&str) -> Option<String>,
{
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Ignoring invalid {}='{}'", key, raw);
            None
        }
    }
}

fn parse_mode_or_default(raw: &str) -> SummaryMode {
    raw.parse().unwrap_or_else(|e| {
        warn!("{}; falling back to {}", e, SummaryMode::default());
        SummaryMode::default()
    })
}

fn parse_chain_or_default(raw: &str) -> ChainType {
    raw.parse().unwrap_or_else(|e| {
        warn!("{}; falling back to {}", e, ChainType::default());
        ChainType::default()
    })
}

/// `[llm]` table of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmSection {
    /// Provider preset name: gemini, openai, groq, together or ollama.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Any TOML value; unparsable ones fall back to 0.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<toml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
}

impl LlmSection {
    fn apply_to(&self, llm: &mut LlmConfig) {
        if let Some(name) = &self.provider {
            match llm.clone().with_preset(name) {
                Some(switched) => *llm = switched,
                None => warn!("Unknown provider '{}' in config, keeping {}", name, llm.provider),
            }
        }
        if let Some(endpoint) = &self.endpoint {
            llm.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(key) = &self.api_key {
            llm.api_key = Some(key.clone());
        }
        if let Some(model) = &self.model {
            llm.model = model.clone();
        }
        if let Some(temperature) = &self.temperature {
            llm.temperature = match temperature {
                toml::Value::Float(f) => *f as f32,
                toml::Value::Integer(i) => *i as f32,
                toml::Value::String(s) => parse_temperature(s),
                other => parse_temperature(&other.to_string()),
            };
        }
        if let Some(n) = self.max_tokens {
            llm.max_tokens = n;
        }
        if let Some(n) = self.timeout_secs {
            llm.timeout_secs = n;
        }
        if let Some(n) = self.max_retries {
            llm.max_retries = n;
        }
        if let Some(n) = self.request_delay_ms {
            llm.request_delay_ms = n;
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "default_chain")]
    pub default_chain_type: Option<String>,
    /// Relative paths resolve against the config file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "upload_filename")]
    pub upload_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_chars: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_overlap: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,
    #[serde(default)]
    pub llm: LlmSection,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load and parse a TOML config file.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let mut config: Config = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory containing the config file, if loaded from one.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a possibly relative path against `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let path = Path::new(path_str);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply config file values to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        let base_dir = self.base_dir().unwrap_or_else(|| PathBuf::from("."));

        if let Some(mode) = &self.default_mode {
            settings.default_mode = parse_mode_or_default(mode);
        }
        if let Some(chain) = &self.default_chain_type {
            settings.default_chain = parse_chain_or_default(chain);
        }
        if let Some(dir) = &self.templates_dir {
            settings.templates_dir = Some(self.resolve_path(dir, &base_dir));
        }
        if let Some(dir) = &self.upload_dir {
            settings.upload_dir = Some(self.resolve_path(dir, &base_dir));
        }
        if let Some(prefix) = &self.upload_prefix {
            settings.upload_prefix = prefix.clone();
        }
        if let Some(n) = self.chunk_chars {
            settings.chunk_chars = n;
        }
        if let Some(n) = self.chunk_overlap {
            settings.chunk_overlap = n;
        }
        if let Some(n) = self.map_concurrency {
            settings.map_concurrency = n;
        }
        if let Some(bind) = &self.bind {
            settings.bind = bind.clone();
        }
        if let Some(n) = self.max_upload_bytes {
            settings.max_upload_bytes = n;
        }
        self.llm.apply_to(&mut settings.llm);
        settings.source_path = self.source_path.clone();
    }
}

/// Options controlling where configuration is loaded from.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file (`--config`); must exist when given.
    pub config_path: Option<PathBuf>,
    /// Directory searched for `summarist.toml` when no explicit path is given.
    pub search_dir: Option<PathBuf>,
}

/// Load settings from defaults, the config file and the process environment.
pub async fn load_settings(options: LoadOptions) -> Result<Settings, ConfigError> {
    let settings = load_file_settings(&options).await?;
    Ok(settings.with_env_overrides())
}

/// Defaults overlaid with the config file, without environment overrides.
pub async fn load_file_settings(options: &LoadOptions) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    let path = match &options.config_path {
        Some(path) => Some(path.clone()),
        None => {
            let dir = options
                .search_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            let candidate = dir.join(DEFAULT_CONFIG_FILENAME);
            candidate.exists().then_some(candidate)
        }
    };

    if let Some(path) = path {
        debug!("Loading config from {}", path.display());
        Config::load_from_path(&path)
            .await?
            .apply_to_settings(&mut settings);
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.default_mode, SummaryMode::Prose);
        assert_eq!(s.default_chain, ChainType::Stuff);
        assert_eq!(s.upload_prefix, "upload");
        assert_eq!(s.chunk_chars, 12_000);
        assert_eq!(s.chunk_overlap, 200);
        assert_eq!(s.map_concurrency, 1);
        assert_eq!(s.bind, "127.0.0.1:3030");
        assert_eq!(s.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(s.llm.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_env_overrides() {
        let s = Settings::default().with_overrides_from(lookup(&[
            ("DEFAULT_MODE", "Bullet"),
            ("DEFAULT_CHAIN_TYPE", "map_reduce"),
            ("UPLOAD_FILENAME", "doc"),
            ("SUMMARIST_CHUNK_CHARS", "4000"),
            ("SUMMARIST_MAP_CONCURRENCY", "3"),
            ("SUMMARIST_UPLOAD_DIR", "/tmp/uploads"),
            ("DEFAULT_LLM_MODEL", "gemini-1.5-pro"),
            ("DEFAULT_TEMPERATURE", "0.4"),
        ]));
        assert_eq!(s.default_mode, SummaryMode::Bullet);
        assert_eq!(s.default_chain, ChainType::MapReduce);
        assert_eq!(s.upload_prefix, "doc");
        assert_eq!(s.chunk_chars, 4000);
        assert_eq!(s.map_concurrency, 3);
        assert_eq!(s.upload_dir, Some(PathBuf::from("/tmp/uploads")));
        assert_eq!(s.llm.model, "gemini-1.5-pro");
        assert!((s.llm.temperature - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_defaults_fall_back() {
        let s = Settings::default().with_overrides_from(lookup(&[
            ("DEFAULT_MODE", "haiku"),
            ("DEFAULT_CHAIN_TYPE", "stuffing"),
            ("SUMMARIST_CHUNK_CHARS", "lots"),
        ]));
        assert_eq!(s.default_mode, SummaryMode::Prose);
        assert_eq!(s.default_chain, ChainType::Stuff);
        assert_eq!(s.chunk_chars, 12_000);
    }

    #[tokio::test]
    async fn test_config_file_layer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summarist.toml");
        std::fs::write(
            &path,
            r#"
default_mode = "extractive"
default_chain_type = "refine"
templates_dir = "prompts"
chunk_overlap = 50

[llm]
provider = "ollama"
temperature = "warm"
"#,
        )
        .unwrap();

        let settings = load_file_settings(&LoadOptions {
            config_path: None,
            search_dir: Some(dir.path().to_path_buf()),
        })
        .await
        .unwrap();

        assert_eq!(settings.default_mode, SummaryMode::Extractive);
        assert_eq!(settings.default_chain, ChainType::Refine);
        assert_eq!(settings.templates_dir, Some(dir.path().join("prompts")));
        assert_eq!(settings.chunk_overlap, 50);
        assert_eq!(settings.llm.provider, LlmProvider::Ollama);
        assert_eq!(settings.llm.endpoint, "http://localhost:11434");
        assert_eq!(settings.llm.temperature, 0.0);
        assert_eq!(settings.source_path, Some(path));
    }

    #[tokio::test]
    async fn test_groq_from_config_file_reads_groq_key() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("summarist.toml"),
            "[llm]\nprovider = \"groq\"\n",
        )
        .unwrap();

        let settings = load_file_settings(&LoadOptions {
            config_path: None,
            search_dir: Some(dir.path().to_path_buf()),
        })
        .await
        .unwrap()
        .with_overrides_from(lookup(&[("GROQ_API_KEY", "gsk")]));

        assert_eq!(settings.llm.provider, LlmProvider::OpenAI);
        assert_eq!(settings.llm.endpoint, "https://api.groq.com/openai");
        assert_eq!(settings.llm.model, "llama-3.1-8b-instant");
        assert_eq!(settings.llm.api_key(), Some("gsk"));
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_file_settings(&LoadOptions {
            config_path: Some(dir.path().join("nope.toml")),
            search_dir: None,
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_malformed_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "default_mode = [").unwrap();

        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_redacted_toml_hides_key() {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("sk-secret".to_string());

        let out = settings.to_toml_redacted().unwrap();
        assert!(!out.contains("sk-secret"));
        assert!(out.contains("<redacted>"));
        assert!(out.contains("default_mode = \"prose\""));
        assert!(out.contains("gemini-1.5-flash"));
    }

    #[test]
    fn test_templates_dir_override_is_validated() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("prompt_template.txt"), "no placeholder").unwrap();

        let settings = Settings {
            templates_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(settings.templates().is_err());
    }
}
