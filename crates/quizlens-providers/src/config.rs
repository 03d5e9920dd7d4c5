//! Configuration file loading and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizlens_core::engine::MappingEngineConfig;
use quizlens_core::model::DEFAULT_WEAK_THRESHOLD;
use quizlens_core::traits::LlmProvider;

use crate::assistant::AssistantModels;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

pub const CONFIG_FILE_NAME: &str = "quizlens.toml";

/// Configuration for a single LLM provider.
///
/// Debug output masks API keys.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Top-level quizlens configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizlensConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used for LLM mapping, extraction and recommendations.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model for topic extraction and question mapping.
    #[serde(default = "default_mapping_model")]
    pub mapping_model: String,
    /// Model for instructor recommendations.
    #[serde(default = "default_recommendation_model")]
    pub recommendation_model: String,
    /// Percentage below which a topic counts as weak.
    #[serde(default = "default_threshold")]
    pub weak_threshold: f64,
    /// Max concurrent mapping calls.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Max retries on provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Base delay between retries in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_mapping_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_recommendation_model() -> String {
    "gpt-4.1".to_string()
}
fn default_threshold() -> f64 {
    DEFAULT_WEAK_THRESHOLD
}
fn default_parallelism() -> usize {
    4
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./quizlens-results")
}

impl Default for QuizlensConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            mapping_model: default_mapping_model(),
            recommendation_model: default_recommendation_model(),
            weak_threshold: default_threshold(),
            parallelism: default_parallelism(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            output_dir: default_output_dir(),
        }
    }
}

impl QuizlensConfig {
    /// Mapping engine settings derived from this config.
    pub fn engine_config(&self, remap_existing: bool) -> MappingEngineConfig {
        MappingEngineConfig {
            parallelism: self.parallelism.max(1),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            remap_existing,
        }
    }

    pub fn assistant_models(&self) -> AssistantModels {
        AssistantModels {
            extraction: self.mapping_model.clone(),
            mapping: self.mapping_model.clone(),
            recommendation: self.recommendation_model.clone(),
        }
    }

    /// Build the default provider.
    pub fn default_llm(&self) -> Result<Arc<dyn LlmProvider>> {
        let provider_config = self.providers.get(&self.default_provider).with_context(|| {
            format!(
                "provider '{}' is not configured (add [providers.{}] to {CONFIG_FILE_NAME})",
                self.default_provider, self.default_provider
            )
        })?;
        create_provider(&self.default_provider, provider_config)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizlens.toml` in the current directory
/// 2. `~/.config/quizlens/config.toml`
///
/// `QUIZLENS_OPENAI_KEY` overrides the OpenAI API key.
pub fn load_config() -> Result<QuizlensConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizlensConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizlensConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizlensConfig::default(),
    };

    if let Ok(key) = std::env::var("QUIZLENS_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizlens"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            if api_key.is_empty() {
                anyhow::bail!(
                    "provider '{name}' has no API key (set api_key or QUIZLENS_OPENAI_KEY)"
                );
            }
            Arc::new(OpenAiProvider::new(api_key, base_url.clone(), org_id.clone())?)
        }
        ProviderConfig::Ollama { base_url } => Arc::new(OllamaProvider::new(base_url)?),
    };
    Ok(provider)
}
