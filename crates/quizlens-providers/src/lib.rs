//! quizlens-providers: language-model backends and topic mappers.
//!
//! Implements the `LlmProvider` trait for OpenAI and Ollama, the
//! `TopicMapper` trait for an LLM-backed assistant and an offline keyword
//! matcher, and loads the quizlens configuration file.

pub mod assistant;
pub mod config;
pub mod keyword;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use assistant::{AssistantModels, LlmAssistant};
pub use config::{create_provider, load_config, load_config_from, ProviderConfig, QuizlensConfig};
pub use keyword::KeywordMapper;
pub use quizlens_core::error::ProviderError;
