//! Core trait definitions for language-model providers and topic mappers.
//!
//! These async traits are implemented by the `quizlens-providers` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// Trait for chat-completion backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Send a single-turn chat request.
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse>;
}

/// A single-turn chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier (e.g. "gpt-4.1-mini").
    pub model: String,
    /// System prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// User message.
    pub prompt: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response to a [`ChatRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually answered.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Topic mapping
// ---------------------------------------------------------------------------

/// Trait for anything that can assign syllabus topics to a question.
#[async_trait]
pub trait TopicMapper: Send + Sync {
    /// Short mapper name for logs and reports (e.g. "keyword").
    fn name(&self) -> &str;

    /// Pick a primary topic and any secondary topics for a question.
    ///
    /// Returned names are not required to appear in `topic_names`.
    async fn map_question(
        &self,
        question_text: &str,
        topic_names: &[String],
    ) -> anyhow::Result<TopicMapping>;
}

/// The result of mapping one question onto syllabus topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMapping {
    /// Most relevant topic.
    pub primary_topic: String,
    /// Other relevant topics, most relevant first.
    #[serde(default)]
    pub secondary_topics: Vec<String>,
    /// Mapper confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

/// Topic name used when there is nothing to map against.
pub const UNKNOWN_TOPIC: &str = "Unknown";

impl TopicMapping {
    /// Mapping used when a mapper fails: the first available topic (or
    /// [`UNKNOWN_TOPIC`]) with zero confidence.
    pub fn fallback(topic_names: &[String]) -> Self {
        Self {
            primary_topic: topic_names
                .first()
                .cloned()
                .unwrap_or_else(|| UNKNOWN_TOPIC.to_string()),
            secondary_topics: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Clamp confidence into `[0, 1]`; NaN becomes 0.
    pub fn clamped(mut self) -> Self {
        self.confidence = if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
        self
    }
}

// ---------------------------------------------------------------------------
// Markdown JSON extraction
// ---------------------------------------------------------------------------

/// Extract a JSON payload from a possibly markdown-formatted model reply.
///
/// Handles:
/// - ```json``` blocks (the first one wins)
/// - Generic ``` blocks (if no json-specific block is found)
/// - Raw JSON with no fences (returned trimmed)
pub fn extract_json_from_markdown(response: &str) -> String {
    let mut json_block: Option<String> = None;
    let mut generic_block: Option<String> = None;
    let mut in_block = false;
    let mut is_json_block = false;
    let mut is_generic_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            is_generic_block = lang.is_empty();
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block && json_block.is_none() {
                json_block = Some(current_block.clone());
            } else if is_generic_block && generic_block.is_none() {
                generic_block = Some(current_block.clone());
            }
            current_block.clear();
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    // Truncated replies leave a block open; keep what we have
    if in_block && !current_block.is_empty() {
        if is_json_block && json_block.is_none() {
            json_block = Some(current_block);
        } else if is_generic_block && generic_block.is_none() {
            generic_block = Some(current_block);
        }
    }

    json_block
        .or(generic_block)
        .unwrap_or_else(|| response.to_string())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_block() {
        let input = "Here you go:\n\n```json\n{\"primary_topic\": \"Loops\"}\n```\n\nHope it helps.";
        assert_eq!(
            extract_json_from_markdown(input),
            "{\"primary_topic\": \"Loops\"}"
        );
    }

    #[test]
    fn extract_prefers_json_over_generic() {
        let input = "```\nnot this\n```\n\n```json\n[1, 2]\n```\n";
        assert_eq!(extract_json_from_markdown(input), "[1, 2]");
    }

    #[test]
    fn extract_generic_block_fallback() {
        let input = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_from_markdown(input), "{\"a\": 1}");
    }

    #[test]
    fn extract_raw_json_is_trimmed() {
        let input = "  \n{\"a\": 1}\n ";
        assert_eq!(extract_json_from_markdown(input), "{\"a\": 1}");
    }

    #[test]
    fn extract_truncated_block() {
        let input = "```json\n[{\"name\": \"Loops\"}";
        assert_eq!(extract_json_from_markdown(input), "[{\"name\": \"Loops\"}");
    }

    #[test]
    fn fallback_uses_first_topic() {
        let topics = vec!["Variables".to_string(), "Loops".to_string()];
        let mapping = TopicMapping::fallback(&topics);
        assert_eq!(mapping.primary_topic, "Variables");
        assert!(mapping.secondary_topics.is_empty());
        assert_eq!(mapping.confidence, 0.0);

        assert_eq!(TopicMapping::fallback(&[]).primary_topic, UNKNOWN_TOPIC);
    }

    #[test]
    fn clamped_confidence() {
        let mapping = TopicMapping {
            primary_topic: "Loops".into(),
            secondary_topics: vec![],
            confidence: 1.7,
        };
        assert_eq!(mapping.clamped().confidence, 1.0);

        let mapping = TopicMapping {
            primary_topic: "Loops".into(),
            secondary_topics: vec![],
            confidence: f64::NAN,
        };
        assert_eq!(mapping.clamped().confidence, 0.0);
    }

    #[test]
    fn mapping_deserializes_with_defaults() {
        let mapping: TopicMapping =
            serde_json::from_str(r#"{"primary_topic": "Recursion"}"#).unwrap();
        assert_eq!(mapping.primary_topic, "Recursion");
        assert!(mapping.secondary_topics.is_empty());
    }
}
