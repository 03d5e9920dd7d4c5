//! Language-model backed syllabus and quiz helpers.
//!
//! [`LlmAssistant`] wraps any [`LlmProvider`] and offers three calls:
//! topic extraction from raw syllabus text, question-to-topic mapping (as a
//! [`TopicMapper`]), and instructor recommendations from an
//! [`AnalyticsSummary`].

use std::sync::Arc;

use async_trait::async_trait;

use quizlens_core::error::ProviderError;
use quizlens_core::model::Topic;
use quizlens_core::report::AnalyticsSummary;
use quizlens_core::traits::{
    extract_json_from_markdown, ChatRequest, LlmProvider, TopicMapper, TopicMapping,
};

/// Characters of syllabus text included in the recommendation prompt.
const SYLLABUS_CONTEXT_CHARS: usize = 500;

const EXTRACT_SYSTEM_PROMPT: &str =
    "You extract structured information from educational content. Reply with JSON only.";
const MAPPING_SYSTEM_PROMPT: &str =
    "You map educational assessment questions to course topics. Reply with JSON only.";
const RECOMMEND_SYSTEM_PROMPT: &str =
    "You are an educational consultant who turns quiz analytics into concrete teaching advice.";

/// Which model to use for each kind of call.
#[derive(Debug, Clone)]
pub struct AssistantModels {
    pub extraction: String,
    pub mapping: String,
    pub recommendation: String,
}

impl AssistantModels {
    /// Use one model for everything.
    pub fn uniform(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            extraction: model.clone(),
            mapping: model.clone(),
            recommendation: model,
        }
    }
}

/// Syllabus/quiz helper backed by a chat model.
pub struct LlmAssistant {
    provider: Arc<dyn LlmProvider>,
    models: AssistantModels,
}

impl LlmAssistant {
    pub fn new(provider: Arc<dyn LlmProvider>, models: AssistantModels) -> Self {
        Self { provider, models }
    }

    /// Ask the model for the topics covered by a syllabus.
    ///
    /// Provider failures are returned as errors. A reply that is not a JSON
    /// array of topics is logged and yields an empty list.
    pub async fn extract_topics(&self, syllabus_text: &str) -> anyhow::Result<Vec<Topic>> {
        let prompt = format!(
            "Extract the main topics and their subtopics from this course syllabus.\n\n\
             Syllabus:\n{syllabus_text}\n\n\
             Return a JSON array where each element has the shape \
             {{\"name\": \"Topic\", \"description\": \"...\", \"week\": 1, \"subtopics\": [\"...\"]}}. \
             List roughly 5 to 15 topics."
        );

        let response = self
            .provider
            .complete(&ChatRequest {
                model: self.models.extraction.clone(),
                system_prompt: Some(EXTRACT_SYSTEM_PROMPT.to_string()),
                prompt,
                max_tokens: 1500,
                temperature: 0.3,
            })
            .await?;

        let json = extract_json_from_markdown(&response.content);
        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(&json) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("could not parse extracted topics: {e}");
                tracing::debug!("model reply was: {}", response.content);
                return Ok(Vec::new());
            }
        };

        let mut topics = Vec::with_capacity(entries.len());
        for (i, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Topic>(entry) {
                Ok(topic) if !topic.name.trim().is_empty() => topics.push(topic),
                Ok(_) => tracing::debug!("skipping extracted topic {i} with an empty name"),
                Err(e) => tracing::warn!("skipping extracted topic {i}: {e}"),
            }
        }
        tracing::info!("extracted {} topics", topics.len());
        Ok(topics)
    }

    /// Draft recommendations for the instructor from a computed summary.
    pub async fn generate_recommendations(
        &self,
        summary: &AnalyticsSummary,
        syllabus_context: &str,
    ) -> anyhow::Result<String> {
        let digest = serde_json::to_string_pretty(&summary.instructor_digest())?;
        let context = truncate_chars(syllabus_context, SYLLABUS_CONTEXT_CHARS);

        let prompt = format!(
            "Quiz: {quiz}\n\n\
             Performance summary:\n{digest}\n\n\
             Course context:\n{context}\n\n\
             Write 5 to 7 specific, actionable recommendations as a numbered list, \
             two or three sentences each. Cover which topics need more time, teaching \
             strategies for the hardest concepts, differences between sections, and \
             useful activities or resources.",
            quiz = summary.quiz_name,
        );

        let response = self
            .provider
            .complete(&ChatRequest {
                model: self.models.recommendation.clone(),
                system_prompt: Some(RECOMMEND_SYSTEM_PROMPT.to_string()),
                prompt,
                max_tokens: 800,
                temperature: 0.7,
            })
            .await?;

        Ok(response.content.trim().to_string())
    }
}

#[async_trait]
impl TopicMapper for LlmAssistant {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn map_question(
        &self,
        question_text: &str,
        topic_names: &[String],
    ) -> anyhow::Result<TopicMapping> {
        let topics: String = topic_names.iter().map(|t| format!("- {t}\n")).collect();
        let prompt = format!(
            "Which of these course topics does the quiz question test?\n\n\
             Question: {question_text}\n\n\
             Available topics:\n{topics}\n\
             Return a JSON object: \
             {{\"primary_topic\": \"...\", \"secondary_topics\": [\"...\"], \"confidence\": 0.9}}"
        );

        let response = self
            .provider
            .complete(&ChatRequest {
                model: self.models.mapping.clone(),
                system_prompt: Some(MAPPING_SYSTEM_PROMPT.to_string()),
                prompt,
                max_tokens: 200,
                temperature: 0.2,
            })
            .await?;

        let json = extract_json_from_markdown(&response.content);
        let mapping: TopicMapping = serde_json::from_str(&json)
            .map_err(|e| ProviderError::MalformedResponse(format!("topic mapping: {e}")))?;
        Ok(mapping.clamped())
    }
}

/// First `max` characters of `s`, with an ellipsis if anything was cut.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizlens_core::model::{Question, Quiz, Student, StudentResponse};

    use crate::mock::MockProvider;

    fn assistant(provider: Arc<MockProvider>) -> LlmAssistant {
        LlmAssistant::new(provider, AssistantModels::uniform("mock-model"))
    }

    #[tokio::test]
    async fn extract_topics_from_fenced_json() {
        let reply = "```json\n[\n  {\"name\": \"Variables\", \"week\": 1, \"subtopics\": [\"Types\"]},\n  {\"name\": \"Loops\", \"description\": \"for and while\"},\n  {\"name\": \"  \"}\n]\n```";
        let provider = Arc::new(MockProvider::with_fixed_response(reply));
        let topics = assistant(provider.clone())
            .extract_topics("Week 1: variables. Week 2: loops.")
            .await
            .unwrap();

        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].name, "Variables");
        assert_eq!(topics[0].week, Some(1));
        assert_eq!(topics[1].description.as_deref(), Some("for and while"));

        let request = provider.last_request().unwrap();
        assert!(request.prompt.contains("Week 2: loops."));
        assert_eq!(request.max_tokens, 1500);
    }

    #[tokio::test]
    async fn extract_topics_keeps_valid_entries() {
        let reply = r#"[
            {"name": "Variables", "week": 1},
            {"name": "Loops", "week": "1-2"},
            {"name": "Arrays", "week": -3},
            {"name": "Recursion", "subtopics": ["Base cases"]}
        ]"#;
        let provider = Arc::new(MockProvider::with_fixed_response(reply));
        let topics = assistant(provider).extract_topics("syllabus").await.unwrap();

        let names: Vec<&str> = topics.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Variables", "Recursion"]);
        assert_eq!(topics[1].subtopics, vec!["Base cases"]);
    }

    #[tokio::test]
    async fn extract_topics_unparseable_is_empty() {
        let provider = Arc::new(MockProvider::with_fixed_response("Sorry, I can't."));
        let topics = assistant(provider).extract_topics("syllabus").await.unwrap();
        assert!(topics.is_empty());
    }

    #[tokio::test]
    async fn map_question_parses_and_clamps() {
        let provider = Arc::new(MockProvider::with_fixed_response(
            r#"{"primary_topic": "Recursion", "secondary_topics": ["Functions"], "confidence": 1.4}"#,
        ));
        let topics = vec!["Functions".to_string(), "Recursion".to_string()];
        let mapping = assistant(provider.clone())
            .map_question("Write a recursive factorial", &topics)
            .await
            .unwrap();

        assert_eq!(mapping.primary_topic, "Recursion");
        assert_eq!(mapping.secondary_topics, vec!["Functions"]);
        assert_eq!(mapping.confidence, 1.0);
        assert!(provider.last_request().unwrap().prompt.contains("- Recursion\n"));
    }

    #[tokio::test]
    async fn map_question_bad_reply_is_malformed_error() {
        let provider = Arc::new(MockProvider::with_fixed_response("Recursion, probably."));
        let err = assistant(provider)
            .map_question("q", &["Recursion".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn recommendations_include_digest_and_truncated_context() {
        let mut quiz = Quiz::new("Quiz 4", "Intro");
        quiz.add_question(Question::new(1, "q", "", 10.0).with_topic("Pointers"));
        quiz.add_student(
            Student::new("s1", "Ada", "A").with_response(StudentResponse::new(1, "", 3.0)),
        );
        let summary = AnalyticsSummary::compute(&quiz, None, 70.0);

        let provider = Arc::new(MockProvider::with_fixed_response(
            "  1. Spend another lecture on pointers.\n",
        ));
        let context = "x".repeat(600);
        let text = assistant(provider.clone())
            .generate_recommendations(&summary, &context)
            .await
            .unwrap();

        assert_eq!(text, "1. Spend another lecture on pointers.");
        let prompt = provider.last_request().unwrap().prompt;
        assert!(prompt.contains("Quiz: Quiz 4"));
        assert!(prompt.contains("\"Pointers\""));
        assert!(prompt.contains(&format!("{}...", "x".repeat(500))));
        assert!(!prompt.contains(&"x".repeat(501)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
