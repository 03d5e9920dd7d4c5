//! Topic-mapping orchestrator.
//!
//! Maps every question of a quiz onto syllabus topics with bounded
//! parallelism and retries. Mapper calls run concurrently, but results are
//! only written back to the quiz once all of them have finished.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::ProviderError;
use crate::model::{Quiz, Syllabus};
use crate::traits::{TopicMapper, TopicMapping};

/// Configuration for the mapping engine.
#[derive(Debug, Clone)]
pub struct MappingEngineConfig {
    /// Maximum concurrent mapper calls.
    pub parallelism: usize,
    /// Retries on transient mapper errors.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time.
    pub retry_delay: Duration,
    /// Re-map questions that already have a topic.
    pub remap_existing: bool,
}

impl Default for MappingEngineConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            remap_existing: false,
        }
    }
}

/// Progress reporting trait.
pub trait MappingProgress: Send + Sync {
    fn on_question_start(&self, question_id: u32);
    fn on_question_mapped(&self, outcome: &MappingOutcome);
    fn on_question_fallback(&self, question_id: u32, error: &str);
    fn on_complete(&self, total: usize, fallbacks: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopProgress;

impl MappingProgress for NoopProgress {
    fn on_question_start(&self, _: u32) {}
    fn on_question_mapped(&self, _: &MappingOutcome) {}
    fn on_question_fallback(&self, _: u32, _: &str) {}
    fn on_complete(&self, _: usize, _: usize, _: Duration) {}
}

/// What happened to one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingOutcome {
    pub question_id: u32,
    pub mapping: TopicMapping,
    /// `true` if the mapper failed and the fallback mapping was used.
    pub fell_back: bool,
    /// Mapper calls made for this question.
    pub attempts: u32,
}

/// Result of mapping a whole quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingReport {
    pub id: Uuid,
    /// Name of the mapper used.
    pub mapper: String,
    /// One outcome per mapped question, in quiz order.
    pub outcomes: Vec<MappingOutcome>,
    /// Questions left alone because they already had a topic.
    pub skipped: usize,
    pub duration_ms: u64,
}

impl MappingReport {
    pub fn fallback_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.fell_back).count()
    }

    /// Mean confidence over mapped questions, `0.0` if none were mapped.
    pub fn average_confidence(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes
            .iter()
            .map(|o| o.mapping.confidence)
            .sum::<f64>()
            / self.outcomes.len() as f64
    }
}

/// Assigns syllabus topics to quiz questions through a [`TopicMapper`].
pub struct MappingEngine {
    mapper: Arc<dyn TopicMapper>,
    config: MappingEngineConfig,
}

impl MappingEngine {
    pub fn new(mapper: Arc<dyn TopicMapper>, config: MappingEngineConfig) -> Self {
        Self { mapper, config }
    }

    /// Map the quiz's questions onto the syllabus topics and write the
    /// results back into the quiz.
    ///
    /// A question whose mapper call keeps failing gets
    /// [`TopicMapping::fallback`]; only an empty syllabus is an error.
    pub async fn map_quiz(
        &self,
        quiz: &mut Quiz,
        syllabus: &Syllabus,
        progress: &dyn MappingProgress,
    ) -> Result<MappingReport> {
        let start = Instant::now();
        let topic_names: Arc<[String]> = syllabus.all_topic_names().into();
        anyhow::ensure!(
            !topic_names.is_empty(),
            "syllabus for {} has no topics to map against",
            syllabus.course_name
        );

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();
        let mut skipped = 0usize;

        for (index, question) in quiz.questions.iter().enumerate() {
            if question.mapped_topic.is_some() && !self.config.remap_existing {
                skipped += 1;
                continue;
            }

            let mapper = Arc::clone(&self.mapper);
            let semaphore = Arc::clone(&semaphore);
            let topic_names = Arc::clone(&topic_names);
            let text = question.question_text.clone();
            let question_id = question.question_id;
            let config = self.config.clone();

            futures.push(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, question_id, Err((anyhow::anyhow!("semaphore closed"), 0)));
                };
                progress.on_question_start(question_id);
                let result = map_with_retry(mapper.as_ref(), &text, &topic_names, &config).await;
                (index, question_id, result)
            });
        }

        let mut collected = Vec::with_capacity(futures.len());
        let mut fallbacks = 0usize;

        while let Some((index, question_id, result)) = futures.next().await {
            let outcome = match result {
                Ok((mapping, attempts)) => {
                    let outcome = MappingOutcome {
                        question_id,
                        mapping,
                        fell_back: false,
                        attempts,
                    };
                    progress.on_question_mapped(&outcome);
                    outcome
                }
                Err((e, attempts)) => {
                    tracing::warn!(
                        "mapping failed for question {question_id}, using fallback: {e:#}"
                    );
                    progress.on_question_fallback(question_id, &e.to_string());
                    fallbacks += 1;
                    MappingOutcome {
                        question_id,
                        mapping: TopicMapping::fallback(&topic_names),
                        fell_back: true,
                        attempts,
                    }
                }
            };
            collected.push((index, outcome));
        }

        collected.sort_by_key(|(index, _)| *index);
        for (index, outcome) in &collected {
            quiz.questions[*index].apply_mapping(&outcome.mapping);
        }

        let elapsed = start.elapsed();
        progress.on_complete(collected.len(), fallbacks, elapsed);
        tracing::debug!(
            mapper = self.mapper.name(),
            mapped = collected.len(),
            skipped,
            fallbacks,
            "topic mapping finished"
        );

        Ok(MappingReport {
            id: Uuid::new_v4(),
            mapper: self.mapper.name().to_string(),
            outcomes: collected.into_iter().map(|(_, o)| o).collect(),
            skipped,
            duration_ms: elapsed.as_millis() as u64,
        })
    }
}

/// Call the mapper, retrying transient errors with exponential backoff.
///
/// Returns the mapping and the number of attempts, or the last error and
/// the number of attempts.
async fn map_with_retry(
    mapper: &dyn TopicMapper,
    text: &str,
    topic_names: &[String],
    config: &MappingEngineConfig,
) -> std::result::Result<(TopicMapping, u32), (anyhow::Error, u32)> {
    let mut retry_delay = config.retry_delay;
    let mut last_error = None;
    let mut attempts = 0u32;

    for retry in 0..=config.max_retries {
        if retry > 0 {
            tokio::time::sleep(retry_delay).await;
            retry_delay = (retry_delay * 2).min(Duration::from_secs(60));
        }
        attempts += 1;

        match mapper.map_question(text, topic_names).await {
            Ok(mapping) => return Ok((mapping, attempts)),
            Err(e) => {
                if let Some(provider_err) = e.downcast_ref::<ProviderError>() {
                    if provider_err.is_permanent() {
                        return Err((e, attempts));
                    }
                    if let Some(ms) = provider_err.retry_after_ms() {
                        retry_delay = Duration::from_millis(ms);
                    }
                }
                last_error = Some(e);
            }
        }
    }

    Err((
        last_error.unwrap_or_else(|| anyhow::anyhow!("unknown error")),
        attempts,
    ))
}
