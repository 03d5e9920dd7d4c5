//! The `quizlens analyze` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use quizlens_core::engine::{MappingEngine, MappingOutcome, MappingProgress, MappingReport};
use quizlens_core::model::Syllabus;
use quizlens_core::parser;
use quizlens_core::report::AnalyticsSummary;
use quizlens_core::traits::TopicMapper;
use quizlens_providers::config::load_config_from;
use quizlens_providers::{KeywordMapper, LlmAssistant};
use quizlens_report::html::write_html_report;

use super::check_threshold;
use crate::MapperKind;

const FORMATS: [&str; 3] = ["json", "html", "markdown"];

/// Console progress reporter.
struct ConsoleProgress;

impl MappingProgress for ConsoleProgress {
    fn on_question_start(&self, question_id: u32) {
        tracing::debug!("mapping question {question_id}");
    }

    fn on_question_mapped(&self, outcome: &MappingOutcome) {
        eprintln!(
            "  Q{}: {} ({:.0}%)",
            outcome.question_id,
            outcome.mapping.primary_topic,
            outcome.mapping.confidence * 100.0
        );
    }

    fn on_question_fallback(&self, question_id: u32, error: &str) {
        eprintln!("  Q{question_id}: FALLBACK ({error})");
    }

    fn on_complete(&self, total: usize, fallbacks: usize, elapsed: Duration) {
        eprintln!(
            "\nMapped {total} questions, {fallbacks} fallbacks ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    quiz_path: PathBuf,
    syllabus_path: Option<PathBuf>,
    mapper_kind: MapperKind,
    remap: bool,
    threshold: Option<f64>,
    recommend: bool,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let formats = parse_formats(&format)?;
    let config = load_config_from(config_path.as_deref())?;
    let threshold = threshold.unwrap_or(config.weak_threshold);
    check_threshold(threshold)?;

    let mut quiz = parser::parse_quiz(&quiz_path)?;
    let syllabus = syllabus_path
        .as_deref()
        .map(parser::parse_syllabus)
        .transpose()?;

    eprintln!(
        "quizlens v{} - {} ({} questions, {} students)",
        env!("CARGO_PKG_VERSION"),
        quiz.name,
        quiz.questions.len(),
        quiz.students.len()
    );

    let mapping_report = if mapper_kind == MapperKind::None {
        None
    } else {
        let syllabus = syllabus
            .as_ref()
            .context("--syllabus is required when mapping topics")?;

        let mapper: Arc<dyn TopicMapper> = match mapper_kind {
            MapperKind::Keyword => Arc::new(KeywordMapper::new(syllabus.clone())),
            _ => Arc::new(LlmAssistant::new(
                config.default_llm()?,
                config.assistant_models(),
            )),
        };

        eprintln!("Mapping questions with '{}'\n", mapper.name());
        let engine = MappingEngine::new(mapper, config.engine_config(remap));
        Some(engine.map_quiz(&mut quiz, syllabus, &ConsoleProgress).await?)
    };

    let warnings = parser::validate_quiz(&quiz, syllabus.as_ref());
    if !warnings.is_empty() {
        eprintln!(
            "{} validation warning(s); run `quizlens validate` for details",
            warnings.len()
        );
    }

    let mut summary = AnalyticsSummary::compute(&quiz, syllabus.as_ref(), threshold);

    if recommend {
        let assistant = LlmAssistant::new(config.default_llm()?, config.assistant_models());
        let context = syllabus.as_ref().map(syllabus_context).unwrap_or_default();
        eprintln!("Requesting recommendations...");
        match assistant.generate_recommendations(&summary, &context).await {
            Ok(text) => summary.attach_recommendations(text),
            Err(e) => tracing::warn!("recommendations unavailable: {e:#}"),
        }
    }

    print_summary(&summary);

    let output = output.unwrap_or_else(|| config.output_dir.clone());
    std::fs::create_dir_all(&output)
        .with_context(|| format!("failed to create output directory: {}", output.display()))?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");

    if let Some(report) = &mapping_report {
        let path = output.join(format!("mapping-{timestamp}.json"));
        save_mapping_report(report, &path)?;
        eprintln!("Mapping saved to: {}", path.display());
    }

    for fmt in formats {
        match fmt {
            "json" => {
                let path = output.join(format!("summary-{timestamp}.json"));
                summary.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "html" => {
                let path = output.join(format!("summary-{timestamp}.html"));
                write_html_report(&summary, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            _ => {
                let path = output.join(format!("summary-{timestamp}.md"));
                std::fs::write(&path, summary.to_markdown())
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("Markdown report: {}", path.display());
            }
        }
    }

    Ok(())
}

/// Split a `--format` value, rejecting unknown names.
fn parse_formats(format: &str) -> Result<Vec<&'static str>> {
    if format.trim() == "all" {
        return Ok(FORMATS.to_vec());
    }
    let mut formats = Vec::new();
    for name in format.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let known = FORMATS
            .iter()
            .find(|f| **f == name)
            .with_context(|| format!("unknown format '{name}' (expected json, html, markdown or all)"))?;
        if !formats.contains(known) {
            formats.push(*known);
        }
    }
    anyhow::ensure!(!formats.is_empty(), "no output format given");
    Ok(formats)
}

/// Text handed to the model as course context.
fn syllabus_context(syllabus: &Syllabus) -> String {
    if syllabus.raw_text.trim().is_empty() {
        syllabus.all_topic_names().join(", ")
    } else {
        syllabus.raw_text.clone()
    }
}

fn save_mapping_report(report: &MappingReport, path: &std::path::Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write mapping report: {}", path.display()))
}

fn print_summary(summary: &AnalyticsSummary) {
    use comfy_table::{Cell, Color, Table};

    let mut overview = Table::new();
    overview.set_header(vec!["Students", "Questions", "Possible", "Class average"]);
    overview.add_row(vec![
        Cell::new(summary.student_count),
        Cell::new(summary.question_count),
        Cell::new(format!("{:.1}", summary.total_possible)),
        Cell::new(format!("{:.1}%", summary.class_average)),
    ]);
    eprintln!("\n{overview}");

    if !summary.sections.is_empty() {
        let mut sections = Table::new();
        sections.set_header(vec!["Section", "Students", "Average"]);
        for stats in summary.sections.values() {
            sections.add_row(vec![
                Cell::new(&stats.section),
                Cell::new(stats.student_count),
                Cell::new(format!("{:.1}%", stats.average_percentage)),
            ]);
        }
        eprintln!("\n{sections}");
    }

    if !summary.topics.is_empty() {
        let mut topics = Table::new();
        topics.set_header(vec!["Topic", "Questions", "Average", "Weak students"]);
        for stats in summary.topics.values() {
            let average = Cell::new(format!("{:.1}%", stats.average_percentage));
            let weak = stats.response_count > 0 && stats.average_percentage < summary.threshold;
            topics.add_row(vec![
                Cell::new(&stats.topic),
                Cell::new(stats.question_count),
                if weak { average.fg(Color::Red) } else { average },
                Cell::new(stats.weak_student_count),
            ]);
        }
        eprintln!("\n{topics}");
    }

    if !summary.weakest_topics.is_empty() {
        eprintln!(
            "\nTopics below {:.0}%: {}",
            summary.threshold,
            summary.weakest_topics.join(", ")
        );
    }
    if let Some(recommendations) = &summary.recommendations {
        eprintln!("\nRecommendations:\n{recommendations}");
    }
}
