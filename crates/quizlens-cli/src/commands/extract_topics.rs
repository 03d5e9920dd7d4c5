//! The `quizlens extract-topics` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use quizlens_core::model::Syllabus;
use quizlens_core::parser;
use quizlens_providers::config::load_config_from;
use quizlens_providers::LlmAssistant;

pub async fn execute(
    text_path: PathBuf,
    course_name: String,
    course_code: String,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let text = std::fs::read_to_string(&text_path)
        .with_context(|| format!("failed to read syllabus text: {}", text_path.display()))?;
    anyhow::ensure!(
        !text.trim().is_empty(),
        "syllabus text is empty: {}",
        text_path.display()
    );

    let config = load_config_from(config_path.as_deref())?;
    let assistant = LlmAssistant::new(config.default_llm()?, config.assistant_models());

    eprintln!("Extracting topics with '{}'...", config.default_provider);
    let topics = assistant.extract_topics(&text).await?;
    anyhow::ensure!(
        !topics.is_empty(),
        "no topics could be extracted from {}",
        text_path.display()
    );

    let mut syllabus = Syllabus::new(course_name, course_code);
    syllabus.raw_text = text;
    for topic in topics {
        syllabus.add_topic(topic);
    }

    for w in parser::validate_syllabus(&syllabus) {
        eprintln!("WARNING: {}", w.message);
    }

    let mut table = Table::new();
    table.set_header(vec!["Week", "Topic", "Subtopics"]);
    for topic in &syllabus.topics {
        table.add_row(vec![
            Cell::new(topic.week.map(|w| w.to_string()).unwrap_or_default()),
            Cell::new(&topic.name),
            Cell::new(topic.subtopics.join(", ")),
        ]);
    }
    eprintln!("{table}");

    let rendered = parser::syllabus_to_toml(&syllabus)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write syllabus: {}", path.display()))?;
            eprintln!("Syllabus written to: {}", path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
