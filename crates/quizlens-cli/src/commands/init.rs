//! The `quizlens init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("quizlens.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("samples").context("failed to create samples directory")?;
    write_if_missing(Path::new("samples/quiz.toml"), SAMPLE_QUIZ)?;
    write_if_missing(Path::new("samples/syllabus.toml"), SAMPLE_SYLLABUS)?;

    println!("\nNext steps:");
    println!("  1. Edit quizlens.toml with your API keys (only needed for --mapper llm and --recommend)");
    println!("  2. Run: quizlens validate --quiz samples/quiz.toml --syllabus samples/syllabus.toml");
    println!("  3. Run: quizlens analyze --quiz samples/quiz.toml --syllabus samples/syllabus.toml --mapper keyword --format all");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizlens configuration

default_provider = "openai"
mapping_model = "gpt-4.1-mini"
recommendation_model = "gpt-4.1"
weak_threshold = 70.0
parallelism = 4
max_retries = 3
retry_delay_ms = 1000
output_dir = "./quizlens-results"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"
"#;

const SAMPLE_SYLLABUS: &str = r#"[syllabus]
course_name = "Introduction to Programming"
course_code = "CS 101"

[[topics]]
name = "Control Flow"
description = "Branching and repetition"
week = 1
subtopics = ["If statements", "For loops", "While loops"]

[[topics]]
name = "Functions"
description = "Defining and calling functions"
week = 2
subtopics = ["Parameters", "Return values"]

[[topics]]
name = "Recursion"
description = "Functions that call themselves"
week = 3
subtopics = ["Base cases", "Call stack"]
"#;

const SAMPLE_QUIZ: &str = r#"[quiz]
name = "Sample Quiz"
course_name = "Introduction to Programming"
date = "2024-09-30"

[[questions]]
id = 1
text = "Write a while loop that counts down from 10 to 1."
points = 10

[[questions]]
id = 2
text = "What value does a function return when it has no return statement?"
correct_answer = "None"
points = 5

[[questions]]
id = 3
text = "What is the base case of a recursive factorial?"
correct_answer = "n <= 1"
points = 5

[[students]]
id = "s1"
name = "Ada"
section = "A"
responses = [
    { question_id = 1, points_earned = 9 },
    { question_id = 2, response = "None", points_earned = 5, is_correct = true },
    { question_id = 3, response = "n == 0", points_earned = 3 },
]

[[students]]
id = "s2"
name = "Grace"
section = "B"
responses = [
    { question_id = 1, points_earned = 6 },
    { question_id = 2, response = "null", points_earned = 2 },
    { question_id = 3, response = "n <= 1", points_earned = 5, is_correct = true },
]
"#;
