//! The `quizlens validate` command.

use std::path::PathBuf;

use anyhow::Result;

use quizlens_core::parser::{self, ValidationWarning};

fn print_warnings(warnings: &[ValidationWarning]) {
    for w in warnings {
        let prefix = w
            .subject
            .as_ref()
            .map(|s| format!("  [{s}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }
}

pub fn execute(quiz_path: PathBuf, syllabus_path: Option<PathBuf>) -> Result<()> {
    let quizzes = if quiz_path.is_dir() {
        parser::load_quiz_directory(&quiz_path)?
    } else {
        vec![parser::parse_quiz(&quiz_path)?]
    };

    let syllabus = syllabus_path
        .as_deref()
        .map(parser::parse_syllabus)
        .transpose()?;

    let mut total_warnings = 0;

    if let Some(syllabus) = &syllabus {
        println!(
            "Syllabus: {} ({} topics)",
            syllabus.course_name,
            syllabus.topics.len()
        );
        let warnings = parser::validate_syllabus(syllabus);
        print_warnings(&warnings);
        total_warnings += warnings.len();
    }

    for quiz in &quizzes {
        println!(
            "Quiz: {} ({} questions, {} students)",
            quiz.name,
            quiz.questions.len(),
            quiz.students.len()
        );
        let warnings = parser::validate_quiz(quiz, syllabus.as_ref());
        print_warnings(&warnings);
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All files valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
