//! The `quizlens student` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Color, Table};

use quizlens_core::parser;

use super::check_threshold;

pub fn execute(quiz_path: PathBuf, student_id: String, threshold: f64) -> Result<()> {
    check_threshold(threshold)?;
    let quiz = parser::parse_quiz(&quiz_path)?;

    let student = quiz.student_by_id(&student_id).ok_or_else(|| {
        anyhow::anyhow!("student '{student_id}' not found in quiz '{}'", quiz.name)
    })?;

    println!(
        "{} ({}), section {}",
        student.name,
        student.student_id,
        if student.section.is_empty() {
            "-"
        } else {
            student.section.as_str()
        }
    );
    println!(
        "Score: {:.1}/{:.1} ({:.1}%)",
        quiz.student_total_score(student),
        quiz.student_total_possible(),
        quiz.student_percentage(student)
    );

    let mut table = Table::new();
    table.set_header(vec!["Question", "Topic", "Earned", "Points", "Score"]);
    for response in &student.responses {
        let Some(question) = quiz.question_by_id(response.question_id) else {
            table.add_row(vec![
                Cell::new(format!("Q{} (unknown)", response.question_id)),
                Cell::new("-"),
                Cell::new(format!("{:.1}", response.points_earned)),
                Cell::new("-"),
                Cell::new("-"),
            ]);
            continue;
        };

        let pct = response.score_percentage(question);
        let score = Cell::new(format!("{pct:.1}%"));
        table.add_row(vec![
            Cell::new(format!("Q{}", question.question_id)),
            Cell::new(question.mapped_topic.as_deref().unwrap_or("-")),
            Cell::new(format!("{:.1}", response.points_earned)),
            Cell::new(format!("{:.1}", question.points)),
            if pct < threshold {
                score.fg(Color::Red)
            } else {
                score
            },
        ]);
    }
    println!("{table}");

    let mut weak: Vec<String> = quiz
        .student_weak_topics(student, threshold)
        .into_iter()
        .collect();
    weak.sort();

    if weak.is_empty() {
        println!("No weak topics at {threshold:.0}%.");
    } else {
        println!("Weak topics (below {threshold:.0}%): {}", weak.join(", "));
    }

    Ok(())
}
