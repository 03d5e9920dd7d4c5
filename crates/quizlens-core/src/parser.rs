//! Quiz and syllabus loaders.
//!
//! Loads quizzes and syllabi from TOML (or JSON) files and directories, and
//! validates them. The aggregates themselves never reject bad data; this is
//! the place where anomalies get reported.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Question, Quiz, Student, StudentResponse, Syllabus, Topic};

// ---------------------------------------------------------------------------
// Quiz files
// ---------------------------------------------------------------------------

/// Intermediate TOML structure for quiz files.
#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
    #[serde(default)]
    students: Vec<TomlStudent>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    name: String,
    course_name: String,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: u32,
    text: String,
    #[serde(default)]
    correct_answer: String,
    points: f64,
    #[serde(default)]
    mapped_topic: Option<String>,
    #[serde(default)]
    secondary_topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TomlStudent {
    id: String,
    name: String,
    #[serde(default)]
    section: String,
    #[serde(default)]
    responses: Vec<TomlResponse>,
}

#[derive(Debug, Deserialize)]
struct TomlResponse {
    question_id: u32,
    #[serde(default)]
    response: String,
    points_earned: f64,
    #[serde(default)]
    is_correct: bool,
}

/// Parse a quiz date: RFC 3339 or a plain `YYYY-MM-DD` (midnight UTC).
fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid quiz date: {s}"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid quiz date: {s}"))?;
    Ok(midnight.and_utc())
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Load a quiz from a `.toml` or `.json` file.
pub fn parse_quiz(path: &Path) -> Result<Quiz> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    if is_json(path) {
        return serde_json::from_str(&content)
            .with_context(|| format!("failed to parse quiz JSON: {}", path.display()));
    }

    parse_quiz_str(&content, path)
}

/// Parse a quiz TOML string (useful for testing).
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<Quiz> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut quiz = match parsed.quiz.date.as_deref() {
        Some(date) => Quiz::with_date(
            parsed.quiz.name,
            parsed.quiz.course_name,
            parse_date(date)?,
        ),
        None => Quiz::new(parsed.quiz.name, parsed.quiz.course_name),
    };

    for q in parsed.questions {
        quiz.add_question(Question {
            question_id: q.id,
            question_text: q.text,
            correct_answer: q.correct_answer,
            points: q.points,
            mapped_topic: q.mapped_topic,
            secondary_topics: q.secondary_topics,
        });
    }

    for s in parsed.students {
        let mut student = Student::new(s.id, s.name, s.section);
        for r in s.responses {
            student.add_response(
                StudentResponse::new(r.question_id, r.response, r.points_earned)
                    .correct(r.is_correct),
            );
        }
        quiz.add_student(student);
    }

    Ok(quiz)
}

/// Recursively load every `.toml`/`.json` quiz file in a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<Quiz>> {
    let mut quizzes = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            quizzes.extend(load_quiz_directory(&path)?);
        } else if path
            .extension()
            .is_some_and(|ext| ext == "toml" || ext == "json")
        {
            match parse_quiz(&path) {
                Ok(quiz) => quizzes.push(quiz),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(quizzes)
}

// ---------------------------------------------------------------------------
// Syllabus files
// ---------------------------------------------------------------------------

/// TOML structure for syllabus files. Also used to write extracted syllabi.
#[derive(Debug, Serialize, Deserialize)]
struct TomlSyllabusFile {
    syllabus: TomlSyllabusHeader,
    #[serde(default)]
    topics: Vec<TomlTopic>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TomlSyllabusHeader {
    course_name: String,
    #[serde(default)]
    course_code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    raw_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TomlTopic {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    week: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    subtopics: Vec<String>,
}

/// Load a syllabus from a `.toml` or `.json` file.
pub fn parse_syllabus(path: &Path) -> Result<Syllabus> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read syllabus file: {}", path.display()))?;

    if is_json(path) {
        return serde_json::from_str(&content)
            .with_context(|| format!("failed to parse syllabus JSON: {}", path.display()));
    }

    parse_syllabus_str(&content, path)
}

/// Parse a syllabus TOML string.
pub fn parse_syllabus_str(content: &str, source_path: &Path) -> Result<Syllabus> {
    let parsed: TomlSyllabusFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut syllabus = Syllabus::new(parsed.syllabus.course_name, parsed.syllabus.course_code);
    syllabus.raw_text = parsed.syllabus.raw_text;

    for t in parsed.topics {
        syllabus.add_topic(Topic {
            name: t.name,
            description: t.description,
            week: t.week,
            subtopics: t.subtopics,
        });
    }

    Ok(syllabus)
}

/// Render a syllabus in the TOML layout [`parse_syllabus_str`] reads.
pub fn syllabus_to_toml(syllabus: &Syllabus) -> Result<String> {
    let file = TomlSyllabusFile {
        syllabus: TomlSyllabusHeader {
            course_name: syllabus.course_name.clone(),
            course_code: syllabus.course_code.clone(),
            raw_text: syllabus.raw_text.clone(),
        },
        topics: syllabus
            .topics
            .iter()
            .map(|t| TomlTopic {
                name: t.name.clone(),
                description: t.description.clone(),
                week: t.week,
                subtopics: t.subtopics.clone(),
            })
            .collect(),
    };
    toml::to_string_pretty(&file).context("failed to serialize syllabus")
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A warning from quiz or syllabus validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// What the warning is about, e.g. "question 3" or "student s-17".
    pub subject: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn about(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            message: message.into(),
        }
    }
}

/// Check a quiz for data-integrity problems the aggregates tolerate.
///
/// When a syllabus is given, topic names are also checked against it.
pub fn validate_quiz(quiz: &Quiz, syllabus: Option<&Syllabus>) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    // Duplicate question IDs
    let mut seen_questions = HashSet::new();
    for q in &quiz.questions {
        if !seen_questions.insert(q.question_id) {
            warnings.push(ValidationWarning::about(
                format!("question {}", q.question_id),
                format!("duplicate question ID: {}", q.question_id),
            ));
        }
        if q.points < 0.0 {
            warnings.push(ValidationWarning::about(
                format!("question {}", q.question_id),
                format!("negative points: {}", q.points),
            ));
        }
        if q.mapped_topic.is_none() {
            warnings.push(ValidationWarning::about(
                format!("question {}", q.question_id),
                "no mapped topic",
            ));
        }
    }

    // Duplicate student IDs
    let mut seen_students = HashSet::new();
    for s in &quiz.students {
        if !seen_students.insert(s.student_id.as_str()) {
            warnings.push(ValidationWarning::about(
                format!("student {}", s.student_id),
                format!("duplicate student ID: {}", s.student_id),
            ));
        }
    }

    // Responses
    for s in &quiz.students {
        let mut answered: HashMap<u32, usize> = HashMap::new();
        for r in &s.responses {
            *answered.entry(r.question_id).or_insert(0) += 1;

            let Some(question) = quiz.question_by_id(r.question_id) else {
                warnings.push(ValidationWarning::about(
                    format!("student {}", s.student_id),
                    format!("response to unknown question {}", r.question_id),
                ));
                continue;
            };

            if r.points_earned < 0.0 || r.points_earned > question.points {
                warnings.push(ValidationWarning::about(
                    format!("student {}", s.student_id),
                    format!(
                        "points earned {} outside 0..={} on question {}",
                        r.points_earned, question.points, r.question_id
                    ),
                ));
            }
        }

        let mut repeated: Vec<u32> = answered
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(id, _)| id)
            .collect();
        repeated.sort_unstable();
        for id in repeated {
            warnings.push(ValidationWarning::about(
                format!("student {}", s.student_id),
                format!("multiple responses to question {id}"),
            ));
        }
    }

    // Topic names against the syllabus
    if let Some(syllabus) = syllabus {
        for q in &quiz.questions {
            let topics = q.mapped_topic.iter().chain(q.secondary_topics.iter());
            for topic in topics {
                if syllabus.topic_by_name(topic).is_none() {
                    warnings.push(ValidationWarning::about(
                        format!("question {}", q.question_id),
                        format!("topic not in syllabus: {topic}"),
                    ));
                }
            }
        }
    }

    warnings
}

/// Check a syllabus for duplicate or empty topic names.
pub fn validate_syllabus(syllabus: &Syllabus) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for (i, topic) in syllabus.topics.iter().enumerate() {
        if topic.name.trim().is_empty() {
            warnings.push(ValidationWarning::about(
                format!("topic #{}", i + 1),
                "topic name is empty",
            ));
            continue;
        }
        if !seen.insert(topic.name.to_lowercase()) {
            warnings.push(ValidationWarning::about(
                format!("topic {}", topic.name),
                format!("duplicate topic name: {}", topic.name),
            ));
        }
    }

    if syllabus.topics.is_empty() {
        warnings.push(ValidationWarning {
            subject: None,
            message: "syllabus has no topics".into(),
        });
    }

    warnings
}
