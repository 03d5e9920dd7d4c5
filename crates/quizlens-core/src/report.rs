//! Analytics summary with JSON persistence and markdown rendering.
//!
//! [`AnalyticsSummary`] is the snapshot handed to renderers and to the
//! recommendation step. It is computed once from a [`Quiz`] and carries no
//! reference back to it.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Quiz, Student, Syllabus};
use crate::statistics::{section_breakdown, topic_performance, SectionStats, TopicStats};

/// A complete analytics summary for one quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    /// Unique summary identifier.
    pub id: Uuid,
    /// When the summary was computed.
    pub created_at: DateTime<Utc>,
    pub quiz_name: String,
    pub course_name: String,
    /// Course code from the syllabus, when one was supplied.
    #[serde(default)]
    pub course_code: Option<String>,
    pub quiz_date: DateTime<Utc>,
    /// Weak-topic threshold used, in percent.
    pub threshold: f64,
    pub student_count: usize,
    pub question_count: usize,
    /// Points available across the quiz.
    pub total_possible: f64,
    pub class_average: f64,
    pub sections: BTreeMap<String, SectionStats>,
    pub topics: BTreeMap<String, TopicStats>,
    /// One entry per student, in quiz order.
    pub students: Vec<StudentSummary>,
    /// Topics averaging below the threshold, weakest first.
    pub weakest_topics: Vec<String>,
    /// Ids of questions without a primary topic.
    pub unmapped_questions: Vec<u32>,
    /// Instructor recommendations, if they were generated.
    #[serde(default)]
    pub recommendations: Option<String>,
}

/// Per-student line of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub student_id: String,
    pub name: String,
    pub section: String,
    pub total_score: f64,
    pub total_possible: f64,
    pub percentage: f64,
    /// Weak topics, sorted by name.
    pub weak_topics: Vec<String>,
}

impl StudentSummary {
    fn compute(quiz: &Quiz, student: &Student, threshold: f64) -> Self {
        let mut weak_topics: Vec<String> =
            quiz.student_weak_topics(student, threshold).into_iter().collect();
        weak_topics.sort();

        Self {
            student_id: student.student_id.clone(),
            name: student.name.clone(),
            section: student.section.clone(),
            total_score: quiz.student_total_score(student),
            total_possible: quiz.student_total_possible(),
            percentage: quiz.student_percentage(student),
            weak_topics,
        }
    }
}

impl AnalyticsSummary {
    /// Compute a summary of `quiz` at the given weak-topic threshold.
    pub fn compute(quiz: &Quiz, syllabus: Option<&Syllabus>, threshold: f64) -> Self {
        let topics = topic_performance(quiz, threshold);

        let mut weakest: Vec<&TopicStats> = topics
            .values()
            .filter(|t| t.response_count > 0 && t.average_percentage < threshold)
            .collect();
        weakest.sort_by(|a, b| {
            a.average_percentage
                .total_cmp(&b.average_percentage)
                .then_with(|| a.topic.cmp(&b.topic))
        });
        let weakest_topics = weakest.into_iter().map(|t| t.topic.clone()).collect();

        let students = quiz
            .students
            .iter()
            .map(|s| StudentSummary::compute(quiz, s, threshold))
            .collect();

        let unmapped_questions = quiz
            .questions
            .iter()
            .filter(|q| q.mapped_topic.is_none())
            .map(|q| q.question_id)
            .collect();

        let course_code = syllabus
            .map(|s| s.course_code.clone())
            .filter(|code| !code.is_empty());

        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            quiz_name: quiz.name.clone(),
            course_name: quiz.course_name.clone(),
            course_code,
            quiz_date: quiz.date,
            threshold,
            student_count: quiz.students.len(),
            question_count: quiz.questions.len(),
            total_possible: quiz.student_total_possible(),
            class_average: quiz.class_average(),
            sections: section_breakdown(quiz),
            topics,
            students,
            weakest_topics,
            unmapped_questions,
            recommendations: None,
        }
    }

    /// Store generated recommendations for renderers.
    pub fn attach_recommendations(&mut self, recommendations: impl Into<String>) {
        self.recommendations = Some(recommendations.into());
    }

    /// Class-level view without per-student rows, suitable for a model prompt.
    pub fn instructor_digest(&self) -> serde_json::Value {
        let sections: BTreeMap<&str, f64> = self
            .sections
            .iter()
            .map(|(name, s)| (name.as_str(), round1(s.average_percentage)))
            .collect();
        let topics: BTreeMap<&str, serde_json::Value> = self
            .topics
            .iter()
            .map(|(name, t)| {
                (
                    name.as_str(),
                    serde_json::json!({
                        "average_percentage": round1(t.average_percentage),
                        "students_struggling": t.weak_student_count,
                        "questions": t.question_count,
                    }),
                )
            })
            .collect();

        serde_json::json!({
            "quiz": self.quiz_name,
            "course": self.course_name,
            "students": self.student_count,
            "class_average": round1(self.class_average),
            "weak_threshold": self.threshold,
            "section_averages": sections,
            "topics": topics,
            "weakest_topics": self.weakest_topics,
        })
    }

    /// Save the summary as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize summary")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        Ok(())
    }

    /// Load a summary from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read summary from {}", path.display()))?;
        let summary: AnalyticsSummary =
            serde_json::from_str(&content).context("failed to parse summary JSON")?;
        Ok(summary)
    }

    /// Format the summary as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("# {} ({})\n\n", self.quiz_name, self.course_name));
        md.push_str(&format!(
            "**Class average:** {:.1}% across {} students and {} questions ({} points)\n\n",
            self.class_average, self.student_count, self.question_count, self.total_possible
        ));

        if !self.sections.is_empty() {
            md.push_str("## Sections\n\n");
            md.push_str("| Section | Students | Average |\n");
            md.push_str("|---------|----------|---------|\n");
            for s in self.sections.values() {
                md.push_str(&format!(
                    "| {} | {} | {:.1}% |\n",
                    s.section, s.student_count, s.average_percentage
                ));
            }
            md.push('\n');
        }

        if !self.topics.is_empty() {
            md.push_str("## Topics\n\n");
            md.push_str("| Topic | Questions | Average | Students below threshold |\n");
            md.push_str("|-------|-----------|---------|--------------------------|\n");
            for t in self.topics.values() {
                md.push_str(&format!(
                    "| {} | {} | {:.1}% | {} |\n",
                    t.topic, t.question_count, t.average_percentage, t.weak_student_count
                ));
            }
            md.push('\n');
        }

        if !self.weakest_topics.is_empty() {
            md.push_str(&format!(
                "**Topics below {:.0}%:** {}\n\n",
                self.threshold,
                self.weakest_topics.join(", ")
            ));
        }

        if !self.unmapped_questions.is_empty() {
            let ids: Vec<String> = self
                .unmapped_questions
                .iter()
                .map(|id| id.to_string())
                .collect();
            md.push_str(&format!("**Unmapped questions:** {}\n\n", ids.join(", ")));
        }

        if let Some(rec) = &self.recommendations {
            md.push_str("## Recommendations\n\n");
            md.push_str(rec.trim());
            md.push('\n');
        }

        md
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Question, StudentResponse};

    fn sample_quiz() -> Quiz {
        let mut quiz = Quiz::new("Midterm", "Intro to Programming");
        quiz.add_question(Question::new(1, "Recursion?", "", 10.0).with_topic("Recursion"));
        quiz.add_question(Question::new(2, "Arrays?", "", 10.0).with_topic("Arrays"));
        quiz.add_question(Question::new(3, "Free points", "", 0.0));
        quiz.add_student(
            Student::new("S1", "Ada", "A")
                .with_response(StudentResponse::new(1, "", 4.0))
                .with_response(StudentResponse::new(2, "", 9.0)),
        );
        quiz.add_student(
            Student::new("S2", "Grace", "B")
                .with_response(StudentResponse::new(1, "", 10.0))
                .with_response(StudentResponse::new(2, "", 5.0)),
        );
        quiz
    }

    #[test]
    fn compute_summary() {
        let mut syllabus = Syllabus::new("Intro to Programming", "CS 101");
        syllabus.raw_text = "Week 1".into();
        let summary = AnalyticsSummary::compute(&sample_quiz(), Some(&syllabus), 70.0);

        assert_eq!(summary.student_count, 2);
        assert_eq!(summary.question_count, 3);
        assert_eq!(summary.course_code.as_deref(), Some("CS 101"));
        assert!((summary.class_average - 70.0).abs() < 1e-9);
        assert_eq!(summary.sections.len(), 2);
        assert_eq!(summary.unmapped_questions, vec![3]);
        assert_eq!(summary.students[0].weak_topics, vec!["Recursion"]);
        assert_eq!(summary.students[1].weak_topics, vec!["Arrays"]);
        // Recursion averages 70 (not below), Arrays averages 70 too
        assert!(summary.weakest_topics.is_empty());
    }

    #[test]
    fn weakest_topics_sorted_ascending() {
        let summary = AnalyticsSummary::compute(&sample_quiz(), None, 80.0);
        assert_eq!(summary.weakest_topics, vec!["Arrays", "Recursion"]);
        assert!(summary.course_code.is_none());
    }

    #[test]
    fn json_roundtrip() {
        let mut summary = AnalyticsSummary::compute(&sample_quiz(), None, 70.0);
        summary.attach_recommendations("1. Revisit recursion.");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.json");

        summary.save_json(&path).unwrap();
        let loaded = AnalyticsSummary::load_json(&path).unwrap();

        assert_eq!(loaded.quiz_name, "Midterm");
        assert_eq!(loaded.students.len(), 2);
        assert_eq!(loaded.recommendations.as_deref(), Some("1. Revisit recursion."));
    }

    #[test]
    fn markdown_output() {
        let mut summary = AnalyticsSummary::compute(&sample_quiz(), None, 80.0);
        summary.attach_recommendations("1. More practice on arrays.");
        let md = summary.to_markdown();
        assert!(md.contains("# Midterm"));
        assert!(md.contains("| Recursion | 1 | 70.0% | 1 |"));
        assert!(md.contains("Topics below 80%"));
        assert!(md.contains("Unmapped questions:** 3"));
        assert!(md.contains("## Recommendations"));
    }

    #[test]
    fn digest_omits_students() {
        let summary = AnalyticsSummary::compute(&sample_quiz(), None, 70.0);
        let digest = summary.instructor_digest();
        assert_eq!(digest["students"], 2);
        assert_eq!(digest["class_average"], 70.0);
        assert!(digest["topics"]["Arrays"].is_object());
        assert!(digest.get("student_summaries").is_none());
    }
}
