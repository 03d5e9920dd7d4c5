//! Per-topic aggregate statistics.
//!
//! Everything here is derived from [`Quiz`] on demand; nothing is cached.
//! Maps are `BTreeMap`s so reports render in a stable order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Quiz;

/// How a class performed on one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicStats {
    /// Topic name as it appears in `Question::mapped_topic`.
    pub topic: String,
    /// Questions whose primary topic is this one.
    pub question_count: usize,
    /// Responses to those questions.
    pub response_count: usize,
    /// Mean response score percentage, `0.0` with no responses.
    pub average_percentage: f64,
    /// Students for whom this topic is weak.
    pub weak_student_count: usize,
}

/// Per-section averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionStats {
    pub section: String,
    pub student_count: usize,
    pub average_percentage: f64,
}

/// Number of students that have each topic as a weak topic.
pub fn weak_topic_frequency(quiz: &Quiz, threshold: f64) -> BTreeMap<String, usize> {
    let mut frequency = BTreeMap::new();
    for student in &quiz.students {
        for topic in quiz.student_weak_topics(student, threshold) {
            *frequency.entry(topic).or_insert(0) += 1;
        }
    }
    frequency
}

/// Compute [`TopicStats`] for every mapped topic in the quiz.
///
/// Only the primary topic counts. Responses to questions that are missing
/// from the quiz are skipped.
pub fn topic_performance(quiz: &Quiz, threshold: f64) -> BTreeMap<String, TopicStats> {
    let mut stats: BTreeMap<String, TopicStats> = BTreeMap::new();
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();

    for question in &quiz.questions {
        if let Some(topic) = &question.mapped_topic {
            entry(&mut stats, topic).question_count += 1;
        }
    }

    for student in &quiz.students {
        for response in &student.responses {
            let Some(question) = quiz.question_by_id(response.question_id) else {
                continue;
            };
            let Some(topic) = &question.mapped_topic else {
                continue;
            };
            entry(&mut stats, topic).response_count += 1;
            *sums.entry(topic.clone()).or_insert(0.0) += response.score_percentage(question);
        }
    }

    for (topic, count) in weak_topic_frequency(quiz, threshold) {
        entry(&mut stats, &topic).weak_student_count = count;
    }

    for (topic, s) in stats.iter_mut() {
        if s.response_count > 0 {
            let sum = sums.get(topic).copied().unwrap_or(0.0);
            s.average_percentage = sum / s.response_count as f64;
        }
    }

    stats
}

fn entry<'a>(stats: &'a mut BTreeMap<String, TopicStats>, topic: &str) -> &'a mut TopicStats {
    stats
        .entry(topic.to_string())
        .or_insert_with(|| TopicStats {
            topic: topic.to_string(),
            question_count: 0,
            response_count: 0,
            average_percentage: 0.0,
            weak_student_count: 0,
        })
}

/// Averages for every section in the quiz.
pub fn section_breakdown(quiz: &Quiz) -> BTreeMap<String, SectionStats> {
    quiz.all_sections()
        .into_iter()
        .map(|section| {
            let stats = SectionStats {
                student_count: quiz.students_by_section(&section).len(),
                average_percentage: quiz.section_average(&section),
                section: section.clone(),
            };
            (section, stats)
        })
        .collect()
}
