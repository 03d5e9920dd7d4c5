//! Core data model types for quizlens.
//!
//! A [`Quiz`] owns its questions and students, a [`Student`] owns its
//! responses, and a [`Syllabus`] owns its topics. Topic references held by a
//! [`Question`] are plain names: they are never validated against a syllabus
//! and may dangle.
//!
//! None of the aggregate operations here can fail. Lookups return `None`
//! when nothing matches and averages over empty sets are `0.0`.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::TopicMapping;

/// Score percentage below which a topic is considered weak for a student.
pub const DEFAULT_WEAK_THRESHOLD: f64 = 70.0;

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, expected to be unique within a quiz.
    pub question_id: u32,
    /// The question as shown to students.
    pub question_text: String,
    /// Reference answer.
    #[serde(default)]
    pub correct_answer: String,
    /// Points available for this question.
    pub points: f64,
    /// Name of the primary syllabus topic this question tests.
    #[serde(default)]
    pub mapped_topic: Option<String>,
    /// Names of other topics the question touches.
    #[serde(default)]
    pub secondary_topics: Vec<String>,
}

impl Question {
    pub fn new(
        question_id: u32,
        question_text: impl Into<String>,
        correct_answer: impl Into<String>,
        points: f64,
    ) -> Self {
        Self {
            question_id,
            question_text: question_text.into(),
            correct_answer: correct_answer.into(),
            points,
            mapped_topic: None,
            secondary_topics: Vec::new(),
        }
    }

    /// Set the primary topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.mapped_topic = Some(topic.into());
        self
    }

    /// Copy a mapper's result onto this question.
    ///
    /// Topic names are taken as-is; nothing checks that they exist in a
    /// syllabus.
    pub fn apply_mapping(&mut self, mapping: &TopicMapping) {
        self.mapped_topic = Some(mapping.primary_topic.clone());
        self.secondary_topics = mapping.secondary_topics.clone();
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mapped_topic {
            Some(topic) => write!(f, "Q{} [{}]", self.question_id, topic),
            None => write!(f, "Q{} [unmapped]", self.question_id),
        }
    }
}

/// A student's answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentResponse {
    /// The question this answers, by id.
    pub question_id: u32,
    /// What the student wrote.
    #[serde(default)]
    pub response_text: String,
    /// Points awarded.
    pub points_earned: f64,
    /// Whether the answer was marked correct.
    #[serde(default)]
    pub is_correct: bool,
}

impl StudentResponse {
    pub fn new(question_id: u32, response_text: impl Into<String>, points_earned: f64) -> Self {
        Self {
            question_id,
            response_text: response_text.into(),
            points_earned,
            is_correct: false,
        }
    }

    /// Mark the response as correct or incorrect.
    pub fn correct(mut self, is_correct: bool) -> Self {
        self.is_correct = is_correct;
        self
    }

    /// Percentage of `question.points` earned by this response.
    ///
    /// Zero-point questions yield `0.0`. The result is not clamped, so
    /// over-awarded responses show up as values above 100.
    pub fn score_percentage(&self, question: &Question) -> f64 {
        if question.points == 0.0 {
            return 0.0;
        }
        self.points_earned / question.points * 100.0
    }
}

/// A student and their responses for one quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Identifier, expected to be unique within a quiz.
    pub student_id: String,
    pub name: String,
    /// Cohort label, e.g. "Section A".
    pub section: String,
    #[serde(default)]
    pub responses: Vec<StudentResponse>,
}

impl Student {
    pub fn new(
        student_id: impl Into<String>,
        name: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
            section: section.into(),
            responses: Vec::new(),
        }
    }

    pub fn add_response(&mut self, response: StudentResponse) {
        self.responses.push(response);
    }

    /// Builder form of [`Student::add_response`].
    pub fn with_response(mut self, response: StudentResponse) -> Self {
        self.responses.push(response);
        self
    }
}

fn default_date() -> DateTime<Utc> {
    Utc::now()
}

/// One quiz instance: its questions and the students who took it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub name: String,
    pub course_name: String,
    /// When the quiz was given. Defaults to the time of creation.
    #[serde(default = "default_date")]
    pub date: DateTime<Utc>,
    /// Questions in insertion order.
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Students in insertion order.
    #[serde(default)]
    pub students: Vec<Student>,
}

impl Quiz {
    /// Create an empty quiz dated now.
    pub fn new(name: impl Into<String>, course_name: impl Into<String>) -> Self {
        Self::with_date(name, course_name, Utc::now())
    }

    pub fn with_date(
        name: impl Into<String>,
        course_name: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            course_name: course_name.into(),
            date,
            questions: Vec::new(),
            students: Vec::new(),
        }
    }

    /// Append a question. Duplicate ids are accepted.
    pub fn add_question(&mut self, question: Question) {
        self.questions.push(question);
    }

    /// Append a student. Duplicate ids are accepted.
    pub fn add_student(&mut self, student: Student) {
        self.students.push(student);
    }

    /// First question with the given id.
    pub fn question_by_id(&self, question_id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }

    /// First student with the given id.
    pub fn student_by_id(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.student_id == student_id)
    }

    /// Sum of points earned over every recorded response, including
    /// responses whose question is not part of this quiz.
    pub fn student_total_score(&self, student: &Student) -> f64 {
        student.responses.iter().map(|r| r.points_earned).sum()
    }

    /// Points available across the whole quiz.
    ///
    /// This is the same for every student: skipped questions still count
    /// toward the total.
    pub fn student_total_possible(&self) -> f64 {
        self.questions.iter().map(|q| q.points).sum()
    }

    /// Overall percentage for a student, `0.0` if the quiz has no points.
    pub fn student_percentage(&self, student: &Student) -> f64 {
        let total = self.student_total_possible();
        if total == 0.0 {
            return 0.0;
        }
        self.student_total_score(student) / total * 100.0
    }

    /// Topics where one of the student's responses scored strictly below
    /// `threshold` percent.
    ///
    /// Responses to unknown questions and questions without a mapped topic
    /// are ignored. The set has no meaningful iteration order.
    pub fn student_weak_topics(&self, student: &Student, threshold: f64) -> HashSet<String> {
        let mut weak = HashSet::new();
        for response in &student.responses {
            let Some(question) = self.question_by_id(response.question_id) else {
                continue;
            };
            let Some(topic) = &question.mapped_topic else {
                continue;
            };
            if response.score_percentage(question) < threshold {
                weak.insert(topic.clone());
            }
        }
        weak
    }

    /// [`Quiz::student_weak_topics`] at [`DEFAULT_WEAK_THRESHOLD`].
    pub fn student_weak_topics_default(&self, student: &Student) -> HashSet<String> {
        self.student_weak_topics(student, DEFAULT_WEAK_THRESHOLD)
    }

    /// Mean student percentage, `0.0` with no students.
    pub fn class_average(&self) -> f64 {
        self.average_percentage(self.students.iter())
    }

    /// Students whose section matches exactly (case-sensitive).
    pub fn students_by_section(&self, section: &str) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| s.section == section)
            .collect()
    }

    /// Mean student percentage within one section, `0.0` if it is empty.
    pub fn section_average(&self, section: &str) -> f64 {
        self.average_percentage(self.students.iter().filter(|s| s.section == section))
    }

    /// Distinct section labels. Iteration order is unspecified.
    pub fn all_sections(&self) -> HashSet<String> {
        self.students.iter().map(|s| s.section.clone()).collect()
    }

    fn average_percentage<'a>(&self, students: impl Iterator<Item = &'a Student>) -> f64 {
        let (sum, count) = students.fold((0.0, 0usize), |(sum, count), s| {
            (sum + self.student_percentage(s), count + 1)
        });
        if count == 0 {
            return 0.0;
        }
        sum / count as f64
    }
}

impl fmt::Display for Quiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} questions, {} students",
            self.name,
            self.course_name,
            self.questions.len(),
            self.students.len()
        )
    }
}

/// A course topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Week of the course the topic is taught in.
    #[serde(default)]
    pub week: Option<u32>,
    #[serde(default)]
    pub subtopics: Vec<String>,
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            week: None,
            subtopics: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_week(mut self, week: u32) -> Self {
        self.week = Some(week);
        self
    }

    pub fn with_subtopics<I, S>(mut self, subtopics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtopics = subtopics.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive substring search over the name, then the
    /// description, then each subtopic.
    pub fn contains_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();

        if self.name.to_lowercase().contains(&keyword) {
            return true;
        }

        if let Some(description) = &self.description {
            if description.to_lowercase().contains(&keyword) {
                return true;
            }
        }

        self.subtopics
            .iter()
            .any(|sub| sub.to_lowercase().contains(&keyword))
    }
}

/// A course syllabus: an ordered list of topics plus the source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Syllabus {
    pub course_name: String,
    #[serde(default)]
    pub course_code: String,
    /// Topics in insertion order. Duplicate names are allowed.
    #[serde(default)]
    pub topics: Vec<Topic>,
    /// The original syllabus text.
    #[serde(default)]
    pub raw_text: String,
}

impl Syllabus {
    pub fn new(course_name: impl Into<String>, course_code: impl Into<String>) -> Self {
        Self {
            course_name: course_name.into(),
            course_code: course_code.into(),
            topics: Vec::new(),
            raw_text: String::new(),
        }
    }

    /// Append a topic. Duplicate names are accepted.
    pub fn add_topic(&mut self, topic: Topic) {
        self.topics.push(topic);
    }

    /// First topic whose name equals `name`, ignoring case.
    pub fn topic_by_name(&self, name: &str) -> Option<&Topic> {
        let name = name.to_lowercase();
        self.topics.iter().find(|t| t.name.to_lowercase() == name)
    }

    /// Topics matching `keyword`, in insertion order.
    pub fn search_topics(&self, keyword: &str) -> Vec<&Topic> {
        self.topics
            .iter()
            .filter(|t| t.contains_keyword(keyword))
            .collect()
    }

    /// Topic names in insertion order, duplicates included.
    pub fn all_topic_names(&self) -> Vec<String> {
        self.topics.iter().map(|t| t.name.clone()).collect()
    }
}

impl fmt::Display for Syllabus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.course_code.is_empty() {
            write!(f, "{}: {} topics", self.course_name, self.topics.len())
        } else {
            write!(
                f,
                "{} {}: {} topics",
                self.course_code,
                self.course_name,
                self.topics.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u32, points: f64, topic: Option<&str>) -> Question {
        let q = Question::new(id, format!("Question {id}"), "answer", points);
        match topic {
            Some(t) => q.with_topic(t),
            None => q,
        }
    }

    fn scored_student(id: &str, section: &str, earned: &[(u32, f64)]) -> Student {
        let mut s = Student::new(id, format!("Student {id}"), section);
        for &(qid, pts) in earned {
            s.add_response(StudentResponse::new(qid, "", pts));
        }
        s
    }

    fn recursion_arrays_quiz() -> Quiz {
        let mut quiz = Quiz::new("Midterm", "CS 101");
        quiz.add_question(question(1, 10.0, Some("Recursion")));
        quiz.add_question(question(2, 10.0, Some("Arrays")));
        quiz
    }

    #[test]
    fn score_percentage_zero_points_is_zero() {
        let q = question(1, 0.0, None);
        assert_eq!(StudentResponse::new(1, "", 5.0).score_percentage(&q), 0.0);
        assert_eq!(StudentResponse::new(1, "", 0.0).score_percentage(&q), 0.0);
    }

    #[test]
    fn score_percentage_is_not_clamped() {
        let q = question(1, 4.0, None);
        let pct = StudentResponse::new(1, "", 6.0).score_percentage(&q);
        assert!((pct - 150.0).abs() < 1e-9);
    }

    #[test]
    fn student_percentage_and_weak_topics_example() {
        let mut quiz = recursion_arrays_quiz();
        quiz.add_student(scored_student("S1", "A", &[(1, 4.0), (2, 9.0)]));

        let s1 = quiz.student_by_id("S1").unwrap();
        assert!((quiz.student_total_score(s1) - 13.0).abs() < 1e-9);
        assert!((quiz.student_total_possible() - 20.0).abs() < 1e-9);
        assert!((quiz.student_percentage(s1) - 65.0).abs() < 1e-9);

        let weak = quiz.student_weak_topics(s1, 70.0);
        assert_eq!(weak, HashSet::from(["Recursion".to_string()]));
        assert_eq!(quiz.student_weak_topics_default(s1), weak);
    }

    #[test]
    fn skipped_questions_still_count_toward_possible() {
        let mut quiz = recursion_arrays_quiz();
        quiz.add_student(scored_student("S1", "A", &[(1, 10.0)]));
        let s1 = &quiz.students[0];
        assert!((quiz.student_percentage(s1) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn total_score_includes_dangling_responses() {
        let mut quiz = recursion_arrays_quiz();
        quiz.add_student(scored_student("S1", "A", &[(1, 5.0), (99, 3.0)]));
        let s1 = &quiz.students[0];
        assert!((quiz.student_total_score(s1) - 8.0).abs() < 1e-9);
        // the dangling response is ignored for weak topics
        assert_eq!(
            quiz.student_weak_topics(s1, 70.0),
            HashSet::from(["Recursion".to_string()])
        );
    }

    #[test]
    fn percentage_with_no_points_possible_is_zero() {
        let mut quiz = Quiz::new("Empty", "CS 101");
        quiz.add_question(question(1, 0.0, None));
        quiz.add_student(scored_student("S1", "A", &[(1, 3.0)]));
        assert_eq!(quiz.student_percentage(&quiz.students[0]), 0.0);
    }

    #[test]
    fn weak_topics_skip_unmapped_and_passing() {
        let mut quiz = Quiz::new("Quiz", "CS 101");
        quiz.add_question(question(1, 10.0, None));
        quiz.add_question(question(2, 10.0, Some("Loops")));
        quiz.add_question(question(3, 10.0, Some("Strings")));
        quiz.add_student(scored_student("S1", "A", &[(1, 0.0), (2, 7.0), (3, 6.9)]));

        let weak = quiz.student_weak_topics(&quiz.students[0], 70.0);
        assert_eq!(weak, HashSet::from(["Strings".to_string()]));
    }

    #[test]
    fn weak_topics_are_deduplicated() {
        let mut quiz = Quiz::new("Quiz", "CS 101");
        quiz.add_question(question(1, 10.0, Some("Pointers")));
        quiz.add_question(question(2, 10.0, Some("Pointers")));
        quiz.add_student(scored_student("S1", "A", &[(1, 1.0), (2, 2.0)]));

        let weak = quiz.student_weak_topics(&quiz.students[0], 70.0);
        assert_eq!(weak.len(), 1);
        assert!(weak.contains("Pointers"));
    }

    #[test]
    fn class_average_with_no_students_is_zero() {
        let quiz = recursion_arrays_quiz();
        assert_eq!(quiz.class_average(), 0.0);
        assert!(quiz.all_sections().is_empty());
    }

    #[test]
    fn class_and_section_averages() {
        let mut quiz = recursion_arrays_quiz();
        quiz.add_student(scored_student("S1", "A", &[(1, 10.0), (2, 10.0)]));
        quiz.add_student(scored_student("S2", "B", &[(1, 5.0), (2, 5.0)]));

        assert!((quiz.class_average() - 75.0).abs() < 1e-9);
        assert!((quiz.section_average("A") - 100.0).abs() < 1e-9);
        assert!((quiz.section_average("B") - 50.0).abs() < 1e-9);
        assert_eq!(quiz.section_average("C"), 0.0);
        assert_eq!(
            quiz.all_sections(),
            HashSet::from(["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn section_match_is_case_sensitive() {
        let mut quiz = recursion_arrays_quiz();
        quiz.add_student(scored_student("S1", "Section A", &[(1, 10.0)]));
        assert_eq!(quiz.students_by_section("Section A").len(), 1);
        assert!(quiz.students_by_section("section a").is_empty());
    }

    #[test]
    fn lookups_return_first_match() {
        let mut quiz = Quiz::new("Quiz", "CS 101");
        quiz.add_question(question(1, 10.0, Some("First")));
        quiz.add_question(question(1, 5.0, Some("Second")));
        quiz.add_student(Student::new("S1", "Ada", "A"));
        quiz.add_student(Student::new("S1", "Grace", "B"));

        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(
            quiz.question_by_id(1).unwrap().mapped_topic.as_deref(),
            Some("First")
        );
        assert_eq!(quiz.student_by_id("S1").unwrap().name, "Ada");
        assert!(quiz.question_by_id(7).is_none());
        assert!(quiz.student_by_id("nobody").is_none());
    }

    #[test]
    fn apply_mapping_copies_topics() {
        let mut q = question(1, 5.0, None);
        q.apply_mapping(&TopicMapping {
            primary_topic: "Not In Syllabus".into(),
            secondary_topics: vec!["Loops".into()],
            confidence: 0.4,
        });
        assert_eq!(q.mapped_topic.as_deref(), Some("Not In Syllabus"));
        assert_eq!(q.secondary_topics, vec!["Loops"]);
    }

    #[test]
    fn topic_keyword_search_order() {
        let topic = Topic::new("Control Flow")
            .with_description("Branching and iteration")
            .with_subtopics(["If Statements", "For Loops"]);
        assert!(topic.contains_keyword("control"));
        assert!(topic.contains_keyword("ITERATION"));
        assert!(topic.contains_keyword("loop"));
        assert!(!topic.contains_keyword("recursion"));
    }

    #[test]
    fn syllabus_lookup_is_case_insensitive() {
        let mut syllabus = Syllabus::new("Intro to Programming", "CS 101");
        syllabus.add_topic(Topic::new("Functions").with_week(3));
        syllabus.add_topic(Topic::new("functions").with_week(9));

        let found = syllabus.topic_by_name("FUNCTIONS").unwrap();
        assert_eq!(found.week, Some(3));
        assert!(syllabus.topic_by_name("Func").is_none());
        assert_eq!(syllabus.all_topic_names(), vec!["Functions", "functions"]);
    }

    #[test]
    fn search_topics_matches_subtopics_in_order() {
        let mut syllabus = Syllabus::new("Intro to Programming", "CS 101");
        syllabus.add_topic(Topic::new("Iteration").with_subtopics(["For Loops", "While"]));
        syllabus.add_topic(Topic::new("Data Types"));
        syllabus.add_topic(Topic::new("Loop Invariants"));

        let hits: Vec<&str> = syllabus
            .search_topics("loop")
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(hits, vec!["Iteration", "Loop Invariants"]);
    }

    #[test]
    fn quiz_serde_defaults() {
        let json = r#"{"name": "Quiz 1", "course_name": "CS 101"}"#;
        let quiz: Quiz = serde_json::from_str(json).unwrap();
        assert!(quiz.questions.is_empty());
        assert!(quiz.students.is_empty());
        assert_eq!(quiz.to_string(), "Quiz 1 (CS 101): 0 questions, 0 students");
    }
}
