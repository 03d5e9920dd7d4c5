//! Offline, rule-based topic mapper.
//!
//! Scores each topic by the words it shares with the question text. Words
//! from the topic name weigh more than subtopic words, which weigh more than
//! description words.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use quizlens_core::model::Syllabus;
use quizlens_core::traits::{TopicMapper, TopicMapping};

const NAME_WEIGHT: u32 = 3;
const SUBTOPIC_WEIGHT: u32 = 2;
const DESCRIPTION_WEIGHT: u32 = 1;
const MAX_SECONDARY: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "what", "which", "does", "how", "why", "are",
    "was", "will", "from", "into", "each", "your", "you", "its", "use", "using", "write",
    "explain", "describe", "given", "following", "return", "returns",
];

/// Maps questions by keyword overlap with the syllabus.
pub struct KeywordMapper {
    syllabus: Syllabus,
}

impl KeywordMapper {
    pub fn new(syllabus: Syllabus) -> Self {
        Self { syllabus }
    }

    /// Weighted vocabulary for one topic name. Names missing from the
    /// syllabus only contribute their own words.
    fn vocabulary(&self, topic_name: &str) -> HashMap<String, u32> {
        let mut vocab = HashMap::new();
        let mut add = |text: &str, weight: u32| {
            for word in words(text) {
                let w = vocab.entry(word).or_insert(0);
                *w = (*w).max(weight);
            }
        };

        add(topic_name, NAME_WEIGHT);
        if let Some(topic) = self.syllabus.topic_by_name(topic_name) {
            for sub in &topic.subtopics {
                add(sub, SUBTOPIC_WEIGHT);
            }
            if let Some(description) = &topic.description {
                add(description, DESCRIPTION_WEIGHT);
            }
        }
        vocab
    }

    fn score(&self, question_words: &HashSet<String>, topic_name: &str) -> u32 {
        let vocab = self.vocabulary(topic_name);
        question_words
            .iter()
            .filter_map(|w| vocab.get(w))
            .sum()
    }
}

/// Lowercased, crudely singularized words of at least three letters.
/// Stopwords are dropped before singularizing.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .map(|w| match w.strip_suffix('s') {
            Some(stem) if stem.len() >= 3 && !stem.ends_with('s') => stem.to_string(),
            _ => w,
        })
}

#[async_trait]
impl TopicMapper for KeywordMapper {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn map_question(
        &self,
        question_text: &str,
        topic_names: &[String],
    ) -> anyhow::Result<TopicMapping> {
        let question_words: HashSet<String> = words(question_text).collect();

        let mut scored: Vec<(usize, &String, u32)> = topic_names
            .iter()
            .enumerate()
            .map(|(i, name)| (i, name, self.score(&question_words, name)))
            .filter(|&(_, _, score)| score > 0)
            .collect();

        if scored.is_empty() {
            tracing::debug!("no keyword overlap for question: {question_text}");
            return Ok(TopicMapping::fallback(topic_names));
        }

        // Highest score first, syllabus order breaks ties
        scored.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

        let total: u32 = scored.iter().map(|&(_, _, s)| s).sum();
        let (_, primary, best) = scored[0];

        Ok(TopicMapping {
            primary_topic: primary.clone(),
            secondary_topics: scored
                .iter()
                .skip(1)
                .take(MAX_SECONDARY)
                .map(|&(_, name, _)| name.clone())
                .collect(),
            confidence: f64::from(best) / f64::from(total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizlens_core::model::Topic;

    fn syllabus() -> Syllabus {
        let mut s = Syllabus::new("Intro to Programming", "CS 101");
        s.add_topic(Topic::new("Variables").with_subtopics(["Types", "Assignment"]));
        s.add_topic(
            Topic::new("Control Flow")
                .with_description("Branching and iteration")
                .with_subtopics(["If statements", "For loops", "While loops"]),
        );
        s.add_topic(Topic::new("Recursion").with_subtopics(["Base cases", "Call stack"]));
        s.add_topic(Topic::new("Arrays").with_description("Indexing and iteration"));
        s
    }

    #[tokio::test]
    async fn picks_topic_by_name() {
        let s = syllabus();
        let names = s.all_topic_names();
        let mapper = KeywordMapper::new(s);

        let mapping = mapper
            .map_question("Write a recursion that sums an array", &names)
            .await
            .unwrap();
        // both names match once; syllabus order breaks the tie
        assert_eq!(mapping.primary_topic, "Recursion");
        assert_eq!(mapping.secondary_topics, vec!["Arrays"]);
        assert!((mapping.confidence - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn subtopics_outweigh_descriptions() {
        let s = syllabus();
        let names = s.all_topic_names();
        let mapper = KeywordMapper::new(s);

        let mapping = mapper
            .map_question("What is the base case of this function and what goes on the stack?", &names)
            .await
            .unwrap();
        assert_eq!(mapping.primary_topic, "Recursion");
        assert!(mapping.secondary_topics.is_empty());
        assert_eq!(mapping.confidence, 1.0);

        let mapping = mapper
            .map_question("Trace the loop iteration", &names)
            .await
            .unwrap();
        assert_eq!(mapping.primary_topic, "Control Flow");
        assert_eq!(mapping.secondary_topics, vec!["Arrays"]);
    }

    #[tokio::test]
    async fn no_overlap_falls_back() {
        let s = syllabus();
        let names = s.all_topic_names();
        let mapper = KeywordMapper::new(s);

        let mapping = mapper.map_question("Hello world", &names).await.unwrap();
        assert_eq!(mapping, TopicMapping::fallback(&names));
    }

    #[tokio::test]
    async fn unknown_topic_names_use_their_own_words() {
        let mapper = KeywordMapper::new(syllabus());
        let names = vec!["Hash Maps".to_string(), "Graphs".to_string()];
        let mapping = mapper
            .map_question("Insert a key into a hash map", &names)
            .await
            .unwrap();
        assert_eq!(mapping.primary_topic, "Hash Maps");
    }

    #[tokio::test]
    async fn shared_stopwords_do_not_match() {
        let mut s = Syllabus::new("Intro to Programming", "CS 101");
        s.add_topic(Topic::new("Variables"));
        s.add_topic(Topic::new("Sorting").with_description("This unit does comparisons"));
        let names = s.all_topic_names();
        let mapper = KeywordMapper::new(s);

        let mapping = mapper
            .map_question("What does this print?", &names)
            .await
            .unwrap();
        assert_eq!(mapping, TopicMapping::fallback(&names));
        assert_eq!(mapping.primary_topic, "Variables");
        assert_eq!(mapping.confidence, 0.0);
    }

    #[test]
    fn stopwords_are_dropped_before_singularizing() {
        let w: Vec<String> = words("What does this print").collect();
        assert_eq!(w, vec!["print"]);
    }

    #[test]
    fn words_are_normalized() {
        let w: Vec<String> = words("The Loops, arrays and class!").collect();
        assert_eq!(w, vec!["loop", "array", "class"]);
    }
}
