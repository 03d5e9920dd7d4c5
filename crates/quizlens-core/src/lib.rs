//! quizlens-core: Quiz and syllabus model, topic analytics, and mapping.
//!
//! This crate defines the quiz/syllabus data model, the aggregate statistics
//! computed over it, the ingestion loaders, and the topic-mapping seam that
//! the rest of quizlens builds on.

pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod statistics;
pub mod traits;
