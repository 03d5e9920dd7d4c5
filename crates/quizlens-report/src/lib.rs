//! quizlens-report: rendering of analytics summaries.

pub mod html;

pub use html::{generate_html, write_html_report};
