//! quizlens CLI: quiz analytics against a course syllabus.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "quizlens",
    version,
    about = "Quiz performance analytics mapped onto syllabus topics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// How questions get their topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MapperKind {
    /// Use the topics already in the quiz file
    None,
    /// Offline keyword matching against the syllabus
    Keyword,
    /// Ask the configured language model
    Llm,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a quiz and write reports
    Analyze {
        /// Quiz file (.toml or .json)
        #[arg(long)]
        quiz: PathBuf,

        /// Syllabus file, required for topic mapping
        #[arg(long)]
        syllabus: Option<PathBuf>,

        /// Topic mapper
        #[arg(long, value_enum, default_value = "none")]
        mapper: MapperKind,

        /// Also remap questions that already have a topic
        #[arg(long)]
        remap: bool,

        /// Weak-topic threshold in percent (default from config, 70)
        #[arg(long)]
        threshold: Option<f64>,

        /// Ask the language model for teaching recommendations
        #[arg(long)]
        recommend: bool,

        /// Output directory (default from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output formats: json, html, markdown, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Extract syllabus topics from plain text with a language model
    ExtractTopics {
        /// Plain-text syllabus
        #[arg(long)]
        syllabus_text: PathBuf,

        /// Course name
        #[arg(long)]
        course_name: String,

        /// Course code, e.g. "CS 101"
        #[arg(long, default_value = "")]
        course_code: String,

        /// Write the syllabus TOML here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show one student's results
    Student {
        /// Quiz file (.toml or .json)
        #[arg(long)]
        quiz: PathBuf,

        /// Student ID
        #[arg(long)]
        id: String,

        /// Weak-topic threshold in percent
        #[arg(long, default_value = "70")]
        threshold: f64,
    },

    /// Validate quiz and syllabus files
    Validate {
        /// Quiz file or directory
        #[arg(long)]
        quiz: PathBuf,

        /// Syllabus to check topic names against
        #[arg(long)]
        syllabus: Option<PathBuf>,
    },

    /// Create starter config and sample quiz and syllabus
    Init,
}

#[tokio::main]
async fn main() {
    let directive = "quizlens=info"
        .parse()
        .expect("static tracing directive is valid");
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            quiz,
            syllabus,
            mapper,
            remap,
            threshold,
            recommend,
            output,
            format,
            config,
        } => {
            commands::analyze::execute(
                quiz, syllabus, mapper, remap, threshold, recommend, output, format, config,
            )
            .await
        }
        Commands::ExtractTopics {
            syllabus_text,
            course_name,
            course_code,
            output,
            config,
        } => {
            commands::extract_topics::execute(syllabus_text, course_name, course_code, output, config)
                .await
        }
        Commands::Student {
            quiz,
            id,
            threshold,
        } => commands::student::execute(quiz, id, threshold),
        Commands::Validate { quiz, syllabus } => commands::validate::execute(quiz, syllabus),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
