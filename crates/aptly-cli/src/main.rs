//! aptly CLI: schedule timed assessments, take them, and read the results.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use aptly_core::model::ExamType;

mod commands;

use commands::{parse_date, parse_exam_type, parse_time};

#[derive(Parser)]
#[command(name = "aptly", version, about = "Timed aptitude exams and career recommendations")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example question banks
    Init,

    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Publish question banks, replacing the current questions of each exam type
    Import {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Inspect and edit published questions
    Questions {
        #[command(subcommand)]
        action: QuestionsAction,
    },

    /// Manage exam schedules
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Take a timed exam
    Take {
        /// career, personality or skills
        #[arg(long, value_parser = parse_exam_type)]
        exam: ExamType,

        /// Email or account id of the student
        #[arg(long)]
        user: String,

        /// Schedule to launch (defaults to the only active one for the exam)
        #[arg(long)]
        schedule: Option<Uuid>,
    },

    /// Show attempt results
    Results {
        /// Restrict to one student
        #[arg(long)]
        user: Option<String>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Also save the report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Recommend careers from a student's attempts
    Recommend {
        /// Email or account id of the student
        #[arg(long)]
        user: String,
    },

    /// Attach feedback to an attempt
    Feedback {
        #[arg(long)]
        attempt: Uuid,

        /// Feedback on the result
        #[arg(long)]
        text: String,

        /// Suggestions for the student
        #[arg(long)]
        suggestions: String,
    },
}

#[derive(Subcommand)]
pub enum QuestionsAction {
    /// List published questions
    List {
        #[arg(long, value_parser = parse_exam_type)]
        exam: ExamType,
    },

    /// Append a question, or replace the one at --index
    Add {
        #[arg(long, value_parser = parse_exam_type)]
        exam: ExamType,

        #[arg(long)]
        text: String,

        /// Answer option as "text" or "text=key:value,..." (repeatable)
        #[arg(long = "option")]
        options: Vec<String>,

        /// Position to replace (1-based)
        #[arg(long)]
        index: Option<usize>,
    },

    /// Delete the question at a position (1-based)
    Delete {
        #[arg(long, value_parser = parse_exam_type)]
        exam: ExamType,

        #[arg(long)]
        index: usize,
    },
}

#[derive(clap::Args)]
pub struct WindowArgs {
    /// career, personality or skills
    #[arg(long, value_parser = parse_exam_type)]
    pub exam: Option<ExamType>,

    /// YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<chrono::NaiveDate>,

    /// HH:MM
    #[arg(long, value_parser = parse_time)]
    pub start_time: Option<chrono::NaiveTime>,

    /// YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<chrono::NaiveDate>,

    /// HH:MM
    #[arg(long, value_parser = parse_time)]
    pub end_time: Option<chrono::NaiveTime>,

    /// Session length in minutes
    #[arg(long)]
    pub duration: Option<u32>,

    #[arg(long)]
    pub instructions: Option<String>,
}

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Create a schedule
    Create(WindowArgs),

    /// Rewrite a schedule that has not expired
    Update {
        #[arg(long)]
        id: Uuid,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// List schedules with their current status
    List,

    /// Delete a schedule
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "aptly=info".parse::<tracing_subscriber::filter::Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Import { bank } => commands::import::execute(bank, config),
        Commands::Questions { action } => commands::questions::execute(action, config),
        Commands::Schedule { action } => commands::schedule::execute(action, config),
        Commands::Take {
            exam,
            user,
            schedule,
        } => commands::take::execute(exam, user, schedule, config).await,
        Commands::Results {
            user,
            format,
            output,
        } => commands::results::execute(user, format, output, config),
        Commands::Recommend { user } => commands::recommend::execute(user, config),
        Commands::Feedback {
            attempt,
            text,
            suggestions,
        } => commands::feedback::execute(attempt, text, suggestions, config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
