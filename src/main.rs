use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod averages;
mod models;
mod report;
mod store;
mod tracker;

use averages::AggregationOutcome;
use store::TableStore;
use tracker::Tracker;

#[derive(Parser)]
#[command(name = "behavior-tracker")]
#[command(about = "Single-user behavior score tracker with derived progress averages", long_about = None)]
struct Cli {
    /// Directory holding the CSV tables
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and any missing table files
    Init,
    /// Load realistic seed data
    Seed,
    /// Register a new subject
    AddSubject { label: String },
    /// Define a behavior to score for a subject
    AddBehavior {
        #[arg(long)]
        subject: i64,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Log a daily 1-10 score for a behavior definition
    LogScore {
        #[arg(long)]
        definition: i64,
        #[arg(long)]
        score: i32,
        /// Date of the observation (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Recompute the weekly, monthly and semi-annual average tables
    Calculate,
    /// Generate a progress report from the stored average tables
    Report {
        #[arg(long)]
        definition: Option<i64>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Copy, Clone, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let store = TableStore::open(&cli.data_dir)
        .with_context(|| format!("failed to open table store at {}", cli.data_dir.display()))?;
    let tracker = Tracker::new(store);

    match cli.command {
        Commands::Init => {
            println!("Tables ready under {}.", cli.data_dir.display());
        }
        Commands::Seed => {
            let summary = tracker::seed(&tracker)?;
            println!(
                "Seed data inserted: {} subjects, {} behaviors, {} scores.",
                summary.subjects, summary.definitions, summary.scores
            );
        }
        Commands::AddSubject { label } => {
            let subject = tracker.add_subject(&label)?;
            println!(
                "Added subject {} (id {}).",
                subject.subject_label, subject.subject_id
            );
        }
        Commands::AddBehavior {
            subject,
            name,
            description,
        } => {
            let definition = tracker.add_behavior_definition(subject, &name, &description)?;
            println!(
                "Defined behavior {} (id {}) for subject {}.",
                definition.behavior_name, definition.definition_id, definition.subject_id
            );
        }
        Commands::LogScore {
            definition,
            score,
            date,
            notes,
        } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let entry = tracker.log_score(definition, date, score, &notes)?;
            println!(
                "Logged score {} for definition {} on {}.",
                entry.score, entry.definition_id, entry.date
            );
        }
        Commands::Calculate => match averages::recalculate(tracker.store())? {
            AggregationOutcome::EmptyLog => {
                println!("No daily scores logged yet; average tables left unchanged.");
            }
            AggregationOutcome::Completed(summary) => {
                println!(
                    "Averages recalculated: {} weekly, {} monthly, {} semi-annual rows.",
                    summary.weekly_rows, summary.monthly_rows, summary.semi_annual_rows
                );
                for table in &summary.failed_tables {
                    eprintln!(
                        "warning: table `{table}` could not be saved; its previous contents were kept"
                    );
                }
            }
        },
        Commands::Report {
            definition,
            format,
            out,
        } => {
            let subjects = tracker.subjects()?;
            let definitions = tracker.definitions()?;
            let weekly = tracker.weekly_averages()?;
            let monthly = tracker.monthly_averages()?;
            let semi_annual = tracker.semi_annual_averages()?;

            let progress = report::build_progress(
                &subjects,
                &definitions,
                &weekly,
                &monthly,
                &semi_annual,
                definition,
            );
            let output = match format {
                ReportFormat::Markdown => report::to_markdown(&progress),
                ReportFormat::Json => report::to_json(&progress)?,
            };

            std::fs::write(&out, output)
                .with_context(|| format!("failed to write report to {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
