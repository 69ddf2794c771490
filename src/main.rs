use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

mod assemble;
mod db;
mod export;
mod gmail;
mod matcher;
mod models;
mod normalize;
mod report;
mod stats;
mod tokenize;

use gmail::InboxQuery;
use matcher::KeywordMatcher;
use models::{DownloadIntent, RawMessage};
use stats::InterestPolicy;

#[derive(Parser)]
#[command(name = "foodie-survey")]
#[command(about = "Extract and summarize Foodie survey submissions from notification emails", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("source")
        .args(["json", "db"])
        .required(true)
        .multiple(false)
))]
struct SourceArgs {
    /// Gmail API message export (array or {"messages": [...]})
    #[arg(long)]
    json: Option<PathBuf>,
    /// Read from the Postgres inbox instead
    #[arg(long)]
    db: bool,
    /// Only consider messages received in the last N days (database source)
    #[arg(long, default_value_t = 90)]
    since_days: i64,
    /// Sender addresses accepted from a JSON export
    #[arg(long = "from", value_delimiter = ',', default_values_t = InboxQuery::default().senders)]
    senders: Vec<String>,
    /// Subject fragment required in a JSON export
    #[arg(long, default_value = "New submission")]
    subject: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed submissions
    Seed,
    /// Store messages from a Gmail export in the inbox
    Import {
        #[arg(long)]
        json: PathBuf,
        #[arg(long = "from", value_delimiter = ',', default_values_t = InboxQuery::default().senders)]
        senders: Vec<String>,
        #[arg(long, default_value = "New submission")]
        subject: String,
    },
    /// Extract structured survey responses
    Extract {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, default_value = "json")]
        format: Format,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print summary statistics
    Stats {
        #[command(flatten)]
        source: SourceArgs,
        /// Download intents that count as interest
        #[arg(long, value_enum, value_delimiter = ',', default_values = ["definitely", "maybe"])]
        positive_intent: Vec<DownloadIntent>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, value_delimiter = ',', default_values = ["definitely", "maybe"])]
        positive_intent: Vec<DownloadIntent>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn read_export(path: &Path, query: &InboxQuery) -> anyhow::Result<Vec<RawMessage>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let messages = gmail::decode_export(&json, query)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    info!(count = messages.len(), path = %path.display(), "decoded export");
    Ok(messages)
}

/// Start of a look-back window of `since_days` (at least one) ending at `now`.
fn cutoff(now: DateTime<Utc>, since_days: i64) -> anyhow::Result<DateTime<Utc>> {
    Duration::try_days(since_days.max(1))
        .and_then(|window| now.checked_sub_signed(window))
        .with_context(|| format!("--since-days {since_days} is out of range"))
}

async fn load_messages(source: &SourceArgs) -> anyhow::Result<(String, Vec<RawMessage>)> {
    if let Some(path) = &source.json {
        let query = InboxQuery {
            senders: source.senders.clone(),
            subject: Some(source.subject.clone()).filter(|s| !s.is_empty()),
        };
        let messages = read_export(path, &query)?;
        return Ok((path.display().to_string(), messages));
    }

    let since = cutoff(Utc::now(), source.since_days)?;
    let pool = connect().await?;
    let messages = db::fetch_messages(&pool, since).await?;
    Ok((format!("the inbox (last {} days)", source.since_days.max(1)), messages))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let matcher = KeywordMatcher::new();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            let inserted = db::seed(&pool).await?;
            println!("Seed data inserted ({inserted} new messages).");
        }
        Commands::Import {
            json,
            senders,
            subject,
        } => {
            let query = InboxQuery {
                senders,
                subject: Some(subject).filter(|s| !s.is_empty()),
            };
            let messages = read_export(&json, &query)?;
            let pool = connect().await?;
            let inserted = db::store_messages(&pool, &messages).await?;
            println!("Inserted {inserted} messages from {}.", json.display());
        }
        Commands::Extract {
            source,
            format,
            out,
        } => {
            let (_, messages) = load_messages(&source).await?;
            let records = assemble::extract_batch(&messages, &matcher);

            let writer: Box<dyn io::Write> = match &out {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path)
                        .with_context(|| format!("failed to create {}", path.display()))?,
                )),
                None => Box::new(io::stdout().lock()),
            };
            match format {
                Format::Json => export::write_json(&records, writer)?,
                Format::Csv => export::write_csv(&records, writer)?,
            }

            if let Some(path) = out {
                println!(
                    "Wrote {} responses ({} messages scanned) to {}.",
                    records.len(),
                    messages.len(),
                    path.display()
                );
            }
        }
        Commands::Stats {
            source,
            positive_intent,
        } => {
            let (_, messages) = load_messages(&source).await?;
            let records = assemble::extract_batch(&messages, &matcher);
            let stats = stats::aggregate(&records, &InterestPolicy::new(positive_intent));

            if stats.total_responses == 0 {
                println!("No survey responses found.");
                return Ok(());
            }

            println!("Survey responses: {}", stats.total_responses);
            println!("- download interest {}%", stats.download_interest_percent);
            println!("- average utility {:.1}", stats.average_utility);
            println!("- received today {}", stats.today_responses);
            for entry in &stats.download_breakdown {
                println!("- {}: {}", entry.label, entry.count);
            }
        }
        Commands::Report {
            source,
            positive_intent,
            out,
        } => {
            let (label, messages) = load_messages(&source).await?;
            let records = assemble::extract_batch(&messages, &matcher);
            let stats = stats::aggregate(&records, &InterestPolicy::new(positive_intent));
            let report = report::build_report(&label, Utc::now(), &stats, &records);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
