use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod allocation;
mod db;
mod depletion;
mod error;
mod forecast;
mod loader;
mod models;
mod report;
mod risk;
mod service_hours;

use models::{ForecastPoint, ParticipantRecord};

#[derive(Parser)]
#[command(name = "support-coordination-portfolio")]
#[command(about = "Funding runway, risk and staffing analytics for a support coordination portfolio", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Participant file (.csv or .xlsx); reads from the database when omitted
    #[arg(long, alias = "csv")]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct Thresholds {
    /// Funding alert threshold (%)
    #[arg(long, default_value_t = 20.0)]
    funding_threshold: f64,
    /// Service hours alert threshold (%)
    #[arg(long, default_value_t = 15.0)]
    service_hours_threshold: f64,
}

#[derive(Args)]
struct Horizon {
    #[arg(
        long,
        default_value_t = 90,
        value_parser = clap::value_parser!(u32).range(
            forecast::MIN_FORECAST_DAYS as i64..=forecast::MAX_FORECAST_DAYS as i64
        )
    )]
    forecast_days: u32,
    /// Fix the forecast noise for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a sample portfolio
    Seed,
    /// Validate a participant file (.csv or .xlsx) and store it
    Import {
        #[arg(long, alias = "csv")]
        file: PathBuf,
    },
    /// Days until each participant's funding runs out
    Depletion {
        #[command(flatten)]
        source: Source,
    },
    /// Score and classify participant risk
    Risk {
        #[command(flatten)]
        source: Source,
        #[command(flatten)]
        thresholds: Thresholds,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Recommend coordinator staffing by complexity
    Allocate {
        #[command(flatten)]
        source: Source,
    },
    /// Project portfolio expenditure
    Forecast {
        #[command(flatten)]
        source: Source,
        #[command(flatten)]
        horizon: Horizon,
    },
    /// Write the full dashboard as markdown
    Dashboard {
        #[command(flatten)]
        source: Source,
        #[command(flatten)]
        thresholds: Thresholds,
        #[command(flatten)]
        horizon: Horizon,
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
    /// Export the one-row portfolio summary
    Report {
        #[command(flatten)]
        source: Source,
        #[command(flatten)]
        thresholds: Thresholds,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Also store the summary in the database
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "support_coordination_portfolio=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let written = db::seed(&connect().await?).await?;
            println!("Seeded {written} participants.");
        }
        Commands::Import { file } => {
            let records = read_file(&file)?;
            let written = db::import_participants(&connect().await?, &records).await?;
            println!("Imported {written} participants from {}.", file.display());
        }
        Commands::Depletion { source } => {
            let records = load(&source).await?;
            if records.is_empty() {
                println!("No participants loaded.");
                return Ok(());
            }

            println!("Days until funding depletion:");
            for estimate in depletion::estimate_depletion(&records) {
                println!(
                    "- {}: {:.0} days",
                    estimate.participant_id, estimate.days_until_depletion
                );
            }
        }
        Commands::Risk {
            source,
            thresholds,
            limit,
        } => {
            let records = load(&source).await?;
            let mut assessments = risk::assess_risk(
                &records,
                thresholds.funding_threshold,
                thresholds.service_hours_threshold,
            )?;

            if assessments.is_empty() {
                println!("No participants loaded.");
                return Ok(());
            }

            assessments.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
            println!("Top participants by risk score:");
            for assessment in assessments.iter().take(limit) {
                println!(
                    "- {} {} score {:.2}{}",
                    assessment.participant_id,
                    assessment.risk_level,
                    assessment.risk_score,
                    if assessment.clamped { " (clamped)" } else { "" }
                );
            }
        }
        Commands::Allocate { source } => {
            let records = load(&source).await?;
            println!("Coordinator allocation across {} participants:", records.len());
            for recommendation in allocation::recommend_allocation(&records) {
                println!(
                    "- {} complexity: {} participants, {} coordinators",
                    recommendation.complexity_level,
                    recommendation.participant_count,
                    recommendation.recommended_coordinators
                );
            }
        }
        Commands::Forecast { source, horizon } => {
            let records = load(&source).await?;
            let points = run_forecast(&records, &horizon, today());
            println!("date,predicted_expenditure");
            for point in points {
                println!("{},{:.2}", point.date, point.predicted_expenditure);
            }
        }
        Commands::Dashboard {
            source,
            thresholds,
            horizon,
            out,
        } => {
            let records = load(&source).await?;
            let thresholds = risk::RiskThresholds::new(
                thresholds.funding_threshold,
                thresholds.service_hours_threshold,
            )?;
            let generated_on = today();
            let assessments: Vec<_> = records
                .iter()
                .map(|record| risk::assess_record(record, &thresholds))
                .collect();

            let dashboard = report::build_dashboard(
                &records,
                &depletion::estimate_depletion(&records),
                &assessments,
                &thresholds,
                &run_forecast(&records, &horizon, generated_on),
                &allocation::recommend_allocation(&records),
                generated_on,
            );
            std::fs::write(&out, dashboard)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Dashboard written to {}.", out.display());
        }
        Commands::Report {
            source,
            thresholds,
            out_dir,
            save,
        } => {
            let records = load(&source).await?;
            let assessments = risk::assess_risk(
                &records,
                thresholds.funding_threshold,
                thresholds.service_hours_threshold,
            )?;
            let generated_on = today();
            let summary = report::summarize(
                &records,
                &assessments,
                &allocation::recommend_allocation(&records),
                generated_on,
            );

            let path = out_dir.join(report::report_filename(generated_on));
            let file = std::fs::File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            report::write_summary_csv(&summary, file)?;
            tracing::info!(path = %path.display(), "report exported");
            println!("Report written to {}.", path.display());

            if save {
                let id = db::save_snapshot(&connect().await?, &summary).await?;
                println!("Snapshot stored as {id}.");
            }
        }
    }

    Ok(())
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

/// Fresh snapshot of participant records for one command.
async fn load(source: &Source) -> anyhow::Result<Vec<ParticipantRecord>> {
    match &source.file {
        Some(path) => read_file(path),
        None => db::fetch_participants(&connect().await?).await,
    }
}

fn read_file(path: &Path) -> anyhow::Result<Vec<ParticipantRecord>> {
    loader::load_file(path).with_context(|| format!("failed to load {}", path.display()))
}

fn run_forecast(
    records: &[ParticipantRecord],
    horizon: &Horizon,
    start: NaiveDate,
) -> Vec<ForecastPoint> {
    let days = horizon.forecast_days as usize;
    match horizon.seed {
        Some(seed) => {
            forecast::generate_forecast(records, days, start, &mut ChaCha20Rng::seed_from_u64(seed))
        }
        None => forecast::generate_forecast(records, days, start, &mut rand::rng()),
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
