use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info};

mod dashboard;
mod db;
mod error;
mod loader;
mod models;
mod planner;
mod report;
mod timeline;
mod trend;
mod weak_topics;

use models::Principal;
use trend::ProbabilityCalibration;

#[derive(Parser)]
#[command(name = "learner-insights")]
#[command(about = "Student performance trends, weak topics and study plans for Group Scholar", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CalibrationArgs {
    /// Pass probability points added per point of score trend
    #[arg(long, default_value_t = 5.0)]
    slope_weight: f64,
    /// Largest shift the trend may apply to the pass probability
    #[arg(long, default_value_t = 20.0)]
    max_adjustment: f64,
}

impl CalibrationArgs {
    fn calibration(&self) -> ProbabilityCalibration {
        ProbabilityCalibration::new(self.slope_weight, self.max_adjustment)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import attempts from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the performance dashboard for a student as JSON
    Dashboard {
        #[arg(long)]
        email: String,
        #[arg(long)]
        pretty: bool,
        #[command(flatten)]
        calibration: CalibrationArgs,
    },
    /// Print the recommended study path for a student as JSON
    Plan {
        #[arg(long)]
        email: String,
        #[arg(long)]
        pretty: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[command(flatten)]
        calibration: CalibrationArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    if let Err(err) = run(cli.command, &pool).await {
        error!("command failed: {err:#}");
        return Err(err);
    }

    Ok(())
}

async fn run(command: Commands, pool: &PgPool) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(pool, &csv).await?;
            println!("Inserted {inserted} attempts from {}.", csv.display());
        }
        Commands::Dashboard {
            email,
            pretty,
            calibration,
        } => {
            let principal = authorize(pool, &email).await?;
            let loader = db::attempt_loader(pool);
            let payload =
                dashboard::load_dashboard(&loader, &principal, &calibration.calibration()).await?;
            print_json(&payload, pretty)?;
        }
        Commands::Plan { email, pretty } => {
            let principal = authorize(pool, &email).await?;
            let loader = db::attempt_loader(pool);
            let plan = dashboard::load_recommendation_path(&loader, &principal, Utc::now()).await?;
            print_json(&plan, pretty)?;
        }
        Commands::Report {
            email,
            out,
            calibration,
        } => {
            let principal = authorize(pool, &email).await?;
            let loader = db::attempt_loader(pool);
            let bundle = loader.load(principal.user_id).await?;
            let payload = dashboard::performance_dashboard(&bundle, &calibration.calibration());
            let plan = dashboard::recommendation_path(&bundle, Utc::now());
            let report = report::build_report(&principal, &payload, &plan);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Resolves the caller before any attempt data is read.
async fn authorize(pool: &PgPool, email: &str) -> anyhow::Result<Principal> {
    let principal = db::find_principal(pool, email)
        .await?
        .with_context(|| format!("unauthorized: no student is registered as {email}"))?;
    info!(user_id = %principal.user_id, "student resolved");
    Ok(principal)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
