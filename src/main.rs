use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod db;
mod error;
mod grading;
mod http;
mod models;
mod report;
mod store;

use crate::models::{ClassStats, GlobalStats};
use crate::store::GradeStore;

#[derive(Parser)]
#[command(name = "learner-grade-stats")]
#[command(about = "Weighted grade averages and pass-rate statistics for learners", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema and indexes
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import scores from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Weighted average per class for one learner
    Learner {
        #[arg(long)]
        id: i32,
    },
    /// Pass-rate statistics across all learners
    Stats,
    /// Pass-rate statistics for one class
    ClassStats {
        #[arg(long)]
        id: i32,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Serve the grade queries over HTTP
    Serve {
        #[arg(long, env = "GRADE_STATS_ADDR", default_value = "127.0.0.1:5050")]
        addr: SocketAddr,
        #[arg(long, default_value_t = 10)]
        request_timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "learner_grade_stats=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&cli.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let upserted = db::seed(&pool).await?;
            println!("Seeded {upserted} grade records.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv)
                .await
                .with_context(|| format!("failed to import {}", csv.display()))?;
            println!("Imported {inserted} scores from {}.", csv.display());
        }
        Commands::Learner { id } => {
            let store = db::PgGradeStore::new(pool);
            let records = store.records_for_learner(id).await?;
            let averages = grading::learner_class_averages(&records, id);

            if averages.is_empty() {
                println!("No scores found for learner {id}.");
                return Ok(());
            }

            println!("Weighted averages for learner {id}:");
            for average in averages.iter() {
                println!("- class {}: {:.2}", average.class_id, average.avg);
            }
        }
        Commands::Stats => {
            let store = db::PgGradeStore::new(pool);
            let records = store.all_records().await?;
            let stats: GlobalStats = grading::global_stats(&records)?.into();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::ClassStats { id } => {
            let store = db::PgGradeStore::new(pool);
            let records = store.records_for_class(id).await?;
            let stats: ClassStats = grading::class_stats(&records, id)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Report { out } => {
            let store = db::PgGradeStore::new(pool);
            let records = store.all_records().await?;
            let report = report::build_report(chrono::Utc::now(), &records);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Serve {
            addr,
            request_timeout_secs,
        } => {
            let store: Arc<dyn GradeStore> = Arc::new(db::PgGradeStore::new(pool));
            let state = Arc::new(http::AppState::new(store));
            http::serve(addr, state, Duration::from_secs(request_timeout_secs)).await?;
        }
    }

    Ok(())
}
