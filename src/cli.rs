//! Command line entry points for the review pipeline.
//!
//! Each stage can run on its own (`stage`, `preprocess`, `finalize`,
//! `import`) or chained end to end with `run`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::csv_files::ensure_csv_path;
use crate::db::Database;
use crate::db_storage::ReviewStorage;
use crate::finalize::finalize_file;
use crate::importer::{read_import_records, ImportOutcome, ImportRecord};
use crate::memory::MemoryStore;
use crate::pipeline::PipelineRun;
use crate::preprocess::preprocess_file;
use crate::staging::{load_scraped_reviews, stage_reviews};

#[derive(Parser)]
#[command(name = "review-pipeline")]
#[command(version, about = "Stage, clean and import scraped Google Maps reviews", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write scraped reviews to a raw CSV
    Stage {
        /// JSON array of scraped reviews
        #[arg(value_name = "REVIEWS")]
        reviews: PathBuf,

        /// Business address as shown on the listing
        #[arg(short, long)]
        address: String,

        /// Directory for the raw CSV
        #[arg(short, long, default_value = "scraped_data/raw")]
        out_dir: PathBuf,

        /// File name; defaults to google_maps_<timestamp>.csv
        #[arg(short, long)]
        file_name: Option<String>,
    },

    /// Strip emojis and non-digit rating characters
    Preprocess {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Split names, addresses and sub-category ratings into columns
    Finalize {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Import a final CSV into the database
    Import {
        /// Final CSV produced by `finalize`
        #[arg(value_name = "FILE")]
        file_path: PathBuf,

        /// Business the reviews belong to, e.g. "Starbucks"
        #[arg(short, long)]
        business_name: String,

        /// Where the reviews were scraped from, e.g. "Google Maps"
        #[arg(short, long)]
        source: String,

        /// Import into an in-memory store instead of Postgres
        #[arg(long)]
        dry_run: bool,
    },

    /// Stage, preprocess, finalize and import in one go
    Run {
        /// JSON array of scraped reviews
        #[arg(value_name = "REVIEWS")]
        reviews: PathBuf,

        #[arg(short, long)]
        address: String,

        #[arg(short, long)]
        business_name: String,

        #[arg(short, long, default_value = "google maps")]
        source: String,

        /// Root for the raw/, processed/ and final/ directories
        #[arg(long, env = "REVIEW_DATA_DIR", default_value = "scraped_data")]
        data_dir: PathBuf,

        #[arg(long)]
        dry_run: bool,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Stage {
            reviews,
            address,
            out_dir,
            file_name,
        } => {
            let run = PipelineRun::new("stage");
            let scraped = load_scraped_reviews(&reviews)?;
            let path = stage_reviews(&run, &address, &scraped, &out_dir, file_name.as_deref())?;
            println!("{}", path.display());
        }

        Commands::Preprocess { input, output } => {
            let run = PipelineRun::new("preprocess");
            let rows = preprocess_file(&run, &input, &output)?;
            println!("Pre-processed {} rows -> {}", rows, output.display());
        }

        Commands::Finalize { input, output } => {
            let run = PipelineRun::new("finalize");
            let rows = finalize_file(&run, &input, &output)?;
            println!("Finalized {} rows -> {}", rows, output.display());
        }

        Commands::Import {
            file_path,
            business_name,
            source,
            dry_run,
        } => {
            let run = PipelineRun::new("import");
            ensure_csv_path(&file_path)?;
            let records = read_import_records(&file_path)
                .with_context(|| format!("reading {}", file_path.display()))?;

            let outcome = import(&run, &business_name, &source, &records, dry_run).await?;
            println!("{}", outcome);
        }

        Commands::Run {
            reviews,
            address,
            business_name,
            source,
            data_dir,
            dry_run,
        } => {
            let run = PipelineRun::new("run");
            let outcome = run_all(
                &run,
                &reviews,
                &address,
                &business_name,
                &source,
                &data_dir,
                dry_run,
            )
            .await?;
            println!("{}", outcome);
        }
    }

    Ok(())
}

/// Full pipeline. Intermediate files share one name across
/// `raw/`, `processed/` and `final/` under `data_dir`.
pub async fn run_all(
    run: &PipelineRun,
    reviews: &Path,
    address: &str,
    business_name: &str,
    source: &str,
    data_dir: &Path,
    dry_run: bool,
) -> anyhow::Result<ImportOutcome> {
    let scraped = load_scraped_reviews(reviews)?;
    let raw = stage_reviews(run, address, &scraped, &data_dir.join("raw"), None)?;

    let file_name = raw
        .file_name()
        .context("staged file has no name")?
        .to_owned();
    let processed = data_dir.join("processed").join(&file_name);
    let finalized = data_dir.join("final").join(&file_name);

    preprocess_file(run, &raw, &processed)?;
    finalize_file(run, &processed, &finalized)?;

    let records = read_import_records(&finalized)?;
    import(run, business_name, source, &records, dry_run).await
}

async fn import(
    run: &PipelineRun,
    business_name: &str,
    source: &str,
    records: &[ImportRecord],
    dry_run: bool,
) -> anyhow::Result<ImportOutcome> {
    if dry_run {
        tracing::info!(run_id = %run.run_id(), "Dry run: importing into memory");
        let mut store = MemoryStore::new();
        return Ok(store.import_reviews(business_name, source, records).await?);
    }

    let config = Config::from_env()?;
    let db = Database::connect_and_migrate(&config.database_url, config.max_connections).await?;
    let storage = ReviewStorage::new(db.pool.clone());

    let outcome = storage
        .import_reviews(run, business_name, source, records)
        .await?;
    db.pool.close().await;
    Ok(outcome)
}
