//! Google Maps Review Pipeline Library
//!
//! Turns scraped review listings into CSV files, cleans and reshapes them,
//! and imports the result idempotently into a Postgres hierarchy of
//! businesses, stores, scrape events and reviews. A small read-only HTTP
//! API reports on the imported data.
//!
//! # Modules
//!
//! - `api`: Router assembly and middleware.
//! - `cli`: Pipeline subcommands.
//! - `config`: Configuration management.
//! - `csv_files`: CSV reading and writing helpers.
//! - `dates`: Relative review date resolution.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Postgres repository and report queries.
//! - `errors`: Error handling types.
//! - `finalize`: Processed CSV to final CSV.
//! - `handlers`: HTTP request handlers.
//! - `importer`: Batch import over a repository.
//! - `memory`: In-memory repository for dry runs and tests.
//! - `models`: Core data models.
//! - `normalize`: Field-level cleaning and splitting.
//! - `pipeline`: Per-run logging span.
//! - `preprocess`: Raw CSV to processed CSV.
//! - `repository`: Find-or-create repository trait.
//! - `schema`: Embedded migrations.
//! - `staging`: Scraper output to raw CSV.

pub mod api;
pub mod cli;
pub mod config;
pub mod csv_files;
pub mod dates;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod finalize;
pub mod handlers;
pub mod importer;
pub mod memory;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod repository;
pub mod schema;
pub mod staging;
