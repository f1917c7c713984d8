// tests/pipeline_e2e.rs
use std::fs;
use std::path::{Path, PathBuf};

use review_pipeline::cli::run_all;
use review_pipeline::finalize::finalize_file;
use review_pipeline::importer::read_import_records;
use review_pipeline::memory::MemoryStore;
use review_pipeline::models::{FinalReviewRow, ScrapedReview};
use review_pipeline::pipeline::PipelineRun;
use review_pipeline::preprocess::preprocess_file;
use review_pipeline::staging::stage_reviews;

const ADDRESS: &str = "123 Main St, Springfield, IL 62704";

fn tmp_dir(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("review_pipeline_e2e_{}", name));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    p
}

fn scraped() -> Vec<ScrapedReview> {
    vec![
        ScrapedReview {
            author: Some("jane q public".into()),
            overall_stars: 5,
            date: Some("2025-03-01".into()),
            content: Some("Great coffee 🔥".into()),
            category_ratings: vec!["Food: 5".into(), "Service: 4".into(), "Atmosphere: 3".into()],
        },
        ScrapedReview {
            author: Some("John Smith".into()),
            overall_stars: 3,
            date: Some("2025-02-15".into()),
            content: Some("Slow line".into()),
            category_ratings: vec!["Service: 2".into()],
        },
        // Single-token author: no last name, so the review is skipped.
        ScrapedReview {
            author: Some("Solo".into()),
            overall_stars: 4,
            date: Some("2025-01-10".into()),
            content: Some("Fine".into()),
            category_ratings: vec![],
        },
    ]
}

fn stage_to_final(dir: &Path) -> PathBuf {
    let run = PipelineRun::new("e2e");
    let raw = stage_reviews(&run, ADDRESS, &scraped(), &dir.join("raw"), Some("reviews.csv")).unwrap();
    let processed = dir.join("processed").join("reviews.csv");
    let finalized = dir.join("final").join("reviews.csv");

    assert_eq!(preprocess_file(&run, &raw, &processed).unwrap(), 3);
    assert_eq!(finalize_file(&run, &processed, &finalized).unwrap(), 3);
    finalized
}

#[test]
fn final_csv_has_importer_columns() {
    let dir = tmp_dir("columns");
    let finalized = stage_to_final(&dir);

    let mut reader = csv::Reader::from_path(&finalized).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, FinalReviewRow::HEADERS);

    let rows: Vec<FinalReviewRow> = reader.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(rows[0].first_name.as_deref(), Some("Jane"));
    assert_eq!(rows[0].last_name.as_deref(), Some("Public"));
    assert_eq!(rows[0].street.as_deref(), Some("123 MAIN ST"));
    assert_eq!(rows[0].food_rating.as_deref(), Some("5"));
    assert!(!rows[0].review_content.as_deref().unwrap().contains('🔥'));
    assert_eq!(rows[1].food_rating, None);
    assert_eq!(rows[2].last_name, None);
}

#[tokio::test]
async fn staged_reviews_import_idempotently() {
    let dir = tmp_dir("import");
    let finalized = stage_to_final(&dir);
    let records = read_import_records(&finalized).unwrap();

    let mut store = MemoryStore::new();
    let first = store
        .import_reviews("Starbucks", "Google Maps", &records)
        .await
        .unwrap();

    assert_eq!(first.total, 3);
    assert_eq!(first.imported, 2);
    assert_eq!(first.skipped, 1);
    assert_eq!(first.subcategory_created, 4);
    assert!(first
        .to_string()
        .starts_with("Successfully imported 2/3 reviews AND 4 subcategory reviews"));

    let state = store.state();
    assert_eq!(state.businesses.len(), 1);
    assert_eq!(state.businesses[0].business_name, "STARBUCKS");
    assert_eq!(state.stores.len(), 1);
    assert_eq!(state.stores[0].store_id, "STARBUCKS-0001");
    assert_eq!(state.scrape_events.len(), 1);
    assert_eq!(state.scrape_events[0].source, "google maps");
    assert_eq!(state.customer_reviews.len(), 2);

    let second = store
        .import_reviews(" starbucks ", "GOOGLE MAPS", &records)
        .await
        .unwrap();

    assert_eq!(second.imported, 2);
    assert_eq!(second.reviews_created, 0);
    assert_eq!(second.subcategory_created, 0);

    let state = store.state();
    assert_eq!(state.businesses.len(), 1);
    assert_eq!(state.stores.len(), 1);
    assert_eq!(state.scrape_events.len(), 1);
    assert_eq!(state.customer_reviews.len(), 2);
    assert_eq!(state.customer_subcategory_reviews.len(), 4);
}

#[tokio::test]
async fn run_all_writes_every_stage() {
    let dir = tmp_dir("run_all");
    let reviews = dir.join("reviews.json");
    fs::write(&reviews, serde_json::to_string(&scraped()).unwrap()).unwrap();

    let run = PipelineRun::new("run");
    let data_dir = dir.join("data");
    let outcome = run_all(&run, &reviews, ADDRESS, "Starbucks", "google maps", &data_dir, true)
        .await
        .unwrap();

    assert_eq!(outcome.imported, 2);
    for stage in ["raw", "processed", "final"] {
        let files: Vec<_> = fs::read_dir(data_dir.join(stage)).unwrap().collect();
        assert_eq!(files.len(), 1, "{} should hold one csv", stage);
    }
}
