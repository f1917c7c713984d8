//! Scraper output -> raw CSV, one review per row.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::csv_files::write_rows;
use crate::dates::resolve_relative_date;
use crate::errors::{AppError, ResultExt};
use crate::models::{RawReviewRow, ScrapedReview};
use crate::pipeline::PipelineRun;

/// Joins the scraper's `"Label: N"` fragments in the `category_ratings` column.
pub const CATEGORY_SEPARATOR: &str = " | ";

pub fn default_file_name(now: DateTime<Local>) -> String {
    format!("google_maps_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Load the JSON array of reviews written by the scraper.
pub fn load_scraped_reviews(path: &Path) -> Result<Vec<ScrapedReview>, AppError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&content).map_err(|e| {
        AppError::BadRequest(format!("{} is not a scraped review list: {}", path.display(), e))
    })
}

pub fn stage_row(business_address: &str, review: &ScrapedReview) -> RawReviewRow {
    RawReviewRow {
        business_address: Some(business_address.to_string()),
        review_author: review.author.clone(),
        review_date: review.date.as_deref().map(resolve_relative_date),
        review_rating: Some(review.overall_stars.to_string()),
        review_content: review.content.clone(),
        category_ratings: Some(review.category_ratings.join(CATEGORY_SEPARATOR)),
    }
}

/// Write the raw CSV into `dir` and return its path.
///
/// Without a file name a timestamped `google_maps_*.csv` is used.
pub fn stage_reviews(
    run: &PipelineRun,
    business_address: &str,
    reviews: &[ScrapedReview],
    dir: &Path,
    file_name: Option<&str>,
) -> Result<PathBuf, AppError> {
    let _enter = run.span().enter();

    let file_name = file_name
        .map(str::to_string)
        .unwrap_or_else(|| default_file_name(Local::now()));
    let path = dir.join(file_name);

    let rows: Vec<RawReviewRow> = reviews
        .iter()
        .map(|review| stage_row(business_address, review))
        .collect();
    write_rows(&path, &RawReviewRow::HEADERS, &rows)?;

    tracing::info!("Saved {} reviews to {}", rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_file_name() {
        let now = Local.with_ymd_and_hms(2025, 6, 22, 9, 5, 7).unwrap();
        assert_eq!(default_file_name(now), "google_maps_20250622_090507.csv");
    }

    #[test]
    fn test_stage_row_flattens_categories() {
        let review = ScrapedReview {
            author: Some("Jane Q Public".to_string()),
            overall_stars: 4,
            date: Some("2024-12-01".to_string()),
            content: Some("Good latte".to_string()),
            category_ratings: vec!["Food: 5".to_string(), "Service: 4".to_string()],
        };

        let row = stage_row("123 Main St, Springfield, IL 62704", &review);
        assert_eq!(row.review_rating.as_deref(), Some("4"));
        assert_eq!(row.review_date.as_deref(), Some("2024-12-01"));
        assert_eq!(row.category_ratings.as_deref(), Some("Food: 5 | Service: 4"));
    }

    #[test]
    fn test_stage_row_resolves_relative_date() {
        let review = ScrapedReview {
            date: Some("a week ago".to_string()),
            ..Default::default()
        };

        let row = stage_row("x", &review);
        let date = row.review_date.unwrap();
        assert_eq!(date.len(), 10);
        assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok());
    }
}
