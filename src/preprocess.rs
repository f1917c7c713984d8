//! Raw CSV -> processed CSV: rating cells reduced to their number, emojis
//! removed from free text.

use std::path::Path;

use crate::csv_files::{ensure_csv_path, read_rows, write_rows};
use crate::errors::AppError;
use crate::models::RawReviewRow;
use crate::normalize::{rating_number, strip_emojis};
use crate::pipeline::PipelineRun;

pub fn preprocess_row(row: RawReviewRow) -> RawReviewRow {
    RawReviewRow {
        review_rating: row.review_rating.as_deref().and_then(rating_number),
        review_author: row.review_author.map(|a| strip_emojis(&a)),
        review_content: row.review_content.map(|c| strip_emojis(&c)),
        ..row
    }
}

/// Returns the number of rows written.
pub fn preprocess_file(run: &PipelineRun, input: &Path, output: &Path) -> Result<usize, AppError> {
    let _enter = run.span().enter();
    ensure_csv_path(input)?;

    let rows: Vec<RawReviewRow> = read_rows(input)?;
    let cleaned: Vec<RawReviewRow> = rows.into_iter().map(preprocess_row).collect();
    write_rows(output, &RawReviewRow::HEADERS, &cleaned)?;

    tracing::info!(
        "Pre-processed {} rows: {} -> {}",
        cleaned.len(),
        input.display(),
        output.display()
    );
    Ok(cleaned.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_row() {
        let row = RawReviewRow {
            business_address: Some("1 Main St, Stuart, FL 34994".to_string()),
            review_author: Some("Sam 🙂 Lee".to_string()),
            review_date: Some("2025-01-01".to_string()),
            review_rating: Some("5 stars".to_string()),
            review_content: Some("Best cold brew 🔥🔥".to_string()),
            category_ratings: Some("Food: 5".to_string()),
        };

        let cleaned = preprocess_row(row.clone());
        assert_eq!(cleaned.review_rating.as_deref(), Some("5"));
        assert_eq!(cleaned.review_author.as_deref(), Some("Sam  Lee"));
        assert_eq!(cleaned.review_content.as_deref(), Some("Best cold brew "));
        assert_eq!(cleaned.business_address, row.business_address);
        assert_eq!(cleaned.category_ratings, row.category_ratings);
    }

    #[test]
    fn test_rating_without_digits_becomes_empty() {
        let row = RawReviewRow {
            review_rating: Some("n/a".to_string()),
            ..Default::default()
        };
        assert_eq!(preprocess_row(row).review_rating, None);
    }

    #[test]
    fn test_multi_number_ratings_are_not_merged() {
        let cleaned = |rating: &str| {
            preprocess_row(RawReviewRow {
                review_rating: Some(rating.to_string()),
                ..Default::default()
            })
            .review_rating
        };

        assert_eq!(cleaned("5/5"), None);
        assert_eq!(cleaned("4.5 stars").as_deref(), Some("4.5"));
        assert_eq!(cleaned("Rated 4.0").as_deref(), Some("4.0"));
    }

    #[test]
    fn test_non_csv_input_rejected() {
        let run = PipelineRun::new("preprocess");
        let err = preprocess_file(&run, Path::new("reviews.json"), Path::new("out.csv"))
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
