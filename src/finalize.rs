//! Processed CSV -> final CSV in the importer's column layout.

use std::path::Path;

use crate::csv_files::{ensure_csv_path, read_rows, write_rows};
use crate::errors::AppError;
use crate::models::{FinalReviewRow, RawReviewRow};
use crate::normalize::{parse_subcategory_ratings, split_address, split_name};
use crate::pipeline::PipelineRun;

/// Split author, address and sub-ratings; drop the columns they came from.
pub fn finalize_row(row: RawReviewRow) -> FinalReviewRow {
    let (first_name, last_name) = split_name(row.review_author.as_deref());
    let address = split_address(row.business_address.as_deref());
    let ratings = parse_subcategory_ratings(row.category_ratings.as_deref());
    let cell = |r: Option<i16>| r.map(|v| v.to_string());

    FinalReviewRow {
        review_date: row.review_date,
        review_rating: row.review_rating,
        review_content: row.review_content,
        first_name,
        last_name,
        street: address.street,
        city: address.city,
        state: address.state,
        zip: address.zip,
        food_rating: cell(ratings.food_rating),
        service_rating: cell(ratings.service_rating),
        atmosphere_rating: cell(ratings.atmosphere_rating),
    }
}

/// Returns the number of rows written.
pub fn finalize_file(run: &PipelineRun, input: &Path, output: &Path) -> Result<usize, AppError> {
    let _enter = run.span().enter();
    ensure_csv_path(input)?;

    let rows: Vec<RawReviewRow> = read_rows(input)?;
    let finals: Vec<FinalReviewRow> = rows.into_iter().map(finalize_row).collect();

    let unmatched = finals.iter().filter(|r| r.zip.is_none()).count();
    if unmatched > 0 {
        tracing::warn!("{} rows have an address that could not be split", unmatched);
    }

    write_rows(output, &FinalReviewRow::HEADERS, &finals)?;
    tracing::info!(
        "Finalized {} rows: {} -> {}",
        finals.len(),
        input.display(),
        output.display()
    );
    Ok(finals.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_row() {
        let row = RawReviewRow {
            business_address: Some("123 Main St, Springfield, IL 62704".to_string()),
            review_author: Some("jane q public".to_string()),
            review_date: Some("2025-02-10".to_string()),
            review_rating: Some("5".to_string()),
            review_content: Some("Quick drive-thru".to_string()),
            category_ratings: Some("Food: 5 | Atmosphere: 3".to_string()),
        };

        let out = finalize_row(row);
        assert_eq!(out.first_name.as_deref(), Some("Jane"));
        assert_eq!(out.last_name.as_deref(), Some("Public"));
        assert_eq!(out.street.as_deref(), Some("123 MAIN ST"));
        assert_eq!(out.zip.as_deref(), Some("62704"));
        assert_eq!(out.food_rating.as_deref(), Some("5"));
        assert_eq!(out.service_rating, None);
        assert_eq!(out.atmosphere_rating.as_deref(), Some("3"));
        assert_eq!(out.review_rating.as_deref(), Some("5"));
    }

    #[test]
    fn test_finalize_row_without_address_match() {
        let row = RawReviewRow {
            business_address: Some("not a real address".to_string()),
            ..Default::default()
        };
        let out = finalize_row(row);
        assert!(out.street.is_none() && out.city.is_none());
        assert!(out.state.is_none() && out.zip.is_none());
    }
}
