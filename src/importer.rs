//! Final CSV -> Business / Store / ScrapeEvent / CustomerReview import.
//!
//! Failure tiers:
//! - a field that does not parse becomes `None`
//! - a row missing address or review fields is skipped with a warning
//! - a missing business name or source, or any storage error, aborts the
//!   batch; the owning transaction is then dropped without commit

use chrono::NaiveDate;
use std::fmt;
use std::path::Path;

use crate::dates::parse_review_date;
use crate::csv_files::read_rows;
use crate::errors::AppError;
use crate::models::{
    Business, FinalReviewRow, NewCustomerReview, ScrapeEvent, StoreAddress, SubcategoryReview,
};
use crate::normalize::{non_blank, parse_rating};
use crate::repository::{
    normalize_business_name, normalize_source, ReviewRepository, SUBCATEGORY_NAMES,
};

/// One review to import, as read from the final CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRecord {
    /// Data row number in the source file (1-based), for log messages.
    pub row: usize,
    pub review_date: Option<NaiveDate>,
    pub review_rating: Option<i16>,
    pub review_content: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    /// Sub-category cells stay raw; `null`, `NaN` and blanks are filtered at
    /// upsert time.
    pub food_rating: Option<String>,
    pub service_rating: Option<String>,
    pub atmosphere_rating: Option<String>,
}

impl ImportRecord {
    pub fn from_row(row: usize, raw: FinalReviewRow) -> Self {
        let owned = |v: Option<String>| non_blank(v.as_deref()).map(str::to_string);

        Self {
            row,
            review_date: raw.review_date.as_deref().and_then(parse_review_date),
            review_rating: parse_rating(raw.review_rating.as_deref()),
            review_content: owned(raw.review_content),
            first_name: owned(raw.first_name),
            last_name: owned(raw.last_name),
            street: owned(raw.street),
            city: owned(raw.city),
            state: owned(raw.state),
            zip: owned(raw.zip),
            food_rating: raw.food_rating,
            service_rating: raw.service_rating,
            atmosphere_rating: raw.atmosphere_rating,
        }
    }

    /// Normalized store address, or `None` when any part is missing.
    pub fn address(&self) -> Option<StoreAddress> {
        Some(StoreAddress {
            street: self.street.as_deref()?.trim().to_uppercase(),
            city: self.city.as_deref()?.trim().to_uppercase(),
            state: self.state.as_deref()?.trim().to_uppercase(),
            zip: self.zip.as_deref()?.trim().to_string(),
        })
    }

    /// The review natural key, or the first missing required field.
    pub fn review(&self) -> Result<NewCustomerReview, &'static str> {
        Ok(NewCustomerReview {
            review_date: self.review_date.ok_or("review_date")?,
            overall_rating: self.review_rating.ok_or("review_rating")?,
            review: self.review_content.clone().ok_or("review_content")?,
            first_name: self.first_name.clone().ok_or("first_name")?,
            last_name: self.last_name.clone().ok_or("last_name")?,
        })
    }

    fn subcategory_cells(&self) -> [Option<&str>; 3] {
        [
            self.food_rating.as_deref(),
            self.service_rating.as_deref(),
            self.atmosphere_rating.as_deref(),
        ]
    }
}

/// Read the final CSV, newest reviews first.
pub fn read_import_records(path: &Path) -> Result<Vec<ImportRecord>, AppError> {
    let rows: Vec<FinalReviewRow> = read_rows(path)?;
    let mut records: Vec<ImportRecord> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| ImportRecord::from_row(idx + 1, row))
        .collect();

    // Stable: rows without a date keep file order at the end.
    records.sort_by(|a, b| b.review_date.cmp(&a.review_date));
    Ok(records)
}

/// What one import batch touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Distinct scrape events, in first-touch order.
    pub events: Vec<ScrapeEvent>,
    pub total: usize,
    pub imported: usize,
    pub skipped: usize,
    pub reviews_created: usize,
    pub subcategory_created: usize,
}

impl ImportOutcome {
    fn touch_event(&mut self, event: ScrapeEvent) {
        if !self.events.iter().any(|e| e.scrape_id == event.scrape_id) {
            self.events.push(event);
        }
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully imported {}/{} reviews AND {} subcategory reviews ({} skipped)",
            self.imported, self.total, self.subcategory_created, self.skipped
        )
    }
}

enum RecordStatus {
    Imported {
        review_created: bool,
        subcategories_created: usize,
    },
    Skipped(&'static str),
}

/// Import a batch through `repo`. The caller owns the transaction.
pub async fn import_batch<R: ReviewRepository>(
    repo: &mut R,
    business_name: &str,
    source: &str,
    records: &[ImportRecord],
) -> Result<ImportOutcome, AppError> {
    let business_name = normalize_business_name(business_name);
    if business_name.is_empty() {
        return Err(AppError::MissingBusinessName);
    }
    let source = normalize_source(source);
    if source.is_empty() {
        return Err(AppError::MissingSource);
    }

    let business = repo.find_or_create_business(&business_name).await?;

    let mut subcategories = Vec::with_capacity(SUBCATEGORY_NAMES.len());
    for name in SUBCATEGORY_NAMES {
        subcategories.push(repo.find_or_create_subcategory(name).await?);
    }

    tracing::info!(
        business = %business.business_name,
        %source,
        rows = records.len(),
        "Importing review batch"
    );

    let mut outcome = ImportOutcome {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        match upsert_record(repo, &business, &source, &subcategories, record, &mut outcome).await {
            Ok(RecordStatus::Imported {
                review_created,
                subcategories_created,
            }) => {
                outcome.imported += 1;
                outcome.reviews_created += usize::from(review_created);
                outcome.subcategory_created += subcategories_created;
            }
            Ok(RecordStatus::Skipped(missing)) => {
                tracing::warn!(row = record.row, "Skipping row: missing {}", missing);
                outcome.skipped += 1;
            }
            Err(e) if e.is_row_level() => {
                tracing::warn!(row = record.row, "Skipping row: {}", e);
                outcome.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        imported = outcome.imported,
        skipped = outcome.skipped,
        events = outcome.events.len(),
        "Review batch processed"
    );

    Ok(outcome)
}

async fn upsert_record<R: ReviewRepository>(
    repo: &mut R,
    business: &Business,
    source: &str,
    subcategories: &[SubcategoryReview],
    record: &ImportRecord,
    outcome: &mut ImportOutcome,
) -> Result<RecordStatus, AppError> {
    let address = record.address().ok_or_else(|| {
        AppError::IncompleteAddress(format!(
            "street={:?} city={:?} state={:?} zip={:?}",
            record.street, record.city, record.state, record.zip
        ))
    })?;

    let store = repo.find_or_create_store(business, &address).await?;
    let event = repo.find_or_create_scrape_event(&store, source).await?;
    outcome.touch_event(event.clone());

    let new_review = match record.review() {
        Ok(review) => review,
        Err(missing) => return Ok(RecordStatus::Skipped(missing)),
    };

    let (review, review_created) = repo
        .find_or_create_customer_review(&event, &new_review)
        .await?;

    let mut subcategories_created = 0;
    for (subcategory, cell) in subcategories.iter().zip(record.subcategory_cells()) {
        let Some(rating) = parse_rating(cell) else {
            continue;
        };
        let (_, created) = repo
            .find_or_create_customer_subcategory_review(&review, subcategory, rating)
            .await?;
        subcategories_created += usize::from(created);
    }

    tracing::debug!(
        row = record.row,
        store = %store.store_id,
        review_id = review.review_id,
        review_created,
        "Row imported"
    );

    Ok(RecordStatus::Imported {
        review_created,
        subcategories_created,
    })
}
