use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============ Database Models ============

/// A business brand, e.g. "STARBUCKS". One row per normalized name.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Business {
    pub business_id: i32,
    /// Trimmed, upper-cased name.
    pub business_name: String,
}

/// A physical location of a business.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Store {
    pub id: i32,
    /// Human-facing identifier scoped per business, e.g. `STARBUCKS-0002`.
    pub store_id: String,
    pub business_id: i32,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// One scrape of one store from one source.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ScrapeEvent {
    pub scrape_id: i32,
    pub store_id: i32,
    pub scrape_date: DateTime<Utc>,
    /// Trimmed, lower-cased label such as `google maps`.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CustomerReview {
    pub review_id: i32,
    pub scrape_id: i32,
    pub review_date: NaiveDate,
    pub first_name: String,
    pub last_name: String,
    pub review: String,
    pub overall_rating: i16,
}

/// Lookup row: one of "Food", "Service", "Atmosphere".
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SubcategoryReview {
    pub subcategory_id: i32,
    pub subcategory_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CustomerSubcategoryReview {
    pub id: i32,
    pub review_id: i32,
    pub subcategory_id: i32,
    pub rating: Option<i16>,
}

// ============ Natural Keys ============

/// Normalized address of a store; together with the business it is the
/// store's natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Every column of a customer review except its scrape event. Two reviews
/// of the same event with identical fields are the same review.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewCustomerReview {
    pub review_date: NaiveDate,
    pub overall_rating: i16,
    pub review: String,
    pub first_name: String,
    pub last_name: String,
}

// ============ Scraper Boundary ============

/// One review as extracted from a Google Maps listing by the browser scraper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedReview {
    pub author: Option<String>,
    /// Number of filled stars.
    #[serde(default)]
    pub overall_stars: u32,
    /// Relative date as shown on the page ("3 months ago").
    pub date: Option<String>,
    pub content: Option<String>,
    /// Fragments like `"Food: 5"`.
    #[serde(default)]
    pub category_ratings: Vec<String>,
}

// ============ CSV Rows ============

/// Row of the raw and processed CSV files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReviewRow {
    pub business_address: Option<String>,
    pub review_author: Option<String>,
    pub review_date: Option<String>,
    pub review_rating: Option<String>,
    pub review_content: Option<String>,
    pub category_ratings: Option<String>,
}

impl RawReviewRow {
    pub const HEADERS: [&'static str; 6] = [
        "business_address",
        "review_author",
        "review_date",
        "review_rating",
        "review_content",
        "category_ratings",
    ];
}

/// Row of the final CSV consumed by the importer. Column names are
/// load-bearing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReviewRow {
    pub review_date: Option<String>,
    pub review_rating: Option<String>,
    pub review_content: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub food_rating: Option<String>,
    pub service_rating: Option<String>,
    pub atmosphere_rating: Option<String>,
}

impl FinalReviewRow {
    pub const HEADERS: [&'static str; 12] = [
        "review_date",
        "review_rating",
        "review_content",
        "first_name",
        "last_name",
        "street",
        "city",
        "state",
        "zip",
        "food_rating",
        "service_rating",
        "atmosphere_rating",
    ];
}

// ============ API Models ============

/// Query parameters for `GET /api/v1/reviews`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewQueryParams {
    /// Store identifier such as `STARBUCKS-0001`.
    pub store_id: Option<String>,
    pub source: Option<String>,
    pub min_rating: Option<i16>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Review row joined with its store and source for listings.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReviewListing {
    pub review_id: i32,
    pub store_id: String,
    pub source: String,
    pub review_date: NaiveDate,
    pub first_name: String,
    pub last_name: String,
    pub overall_rating: i16,
    pub review: String,
}

/// A sub-category rating resolved to its label.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubcategoryRating {
    pub subcategory_name: String,
    pub rating: Option<i16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub review: ReviewListing,
    pub subcategories: Vec<SubcategoryRating>,
}

/// Paginated listing envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub limit: i64,
    pub offset: i64,
}
