//! Find-or-create access to the review schema, keyed by natural keys.
//!
//! The importer is written once against [`ReviewRepository`]. A
//! repository value always lives inside one open transaction; committing or
//! dropping it is the owner's job.

use crate::errors::AppError;
use crate::models::{
    Business, CustomerReview, CustomerSubcategoryReview, NewCustomerReview, ScrapeEvent, Store,
    StoreAddress, SubcategoryReview,
};

/// The fixed sub-category lookup set, in import order.
pub const SUBCATEGORY_NAMES: [&str; 3] = ["Food", "Service", "Atmosphere"];

/// Create-if-absent-else-fetch operations, one per entity.
///
/// Callers pass already-normalized values (see [`normalize_business_name`],
/// [`normalize_source`]). Existing rows are returned untouched.
#[allow(async_fn_in_trait)]
pub trait ReviewRepository {
    async fn find_or_create_business(&mut self, business_name: &str)
        -> Result<Business, AppError>;

    async fn find_or_create_subcategory(
        &mut self,
        subcategory_name: &str,
    ) -> Result<SubcategoryReview, AppError>;

    /// New stores get the next `{PREFIX}-{NNNN}` id of their business.
    async fn find_or_create_store(
        &mut self,
        business: &Business,
        address: &StoreAddress,
    ) -> Result<Store, AppError>;

    async fn find_or_create_scrape_event(
        &mut self,
        store: &Store,
        source: &str,
    ) -> Result<ScrapeEvent, AppError>;

    /// Returns the review and whether it was created by this call.
    async fn find_or_create_customer_review(
        &mut self,
        event: &ScrapeEvent,
        review: &NewCustomerReview,
    ) -> Result<(CustomerReview, bool), AppError>;

    /// `rating` is only used when the row is created.
    async fn find_or_create_customer_subcategory_review(
        &mut self,
        review: &CustomerReview,
        subcategory: &SubcategoryReview,
        rating: i16,
    ) -> Result<(CustomerSubcategoryReview, bool), AppError>;
}

pub fn normalize_business_name(name: &str) -> String {
    name.trim().to_uppercase()
}

pub fn normalize_source(source: &str) -> String {
    source.trim().to_lowercase()
}

/// Store id prefix: business name without spaces, upper-cased.
pub fn store_prefix(business_name: &str) -> String {
    business_name.replace(' ', "").to_uppercase()
}

/// Next store id for `prefix` given store ids already in use.
///
/// `existing` may hold ids of any business; only `{prefix}-{N}` ids count,
/// since two business names can share a prefix ("Starbucks", "Star Bucks")
/// and store ids are unique across businesses. The sequence continues from
/// the highest numeric suffix; a suffix that does not parse counts as 0.
pub fn next_store_id<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let last = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix)?.strip_prefix('-'))
        .map(|n| n.parse::<u32>().unwrap_or(0))
        .max()
        .unwrap_or(0);

    format!("{}-{:04}", prefix, last + 1)
}
