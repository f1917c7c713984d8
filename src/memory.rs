//! In-process review store used for `--dry-run` imports and tests.
//!
//! A transaction works on a private copy of the state. `commit` swaps the
//! copy in; dropping the transaction discards it.

use chrono::Utc;

use crate::errors::AppError;
use crate::importer::{import_batch, ImportOutcome, ImportRecord};
use crate::models::{
    Business, CustomerReview, CustomerSubcategoryReview, NewCustomerReview, ScrapeEvent, Store,
    StoreAddress, SubcategoryReview,
};
use crate::repository::{next_store_id, store_prefix, ReviewRepository};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub businesses: Vec<Business>,
    pub stores: Vec<Store>,
    pub scrape_events: Vec<ScrapeEvent>,
    pub customer_reviews: Vec<CustomerReview>,
    pub subcategories: Vec<SubcategoryReview>,
    pub customer_subcategory_reviews: Vec<CustomerSubcategoryReview>,
}

/// Serial ids in this store are `len + 1`; rows are never deleted.
fn next_id(len: usize) -> i32 {
    i32::try_from(len + 1).unwrap_or(i32::MAX)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: MemoryState,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn begin(&mut self) -> MemoryTransaction<'_> {
        let staged = self.state.clone();
        MemoryTransaction {
            target: &mut self.state,
            staged,
        }
    }

    /// Run one import batch atomically.
    pub async fn import_reviews(
        &mut self,
        business_name: &str,
        source: &str,
        records: &[ImportRecord],
    ) -> Result<ImportOutcome, AppError> {
        let mut tx = self.begin();
        let outcome = import_batch(&mut tx, business_name, source, records).await?;
        tx.commit();
        Ok(outcome)
    }
}

pub struct MemoryTransaction<'a> {
    target: &'a mut MemoryState,
    staged: MemoryState,
}

impl MemoryTransaction<'_> {
    pub fn commit(self) {
        *self.target = self.staged;
    }
}

impl ReviewRepository for MemoryTransaction<'_> {
    async fn find_or_create_business(
        &mut self,
        business_name: &str,
    ) -> Result<Business, AppError> {
        let state = &mut self.staged;
        if let Some(existing) = state
            .businesses
            .iter()
            .find(|b| b.business_name == business_name)
        {
            return Ok(existing.clone());
        }

        let business = Business {
            business_id: next_id(state.businesses.len()),
            business_name: business_name.to_string(),
        };
        state.businesses.push(business.clone());
        Ok(business)
    }

    async fn find_or_create_subcategory(
        &mut self,
        subcategory_name: &str,
    ) -> Result<SubcategoryReview, AppError> {
        let state = &mut self.staged;
        if let Some(existing) = state
            .subcategories
            .iter()
            .find(|s| s.subcategory_name == subcategory_name)
        {
            return Ok(existing.clone());
        }

        let subcategory = SubcategoryReview {
            subcategory_id: next_id(state.subcategories.len()),
            subcategory_name: subcategory_name.to_string(),
        };
        state.subcategories.push(subcategory.clone());
        Ok(subcategory)
    }

    async fn find_or_create_store(
        &mut self,
        business: &Business,
        address: &StoreAddress,
    ) -> Result<Store, AppError> {
        let state = &mut self.staged;
        if let Some(existing) = state.stores.iter().find(|s| {
            s.business_id == business.business_id
                && s.street == address.street
                && s.city == address.city
                && s.state == address.state
                && s.zip == address.zip
        }) {
            return Ok(existing.clone());
        }

        let store_id = next_store_id(
            &store_prefix(&business.business_name),
            state.stores.iter().map(|s| s.store_id.as_str()),
        );

        // Same constraint as the UNIQUE column in Postgres.
        if state.stores.iter().any(|s| s.store_id == store_id) {
            return Err(AppError::InternalError(format!(
                "store_id {} already exists",
                store_id
            )));
        }

        let store = Store {
            id: next_id(state.stores.len()),
            store_id,
            business_id: business.business_id,
            street: address.street.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            zip: address.zip.clone(),
        };
        state.stores.push(store.clone());
        Ok(store)
    }

    async fn find_or_create_scrape_event(
        &mut self,
        store: &Store,
        source: &str,
    ) -> Result<ScrapeEvent, AppError> {
        let state = &mut self.staged;
        if let Some(existing) = state
            .scrape_events
            .iter()
            .find(|e| e.store_id == store.id && e.source == source)
        {
            return Ok(existing.clone());
        }

        let event = ScrapeEvent {
            scrape_id: next_id(state.scrape_events.len()),
            store_id: store.id,
            scrape_date: Utc::now(),
            source: source.to_string(),
        };
        state.scrape_events.push(event.clone());
        Ok(event)
    }

    async fn find_or_create_customer_review(
        &mut self,
        event: &ScrapeEvent,
        review: &NewCustomerReview,
    ) -> Result<(CustomerReview, bool), AppError> {
        let state = &mut self.staged;
        if let Some(existing) = state.customer_reviews.iter().find(|r| {
            r.scrape_id == event.scrape_id
                && r.review_date == review.review_date
                && r.overall_rating == review.overall_rating
                && r.review == review.review
                && r.first_name == review.first_name
                && r.last_name == review.last_name
        }) {
            return Ok((existing.clone(), false));
        }

        let created = CustomerReview {
            review_id: next_id(state.customer_reviews.len()),
            scrape_id: event.scrape_id,
            review_date: review.review_date,
            first_name: review.first_name.clone(),
            last_name: review.last_name.clone(),
            review: review.review.clone(),
            overall_rating: review.overall_rating,
        };
        state.customer_reviews.push(created.clone());
        Ok((created, true))
    }

    async fn find_or_create_customer_subcategory_review(
        &mut self,
        review: &CustomerReview,
        subcategory: &SubcategoryReview,
        rating: i16,
    ) -> Result<(CustomerSubcategoryReview, bool), AppError> {
        let state = &mut self.staged;
        if let Some(existing) = state.customer_subcategory_reviews.iter().find(|r| {
            r.review_id == review.review_id && r.subcategory_id == subcategory.subcategory_id
        }) {
            return Ok((existing.clone(), false));
        }

        let created = CustomerSubcategoryReview {
            id: next_id(state.customer_subcategory_reviews.len()),
            review_id: review.review_id,
            subcategory_id: subcategory.subcategory_id,
            rating: Some(rating),
        };
        state.customer_subcategory_reviews.push(created.clone());
        Ok((created, true))
    }
}
