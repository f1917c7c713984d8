use crate::errors::AppError;
use crate::importer::{import_batch, ImportOutcome, ImportRecord};
use crate::models::{
    Business, CustomerReview, CustomerSubcategoryReview, NewCustomerReview, Page,
    ReviewDetail, ReviewListing, ReviewQueryParams, ScrapeEvent, Store, StoreAddress,
    SubcategoryRating, SubcategoryReview,
};
use crate::pipeline::PipelineRun;
use crate::repository::{next_store_id, store_prefix, ReviewRepository};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::Instrument;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Find-or-create repository bound to one Postgres transaction.
///
/// Every lookup selects first; inserts use `ON CONFLICT DO NOTHING` and
/// re-select, so a concurrent writer on the same natural key never aborts
/// the transaction.
pub struct PgReviewRepository {
    tx: Transaction<'static, Postgres>,
}

impl PgReviewRepository {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }

    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let tx = pool.begin().await.map_err(AppError::DatabaseError)?;
        Ok(Self::new(tx))
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await.map_err(AppError::DatabaseError)
    }
}

impl ReviewRepository for PgReviewRepository {
    async fn find_or_create_business(
        &mut self,
        business_name: &str,
    ) -> Result<Business, AppError> {
        let select = "SELECT business_id, business_name FROM businesses WHERE business_name = $1";

        if let Some(existing) = sqlx::query_as::<_, Business>(select)
            .bind(business_name)
            .fetch_optional(&mut *self.tx)
            .await?
        {
            return Ok(existing);
        }

        let created = sqlx::query_as::<_, Business>(
            r#"
            INSERT INTO businesses (business_name)
            VALUES ($1)
            ON CONFLICT (business_name) DO NOTHING
            RETURNING business_id, business_name
            "#,
        )
        .bind(business_name)
        .fetch_optional(&mut *self.tx)
        .await?;

        match created {
            Some(business) => {
                tracing::debug!("Created business {}", business.business_name);
                Ok(business)
            }
            None => Ok(sqlx::query_as::<_, Business>(select)
                .bind(business_name)
                .fetch_one(&mut *self.tx)
                .await?),
        }
    }

    async fn find_or_create_subcategory(
        &mut self,
        subcategory_name: &str,
    ) -> Result<SubcategoryReview, AppError> {
        let select = "SELECT subcategory_id, subcategory_name FROM subcategory_reviews WHERE subcategory_name = $1";

        if let Some(existing) = sqlx::query_as::<_, SubcategoryReview>(select)
            .bind(subcategory_name)
            .fetch_optional(&mut *self.tx)
            .await?
        {
            return Ok(existing);
        }

        sqlx::query(
            "INSERT INTO subcategory_reviews (subcategory_name) VALUES ($1) ON CONFLICT (subcategory_name) DO NOTHING",
        )
        .bind(subcategory_name)
        .execute(&mut *self.tx)
        .await?;

        Ok(sqlx::query_as::<_, SubcategoryReview>(select)
            .bind(subcategory_name)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn find_or_create_store(
        &mut self,
        business: &Business,
        address: &StoreAddress,
    ) -> Result<Store, AppError> {
        let select = r#"
            SELECT id, store_id, business_id, street, city, state, zip
            FROM stores
            WHERE business_id = $1 AND street = $2 AND city = $3 AND state = $4 AND zip = $5
        "#;

        if let Some(existing) = sqlx::query_as::<_, Store>(select)
            .bind(business.business_id)
            .bind(&address.street)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.zip)
            .fetch_optional(&mut *self.tx)
            .await?
        {
            return Ok(existing);
        }

        let prefix = store_prefix(&business.business_name);

        // Serializes store id allocation for every business sharing this prefix.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&prefix)
            .execute(&mut *self.tx)
            .await?;

        // Another transaction may have created it while we waited for the lock.
        if let Some(existing) = sqlx::query_as::<_, Store>(select)
            .bind(business.business_id)
            .bind(&address.street)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.zip)
            .fetch_optional(&mut *self.tx)
            .await?
        {
            return Ok(existing);
        }

        let existing_ids: Vec<String> = sqlx::query_scalar(
            "SELECT store_id FROM stores WHERE left(store_id, length($1) + 1) = $1 || '-'",
        )
        .bind(&prefix)
        .fetch_all(&mut *self.tx)
        .await?;

        let store_id = next_store_id(&prefix, existing_ids.iter().map(String::as_str));

        let store = sqlx::query_as::<_, Store>(
            r#"
            INSERT INTO stores (store_id, business_id, street, city, state, zip)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, store_id, business_id, street, city, state, zip
            "#,
        )
        .bind(&store_id)
        .bind(business.business_id)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip)
        .fetch_one(&mut *self.tx)
        .await?;

        tracing::info!(
            "Created store {} at {}, {}, {} {}",
            store.store_id,
            store.street,
            store.city,
            store.state,
            store.zip
        );
        Ok(store)
    }

    async fn find_or_create_scrape_event(
        &mut self,
        store: &Store,
        source: &str,
    ) -> Result<ScrapeEvent, AppError> {
        let select = r#"
            SELECT scrape_id, store_id, scrape_date, source
            FROM scrape_events
            WHERE store_id = $1 AND source = $2
        "#;

        if let Some(existing) = sqlx::query_as::<_, ScrapeEvent>(select)
            .bind(store.id)
            .bind(source)
            .fetch_optional(&mut *self.tx)
            .await?
        {
            return Ok(existing);
        }

        sqlx::query(
            "INSERT INTO scrape_events (store_id, source) VALUES ($1, $2) ON CONFLICT (store_id, source) DO NOTHING",
        )
        .bind(store.id)
        .bind(source)
        .execute(&mut *self.tx)
        .await?;

        Ok(sqlx::query_as::<_, ScrapeEvent>(select)
            .bind(store.id)
            .bind(source)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn find_or_create_customer_review(
        &mut self,
        event: &ScrapeEvent,
        review: &NewCustomerReview,
    ) -> Result<(CustomerReview, bool), AppError> {
        let select = r#"
            SELECT review_id, scrape_id, review_date, first_name, last_name, review, overall_rating
            FROM customer_reviews
            WHERE scrape_id = $1
              AND review_date = $2
              AND overall_rating = $3
              AND md5(review) = md5($4)
              AND review = $4
              AND first_name = $5
              AND last_name = $6
        "#;

        if let Some(existing) = sqlx::query_as::<_, CustomerReview>(select)
            .bind(event.scrape_id)
            .bind(review.review_date)
            .bind(review.overall_rating)
            .bind(&review.review)
            .bind(&review.first_name)
            .bind(&review.last_name)
            .fetch_optional(&mut *self.tx)
            .await?
        {
            return Ok((existing, false));
        }

        let created = sqlx::query_as::<_, CustomerReview>(
            r#"
            INSERT INTO customer_reviews (scrape_id, review_date, overall_rating, review, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            RETURNING review_id, scrape_id, review_date, first_name, last_name, review, overall_rating
            "#,
        )
        .bind(event.scrape_id)
        .bind(review.review_date)
        .bind(review.overall_rating)
        .bind(&review.review)
        .bind(&review.first_name)
        .bind(&review.last_name)
        .fetch_optional(&mut *self.tx)
        .await?;

        match created {
            Some(row) => Ok((row, true)),
            None => {
                let existing = sqlx::query_as::<_, CustomerReview>(select)
                    .bind(event.scrape_id)
                    .bind(review.review_date)
                    .bind(review.overall_rating)
                    .bind(&review.review)
                    .bind(&review.first_name)
                    .bind(&review.last_name)
                    .fetch_one(&mut *self.tx)
                    .await?;
                Ok((existing, false))
            }
        }
    }

    async fn find_or_create_customer_subcategory_review(
        &mut self,
        review: &CustomerReview,
        subcategory: &SubcategoryReview,
        rating: i16,
    ) -> Result<(CustomerSubcategoryReview, bool), AppError> {
        let created = sqlx::query_as::<_, CustomerSubcategoryReview>(
            r#"
            INSERT INTO customer_subcategory_reviews (review_id, subcategory_id, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (review_id, subcategory_id) DO NOTHING
            RETURNING id, review_id, subcategory_id, rating
            "#,
        )
        .bind(review.review_id)
        .bind(subcategory.subcategory_id)
        .bind(rating)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = created {
            return Ok((row, true));
        }

        // Existing ratings are kept as they are.
        let existing = sqlx::query_as::<_, CustomerSubcategoryReview>(
            r#"
            SELECT id, review_id, subcategory_id, rating
            FROM customer_subcategory_reviews
            WHERE review_id = $1 AND subcategory_id = $2
            "#,
        )
        .bind(review.review_id)
        .bind(subcategory.subcategory_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok((existing, false))
    }
}

/// Pool-level entry point for imports and read-only reports.
pub struct ReviewStorage {
    pool: PgPool,
}

impl ReviewStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Import one batch in a single transaction. Any batch-level error rolls
    /// back everything written by this call.
    pub async fn import_reviews(
        &self,
        run: &PipelineRun,
        business_name: &str,
        source: &str,
        records: &[ImportRecord],
    ) -> Result<ImportOutcome, AppError> {
        let mut repo = PgReviewRepository::begin(&self.pool).await?;

        let outcome = import_batch(&mut repo, business_name, source, records)
            .instrument(run.span().clone())
            .await?;

        repo.commit().await?;
        Ok(outcome)
    }

    pub async fn list_businesses(&self) -> Result<Vec<Business>, AppError> {
        let rows = sqlx::query_as::<_, Business>(
            "SELECT business_id, business_name FROM businesses ORDER BY business_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_stores(&self, business_id: i32) -> Result<Vec<Store>, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM businesses WHERE business_id = $1)")
                .bind(business_id)
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Err(AppError::NotFound(format!("business {}", business_id)));
        }

        let rows = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, store_id, business_id, street, city, state, zip
            FROM stores
            WHERE business_id = $1
            ORDER BY store_id
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Scrape events of a store, addressed by its `PREFIX-NNNN` id.
    pub async fn list_events(&self, store_id: &str) -> Result<Vec<ScrapeEvent>, AppError> {
        let store_pk: Option<i32> = sqlx::query_scalar("SELECT id FROM stores WHERE store_id = $1")
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;

        let store_pk = store_pk.ok_or_else(|| AppError::NotFound(format!("store {}", store_id)))?;

        let rows = sqlx::query_as::<_, ScrapeEvent>(
            r#"
            SELECT scrape_id, store_id, scrape_date, source
            FROM scrape_events
            WHERE store_id = $1
            ORDER BY scrape_date DESC
            "#,
        )
        .bind(store_pk)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_reviews(
        &self,
        params: &ReviewQueryParams,
    ) -> Result<Page<ReviewListing>, AppError> {
        let (limit, offset) = page_bounds(params)?;
        let source = params.source.as_deref().map(crate::repository::normalize_source);

        let items = sqlx::query_as::<_, ReviewListing>(
            r#"
            SELECT cr.review_id, s.store_id, se.source, cr.review_date,
                   cr.first_name, cr.last_name, cr.overall_rating, cr.review
            FROM customer_reviews cr
            JOIN scrape_events se ON se.scrape_id = cr.scrape_id
            JOIN stores s ON s.id = se.store_id
            WHERE ($1::text IS NULL OR s.store_id = $1)
              AND ($2::text IS NULL OR se.source = $2)
              AND ($3::smallint IS NULL OR cr.overall_rating >= $3)
            ORDER BY cr.review_date DESC, cr.review_id
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(params.store_id.as_deref())
        .bind(source)
        .bind(params.min_rating)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items,
            limit,
            offset,
        })
    }

    pub async fn get_review(&self, review_id: i32) -> Result<ReviewDetail, AppError> {
        let review = sqlx::query_as::<_, ReviewListing>(
            r#"
            SELECT cr.review_id, s.store_id, se.source, cr.review_date,
                   cr.first_name, cr.last_name, cr.overall_rating, cr.review
            FROM customer_reviews cr
            JOIN scrape_events se ON se.scrape_id = cr.scrape_id
            JOIN stores s ON s.id = se.store_id
            WHERE cr.review_id = $1
            "#,
        )
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("review {}", review_id)))?;

        let subcategories = sqlx::query_as::<_, SubcategoryRating>(
            r#"
            SELECT sr.subcategory_name, csr.rating
            FROM customer_subcategory_reviews csr
            JOIN subcategory_reviews sr ON sr.subcategory_id = csr.subcategory_id
            WHERE csr.review_id = $1
            ORDER BY sr.subcategory_id
            "#,
        )
        .bind(review_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ReviewDetail {
            review,
            subcategories,
        })
    }
}

/// Resolve and validate paging parameters.
pub fn page_bounds(params: &ReviewQueryParams) -> Result<(i64, i64), AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    if limit <= 0 {
        return Err(AppError::BadRequest("limit must be positive".to_string()));
    }
    if offset < 0 {
        return Err(AppError::BadRequest("offset must not be negative".to_string()));
    }

    Ok((limit.min(MAX_PAGE_SIZE), offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_defaults() {
        let params = ReviewQueryParams::default();
        assert_eq!(page_bounds(&params).unwrap(), (DEFAULT_PAGE_SIZE, 0));
    }

    #[test]
    fn test_page_bounds_clamps_limit() {
        let params = ReviewQueryParams {
            limit: Some(10_000),
            offset: Some(20),
            ..Default::default()
        };
        assert_eq!(page_bounds(&params).unwrap(), (MAX_PAGE_SIZE, 20));
    }

    #[test]
    fn test_page_bounds_rejects_negative() {
        let params = ReviewQueryParams {
            offset: Some(-1),
            ..Default::default()
        };
        assert!(matches!(page_bounds(&params), Err(AppError::BadRequest(_))));

        let params = ReviewQueryParams {
            limit: Some(0),
            ..Default::default()
        };
        assert!(matches!(page_bounds(&params), Err(AppError::BadRequest(_))));
    }
}
