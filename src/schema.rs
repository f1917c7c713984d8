//! Embedded schema migrations, applied in order and recorded in
//! `schema_migrations`.

use sqlx::PgPool;
use tracing::{info, instrument};

use crate::errors::AppError;

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "review hierarchy tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS businesses (
    business_id SERIAL PRIMARY KEY,
    business_name VARCHAR(255) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS stores (
    id SERIAL PRIMARY KEY,
    store_id VARCHAR(50) NOT NULL UNIQUE,
    business_id INTEGER NOT NULL REFERENCES businesses(business_id) ON DELETE CASCADE,
    street VARCHAR(255) NOT NULL,
    city VARCHAR(100) NOT NULL,
    state VARCHAR(50) NOT NULL,
    zip VARCHAR(10) NOT NULL,
    UNIQUE (business_id, street, city, state, zip)
);

CREATE TABLE IF NOT EXISTS scrape_events (
    scrape_id SERIAL PRIMARY KEY,
    store_id INTEGER NOT NULL REFERENCES stores(id) ON DELETE CASCADE,
    scrape_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    source VARCHAR(100) NOT NULL,
    UNIQUE (store_id, source)
);

CREATE TABLE IF NOT EXISTS customer_reviews (
    review_id SERIAL PRIMARY KEY,
    scrape_id INTEGER NOT NULL REFERENCES scrape_events(scrape_id) ON DELETE CASCADE,
    review_date DATE NOT NULL,
    first_name VARCHAR(100) NOT NULL,
    last_name VARCHAR(100) NOT NULL,
    review TEXT NOT NULL,
    overall_rating SMALLINT NOT NULL CHECK (overall_rating BETWEEN 1 AND 5)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_customer_reviews_natural_key
    ON customer_reviews (scrape_id, review_date, overall_rating, md5(review), first_name, last_name);

CREATE TABLE IF NOT EXISTS subcategory_reviews (
    subcategory_id SERIAL PRIMARY KEY,
    subcategory_name VARCHAR(100) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS customer_subcategory_reviews (
    id SERIAL PRIMARY KEY,
    review_id INTEGER NOT NULL REFERENCES customer_reviews(review_id) ON DELETE CASCADE,
    subcategory_id INTEGER NOT NULL REFERENCES subcategory_reviews(subcategory_id) ON DELETE CASCADE,
    rating SMALLINT CHECK (rating IS NULL OR rating BETWEEN 1 AND 5),
    UNIQUE (review_id, subcategory_id)
);
"#,
    },
    Migration {
        id: 2,
        description: "reporting indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_stores_business ON stores(business_id);
CREATE INDEX IF NOT EXISTS idx_customer_reviews_scrape_date
    ON customer_reviews(scrape_id, review_date DESC);
"#,
    },
];

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            id INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
         );",
    )
    .execute(pool)
    .await?;

    for migration in MIGRATIONS {
        let already_applied: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM schema_migrations WHERE id = $1)")
                .bind(migration.id)
                .fetch_one(pool)
                .await?;

        if already_applied {
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO schema_migrations (id, description) VALUES ($1, $2)")
            .bind(migration.id)
            .bind(migration.description)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_ids_are_increasing() {
        let ids: Vec<i32> = MIGRATIONS.iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids.first(), Some(&1));
    }
}
