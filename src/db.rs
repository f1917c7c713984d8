use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::schema::run_migrations;

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date.
    pub async fn connect_and_migrate(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = Self::new(database_url, max_connections).await?;
        run_migrations(&db.pool).await?;
        Ok(db)
    }
}
