use crate::db_storage::ReviewStorage;
use crate::errors::AppError;
use crate::models::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
}

impl AppState {
    fn storage(&self) -> ReviewStorage {
        ReviewStorage::new(self.db.clone())
    }
}

/// Health check endpoint.
///
/// Does not touch the database, so it stays green while Postgres restarts.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "review-pipeline",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/v1/businesses
pub async fn list_businesses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Business>>, AppError> {
    let businesses = state.storage().list_businesses().await?;
    Ok(Json(businesses))
}

/// GET /api/v1/businesses/:id/stores
pub async fn list_stores(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<i32>,
) -> Result<Json<Vec<Store>>, AppError> {
    let stores = state.storage().list_stores(business_id).await?;
    Ok(Json(stores))
}

/// GET /api/v1/stores/:store_id/events
///
/// `store_id` is the business-scoped identifier, e.g. `STARBUCKS-0001`.
pub async fn list_store_events(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<String>,
) -> Result<Json<Vec<ScrapeEvent>>, AppError> {
    let events = state.storage().list_events(&store_id).await?;
    Ok(Json(events))
}

/// GET /api/v1/reviews
///
/// Newest first. Filters: `store_id`, `source`, `min_rating`; paging via
/// `limit` (capped) and `offset`.
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReviewQueryParams>,
) -> Result<Json<Page<ReviewListing>>, AppError> {
    tracing::debug!("GET /reviews - params: {:?}", params);

    if let Some(min) = params.min_rating {
        if !(1..=5).contains(&min) {
            return Err(AppError::BadRequest(
                "min_rating must be between 1 and 5".to_string(),
            ));
        }
    }

    let page = state.storage().list_reviews(&params).await?;
    Ok(Json(page))
}

/// GET /api/v1/reviews/:id
pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path(review_id): Path<i32>,
) -> Result<Json<ReviewDetail>, AppError> {
    let detail = state.storage().get_review(review_id).await?;
    Ok(Json(detail))
}
