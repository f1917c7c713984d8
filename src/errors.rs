use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Database-related errors.
    DatabaseError(sqlx::Error),
    /// Reading or writing a CSV file failed.
    CsvError(csv::Error),
    /// Filesystem errors (missing input file, unwritable output directory).
    IoError(std::io::Error),
    /// The import was started without a business name.
    MissingBusinessName,
    /// The import was started without a data source label.
    MissingSource,
    /// A record does not carry street, city, state and zip.
    IncompleteAddress(String),
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// An invariant the storage layer enforces was violated.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// True for errors caused by one dirty input row. The batch loop skips
    /// the row instead of aborting.
    pub fn is_row_level(&self) -> bool {
        match self {
            AppError::IncompleteAddress(_) => true,
            AppError::WithContext { source, .. } => source.is_row_level(),
            _ => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::CsvError(e) => write!(f, "CSV error: {}", e),
            AppError::IoError(e) => write!(f, "I/O error: {}", e),
            AppError::MissingBusinessName => write!(f, "You must provide the business name"),
            AppError::MissingSource => write!(
                f,
                "You must provide the source from which the data was scraped"
            ),
            AppError::IncompleteAddress(msg) => {
                write!(f, "Incomplete address information: {}", msg)
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::DatabaseError(e) => Some(e),
            AppError::CsvError(e) => Some(e),
            AppError::IoError(e) => Some(e),
            AppError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    fn into_response(self) -> Response {
        if let AppError::WithContext { source, context } = self {
            // Log full context chain, respond as the underlying error
            tracing::error!("Error with context: {} -> {}", context, source);
            return source.into_response();
        }

        let (status, error_message) = match &self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingBusinessName
            | AppError::MissingSource
            | AppError::IncompleteAddress(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::CsvError(_)
            | AppError::IoError(_)
            | AppError::InternalError(_)
            | AppError::WithContext { .. } => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::CsvError(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_address_is_row_level() {
        let err = AppError::IncompleteAddress("zip missing".to_string());
        assert!(err.is_row_level());

        let wrapped: Result<(), AppError> = Err(err);
        let wrapped = wrapped.context("row 3").unwrap_err();
        assert!(wrapped.is_row_level());
        assert_eq!(
            wrapped.to_string(),
            "row 3: Incomplete address information: zip missing"
        );
    }

    #[test]
    fn test_structural_errors_abort() {
        assert!(!AppError::MissingBusinessName.is_row_level());
        assert!(!AppError::MissingSource.is_row_level());
        assert!(!AppError::DatabaseError(sqlx::Error::RowNotFound).is_row_level());
    }
}
