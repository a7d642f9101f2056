use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Upstream scraper feed could not be read. Safe to retry.
    #[error("Feed fetch failed: {message}")]
    Fetch {
        message: String,
        status: Option<u16>,
    },

    /// The feed answered, but its body is not a posting list. Retrying will not help.
    #[error("Invalid feed response: {0}")]
    InvalidFeed(String),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Fetch { .. })
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        if let Error::Fetch { message, status } = &self {
            let body = Json(json!({
                "error": format!("Feed fetch failed: {}", message),
                "upstream_status": status,
                "retryable": true,
            }));
            return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
        }

        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Error::InvalidFeed(msg) => (StatusCode::BAD_GATEWAY, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Error::InvalidFeed(err.to_string());
        }
        Error::Fetch {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_are_retryable_and_map_to_503() {
        let err = Error::Fetch {
            message: "connection refused".into(),
            status: None,
        };
        assert!(err.is_retryable());
        assert_eq!(
            err.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn row_not_found_becomes_404() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(!err.is_retryable());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_feed_is_not_retryable() {
        let err = Error::InvalidFeed("expected a posting list".into());
        assert!(!err.is_retryable());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn bad_request_maps_to_400() {
        let err = Error::BadRequest("nope".into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
