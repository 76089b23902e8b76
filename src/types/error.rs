//! Error types for the catalog explorer
//!
//! Every failure that can reach an HTTP client is one of a small set of kinds.
//! Data-store detail is kept for the logs and never returned to the caller.

use hyper::StatusCode;

/// Main error type for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client.
    ///
    /// Database, serialization and internal failures collapse to a generic
    /// text so that SQL and file paths stay in the server log.
    pub fn public_message(&self) -> String {
        match self {
            Self::NotFound(msg) => msg.clone(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::Unavailable(_) => "Database unavailable".to_string(),
            Self::Upstream(_) => "Upstream catalog request failed".to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.public_message();
        (status, body)
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
