//! Custom error types for news operations

use thiserror::Error;

/// News bot and backend client errors
#[derive(Error, Debug)]
pub enum NewsError {
    /// API request failed
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Retry after {retry_after:?} seconds")]
    RateLimitError {
        retry_after: Option<u64>,
    },

    /// Token quota exceeded
    #[error("Token quota exceeded for today")]
    QuotaExceededError,

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// Request timeout
    #[error("Request timeout")]
    TimeoutError,

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Backend database rejected a request
    #[error("Database error on {table}: {status} - {message}")]
    DatabaseError {
        table: String,
        status: u16,
        message: String,
    },

    /// Feed could not be fetched or parsed
    #[error("Feed error: {feed} - {message}")]
    FeedError {
        feed: String,
        message: String,
    },

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField {
        field: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
}

impl From<anyhow::Error> for NewsError {
    fn from(err: anyhow::Error) -> Self {
        NewsError::InternalError(err.to_string())
    }
}

impl NewsError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        NewsError::ConfigError {
            message: message.into(),
        }
    }

    /// Whether retrying the same request can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            NewsError::QuotaExceededError
            | NewsError::ConfigError { .. }
            | NewsError::MissingField { .. } => false,
            NewsError::ApiError { status, .. } => *status >= 500,
            _ => true,
        }
    }

    /// Whether later items in the same run would fail the same way
    pub fn halts_run(&self) -> bool {
        matches!(
            self,
            NewsError::QuotaExceededError | NewsError::ConfigError { .. }
        )
    }
}

/// Result type for news operations
pub type Result<T> = std::result::Result<T, NewsError>;
