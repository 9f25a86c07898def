use thiserror::Error;

/// Error types for market data and news search operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("API error: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No data available for {symbol} between {start} and {end}")]
    NoData {
        symbol: String,
        start: String,
        end: String,
    },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for data operations
pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::Network(_) => true,
            DataError::Api { status_code, .. } => {
                // Retry on server errors (5xx) and rate limiting (429)
                *status_code >= 500 || *status_code == 429
            }
            _ => false,
        }
    }

    /// Create a parse error with context
    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        DataError::Parse {
            message: message.into(),
        }
    }

    /// Create an API error with status code
    pub fn api_error<S: Into<String>>(status_code: u16, message: S) -> Self {
        DataError::Api {
            status_code,
            message: message.into(),
        }
    }
}
