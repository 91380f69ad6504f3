//! Error types for the OpenFEMA client.

use std::time::Duration;

/// Errors that can occur when using the OpenFEMA client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport error surfaced by the retry middleware
    #[error("HTTP request error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// Dataset absent from the catalog, or a 404 from the API
    #[error("Dataset not found: {0}")]
    NotFound(String),

    /// A column, filter or sort field that the dataset schema does not define
    #[error("Invalid field '{field}' for dataset '{dataset}'")]
    InvalidField {
        /// Dataset the query targeted
        dataset: String,
        /// Offending field name
        field: String,
    },

    /// Rate limited (429)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Optional retry-after duration from server
        retry_after: Option<Duration>,
    },

    /// Server error (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
    },

    /// Any other non-success status (4xx other than 404 and 429)
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
    },

    /// Malformed page, metadata row, or a value that cannot take its column type
    #[error("Decode error: {0}")]
    Decode(String),

    /// The OpenAPI metadata lacks something the client relies on
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Query validation error (operator, value, options)
    #[error("Validation error: {0}")]
    Validation(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML metadata could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Arrow conversion error (when the arrow feature is enabled)
    #[cfg(feature = "arrow")]
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl ClientError {
    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RateLimited { .. } => true,
            ClientError::ServerError { status, .. } => *status >= 500,
            ClientError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns true if the error was raised while validating a query, before
    /// any request was sent.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidField { .. } | ClientError::Validation(_)
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let rate_limited = ClientError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert!(rate_limited.is_retryable());

        let server_error = ClientError::ServerError {
            status: 503,
            message: "Service unavailable".to_string(),
        };
        assert!(server_error.is_retryable());

        let not_found = ClientError::NotFound("test".to_string());
        assert!(!not_found.is_retryable());

        let rejected = ClientError::Rejected {
            status: 400,
            message: "bad filter".to_string(),
        };
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_invalid_field_message() {
        let err = ClientError::InvalidField {
            dataset: "FimaNfipPolicies".to_string(),
            field: "nope".to_string(),
        };
        assert!(err.is_query_error());
        assert_eq!(
            err.to_string(),
            "Invalid field 'nope' for dataset 'FimaNfipPolicies'"
        );
    }
}
