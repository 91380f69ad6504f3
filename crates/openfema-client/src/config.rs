//! Client configuration and builder pattern.

use crate::error::{ClientError, Result};
use std::fmt;
use std::time::Duration;

/// Default location of the OpenFEMA OpenAPI document, without extension.
pub const DEFAULT_METADATA_URL: &str = "https://www.fema.gov/api/open/metadata/v3.0/OpenApi";

/// Largest `$top` the API accepts for a single request.
pub const MAX_PAGE_SIZE: u64 = 10_000;

/// Serialization of the OpenAPI metadata document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataFormat {
    /// `OpenApi.json`
    #[default]
    Json,
    /// `OpenApi.yaml`
    Yaml,
}

impl MetadataFormat {
    /// File extension appended to the metadata URL.
    pub fn extension(&self) -> &'static str {
        match self {
            MetadataFormat::Json => "json",
            MetadataFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for MetadataFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(MetadataFormat::Json),
            "yaml" | "yml" => Ok(MetadataFormat::Yaml),
            other => Err(ClientError::Config(format!(
                "metadata format '{}' is not available, expected 'json' or 'yaml'",
                other
            ))),
        }
    }
}

/// Configuration for the OpenFEMA client.
#[derive(Clone)]
pub struct ClientConfig {
    /// OpenAPI metadata endpoint without extension
    pub metadata_url: String,
    /// Format of the metadata endpoint (default: JSON)
    pub metadata_format: MetadataFormat,
    /// Request timeout (default: 30 seconds)
    pub timeout: Duration,
    /// Maximum number of retries for transient failures (default: 3)
    pub max_retries: u32,
    /// Initial retry delay for exponential backoff (default: 100ms)
    pub retry_initial_delay: Duration,
    /// Maximum retry delay (default: 10 seconds)
    pub retry_max_delay: Duration,
    /// Rows requested per page (default and maximum: 10000)
    pub page_size: u64,
    /// Hard cap on rows returned by one read (default: unlimited)
    pub max_rows: Option<u64>,
    /// Whether to verify TLS certificates (default: true)
    pub tls_verify: bool,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            metadata_format: MetadataFormat::Json,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_initial_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_secs(10),
            page_size: MAX_PAGE_SIZE,
            max_rows: None,
            tls_verify: true,
            user_agent: format!("openfema-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("metadata_url", &self.metadata_url)
            .field("metadata_format", &self.metadata_format)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("page_size", &self.page_size)
            .field("max_rows", &self.max_rows)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Create a new configuration builder with the default metadata endpoint.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new(DEFAULT_METADATA_URL)
    }

    /// Minimum allowed timeout value.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Full URL of the metadata document, extension included.
    pub fn metadata_document_url(&self) -> String {
        format!("{}.{}", self.metadata_url, self.metadata_format.extension())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.metadata_url.is_empty() {
            return Err(ClientError::Config(
                "metadata_url cannot be empty".to_string(),
            ));
        }

        url::Url::parse(&self.metadata_url)
            .map_err(|e| ClientError::Config(format!("Invalid metadata_url: {}", e)))?;

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ClientError::Config(format!(
                "page_size ({}) must be between 1 and {}",
                self.page_size, MAX_PAGE_SIZE
            )));
        }

        if self.max_rows == Some(0) {
            return Err(ClientError::Config(
                "max_rows must be > 0 when set".to_string(),
            ));
        }

        if self.retry_initial_delay > self.retry_max_delay {
            return Err(ClientError::Config(format!(
                "retry_initial_delay ({:?}) must be <= retry_max_delay ({:?})",
                self.retry_initial_delay, self.retry_max_delay
            )));
        }

        if self.timeout < Self::MIN_TIMEOUT {
            return Err(ClientError::Config(format!(
                "timeout ({:?}) must be >= {:?}",
                self.timeout,
                Self::MIN_TIMEOUT
            )));
        }

        Ok(())
    }
}

/// Builder for client configuration.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder reading metadata from the given endpoint.
    pub fn new(metadata_url: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                metadata_url: metadata_url.into(),
                ..Default::default()
            },
        }
    }

    /// Set the OpenAPI metadata endpoint (without extension).
    pub fn metadata_url(mut self, url: impl Into<String>) -> Self {
        self.config.metadata_url = url.into();
        self
    }

    /// Set the metadata document format.
    pub fn metadata_format(mut self, format: MetadataFormat) -> Self {
        self.config.metadata_format = format;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the initial retry delay for exponential backoff.
    pub fn retry_initial_delay(mut self, delay: Duration) -> Self {
        self.config.retry_initial_delay = delay;
        self
    }

    /// Set the maximum retry delay.
    pub fn retry_max_delay(mut self, delay: Duration) -> Self {
        self.config.retry_max_delay = delay;
        self
    }

    /// Set the number of rows requested per page.
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Cap the number of rows any single read returns.
    pub fn max_rows(mut self, max_rows: u64) -> Self {
        self.config.max_rows = Some(max_rows);
        self
    }

    /// Set whether to verify TLS certificates.
    pub fn tls_verify(mut self, verify: bool) -> Self {
        self.config.tls_verify = verify;
        self
    }

    /// Set a custom User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.metadata_url, DEFAULT_METADATA_URL);
        assert_eq!(config.metadata_format, MetadataFormat::Json);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.page_size, MAX_PAGE_SIZE);
        assert!(config.max_rows.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder()
            .metadata_url("http://localhost:8080/metadata/OpenApi")
            .metadata_format(MetadataFormat::Yaml)
            .timeout(Duration::from_secs(60))
            .max_retries(5)
            .page_size(500)
            .max_rows(2_000)
            .build()
            .unwrap();

        assert_eq!(
            config.metadata_document_url(),
            "http://localhost:8080/metadata/OpenApi.yaml"
        );
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.page_size, 500);
        assert_eq!(config.max_rows, Some(2_000));
    }

    #[test]
    fn test_invalid_url() {
        let result = ClientConfigBuilder::new("not a valid url").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_url() {
        let result = ClientConfigBuilder::new("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(ClientConfig::builder().page_size(0).build().is_err());
        assert!(ClientConfig::builder()
            .page_size(MAX_PAGE_SIZE + 1)
            .build()
            .is_err());
        assert!(ClientConfig::builder()
            .page_size(MAX_PAGE_SIZE)
            .build()
            .is_ok());
    }

    #[test]
    fn test_zero_max_rows_rejected() {
        let err = ClientConfig::builder().max_rows(0).build().unwrap_err();
        assert!(err.to_string().contains("max_rows"));
    }

    #[test]
    fn test_retry_delay_validation_invalid() {
        let result = ClientConfig::builder()
            .retry_initial_delay(Duration::from_secs(10))
            .retry_max_delay(Duration::from_secs(1))
            .build();

        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("retry_initial_delay"),
            "Error should mention retry_initial_delay"
        );
    }

    #[test]
    fn test_timeout_too_small() {
        let result = ClientConfig::builder()
            .timeout(Duration::from_millis(50))
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_timeout_at_minimum() {
        let result = ClientConfig::builder()
            .timeout(ClientConfig::MIN_TIMEOUT)
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_metadata_format_from_str() {
        assert_eq!("JSON".parse::<MetadataFormat>().unwrap(), MetadataFormat::Json);
        assert_eq!("yml".parse::<MetadataFormat>().unwrap(), MetadataFormat::Yaml);
        assert!("xml".parse::<MetadataFormat>().is_err());
    }
}
