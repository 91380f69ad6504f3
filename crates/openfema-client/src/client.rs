//! HTTP client with retry logic and paged reads.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::metadata::{entity_name, Catalog, OpenApiDocument};
use crate::pager::{decode_page, Pager, ResponseFormat, Row};
use crate::query::{encode_params, Query, QueryBuilder};
use crate::table::Table;
use crate::types::{DatasetEntry, DatasetInfo};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    policies::ExponentialBackoff, RetryTransientMiddleware, Retryable, RetryableStrategy,
};
use std::time::Duration;

/// OpenFEMA client holding the dataset catalog loaded at start-up.
pub struct OpenFemaClient {
    http: ClientWithMiddleware,
    config: ClientConfig,
    catalog: Catalog,
}

impl OpenFemaClient {
    /// Create a new configuration builder.
    pub fn builder() -> crate::config::ClientConfigBuilder {
        ClientConfig::builder()
    }

    /// Connect with the given configuration, loading the OpenAPI document
    /// and the dataset catalog.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = build_http_client(&config)?;

        let mut client = Self {
            http,
            config,
            catalog: Catalog::default(),
        };

        let document = client.fetch_document().await?;
        let catalog_url = document.catalog_url()?;
        let entity = entity_name(&catalog_url)?;

        tracing::debug!(url = %catalog_url, "Loading dataset catalog");

        let params = vec![
            ("$format", ResponseFormat::Json.as_str().to_string()),
            ("$metadata", "off".to_string()),
        ];
        let rows = client
            .fetch_rows(&catalog_url, &entity, &params, ResponseFormat::Json, None, None)
            .await?;

        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                serde_json::from_value::<DatasetEntry>(serde_json::Value::Object(row)).map_err(
                    |e| ClientError::Decode(format!("Invalid catalog row {}: {}", index, e)),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        client.catalog = Catalog::new(entries, &document);

        tracing::info!(datasets = client.catalog.len(), "Loaded OpenFEMA catalog");

        Ok(client)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Names of all non-metadata datasets, sorted.
    pub fn list_datasets(&self) -> Vec<String> {
        self.catalog.dataset_names()
    }

    /// Catalog entry and fields of one dataset.
    pub fn dataset_info(&self, name: &str) -> Result<DatasetInfo> {
        self.catalog.get(name).cloned()
    }

    /// Start a query against one dataset.
    ///
    /// Fails with `NotFound` for an unknown dataset; the returned builder
    /// rejects unknown fields when it is built.
    pub fn query(&self, name: &str) -> Result<QueryBuilder> {
        let dataset = self.catalog.get(name)?;
        Ok(QueryBuilder::for_dataset(dataset.clone()))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read a dataset into a table.
    ///
    /// Field names are validated before any request is sent. Pages are
    /// fetched sequentially until a short page or the row cap. Without an
    /// explicit format the dataset's catalog distributions decide: CSV, then
    /// JSONA, then JSON.
    pub async fn read_dataset(&self, name: &str, query: &Query) -> Result<Table> {
        let dataset = self.catalog.get(name)?;
        query.validate(dataset)?;

        let web_service = dataset.entry.web_service.as_deref().ok_or_else(|| {
            ClientError::Metadata(format!("Dataset '{}' has no web service URL", name))
        })?;
        let url = url::Url::parse(web_service)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", web_service, e)))?;

        let limit = match (query.top(), self.config.max_rows) {
            (Some(top), Some(cap)) => Some(top.min(cap)),
            (top, cap) => top.or(cap),
        };

        let format = query
            .format()
            .unwrap_or_else(|| dataset.entry.preferred_format());

        let rows = self
            .fetch_rows(
                &url,
                &dataset.entry.name,
                &query.params_for(format),
                format,
                query.skip(),
                limit,
            )
            .await?;

        Table::assemble(rows, &dataset.fields, query.columns(), query.parse_dates())
    }

    /// Read every row of a dataset.
    pub async fn read_all(&self, name: &str) -> Result<Table> {
        self.read_dataset(name, &Query::default()).await
    }

    // =========================================================================
    // Internal HTTP Methods
    // =========================================================================

    async fn fetch_document(&self) -> Result<OpenApiDocument> {
        let url = self.config.metadata_document_url();
        let url = url::Url::parse(&url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let body = match self.get_bytes(&url).await {
            Err(ClientError::NotFound(_)) => {
                return Err(ClientError::Metadata(format!(
                    "The OpenAPI metadata endpoint {} is not valid",
                    url
                )))
            }
            other => other?,
        };

        OpenApiDocument::parse(&body, self.config.metadata_format)
    }

    /// Fetch all pages of a result set.
    async fn fetch_rows(
        &self,
        base: &url::Url,
        entity: &str,
        params: &[(&'static str, String)],
        format: ResponseFormat,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<Row>> {
        let mut pager = Pager::new(self.config.page_size, skip.unwrap_or(0), limit);
        let mut rows = Vec::new();

        while let Some(page) = pager.next_page() {
            let mut page_params = params.to_vec();
            page_params.push(("$top", page.top.to_string()));
            page_params.push(("$skip", page.skip.to_string()));

            let mut url = base.clone();
            url.set_query(Some(&encode_params(&page_params)));

            let body = self.get_bytes(&url).await?;
            let mut page_rows = decode_page(&body, format, entity)?;
            page_rows.truncate(page.top as usize);

            tracing::debug!(
                dataset = %entity,
                skip = page.skip,
                top = page.top,
                rows = page_rows.len(),
                "Fetched page"
            );

            pager.advance(page, page_rows.len() as u64);
            rows.extend(page_rows);
        }

        tracing::debug!(dataset = %entity, rows = pager.fetched(), %format, "Read complete");

        Ok(rows)
    }

    /// Perform a GET request and return the response body.
    async fn get_bytes(&self, url: &url::Url) -> Result<Vec<u8>> {
        let start = std::time::Instant::now();

        tracing::debug!(url = %url, "Sending request");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        let duration = start.elapsed();

        tracing::debug!(
            path = %url.path(),
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Received response"
        );

        if status.is_success() {
            return Ok(response.bytes().await?.to_vec());
        }

        let retry_after = Self::parse_retry_after(response.headers());
        let message = response
            .bytes()
            .await
            .ok()
            .map(|b| String::from_utf8_lossy(&b).trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.to_string());

        tracing::warn!(
            path = %url.path(),
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            error = %message,
            "Request failed"
        );

        Err(Self::status_to_error(status, message, retry_after))
    }

    /// Convert HTTP status to appropriate error type.
    fn status_to_error(
        status: StatusCode,
        message: String,
        retry_after: Option<Duration>,
    ) -> ClientError {
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited { retry_after },
            s if s.is_server_error() => ClientError::ServerError {
                status: s.as_u16(),
                message,
            },
            _ => ClientError::Rejected {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Parse the Retry-After header value into a Duration.
    ///
    /// Supports both formats per RFC 7231:
    /// - Seconds: "120" -> Duration::from_secs(120)
    /// - HTTP-date: "Fri, 31 Dec 2024 23:59:59 GMT" -> Duration until that time
    fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
        let header_value = headers.get("retry-after")?.to_str().ok()?;

        if let Ok(seconds) = header_value.parse::<u64>() {
            return Some(Duration::from_secs(seconds));
        }

        if let Ok(date) = httpdate::parse_http_date(header_value) {
            let now = std::time::SystemTime::now();
            return Some(date.duration_since(now).unwrap_or(Duration::ZERO));
        }

        None
    }
}

fn build_http_client(config: &ClientConfig) -> Result<ClientWithMiddleware> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/csv;q=0.9, */*;q=0.5"),
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("openfema-client")),
    );

    let reqwest_client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .danger_accept_invalid_certs(!config.tls_verify)
        .build()?;

    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(config.retry_initial_delay, config.retry_max_delay)
        .build_with_max_retries(config.max_retries);

    Ok(ClientBuilder::new(reqwest_client)
        .with(RetryTransientMiddleware::new_with_policy_and_strategy(
            retry_policy,
            OpenFemaRetryStrategy,
        ))
        .build())
}

/// Retry strategy for the read-only API.
///
/// Retries on transient network errors, 5xx server errors and 429 rate
/// limiting. Other 4xx responses are returned immediately. Every request the
/// client sends is a GET, so all retries are idempotent.
struct OpenFemaRetryStrategy;

impl RetryableStrategy for OpenFemaRetryStrategy {
    fn handle(&self, res: &reqwest_middleware::Result<reqwest::Response>) -> Option<Retryable> {
        match res {
            Ok(response) => {
                let status = response.status();
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    Some(Retryable::Transient)
                } else if status.is_success() {
                    None
                } else {
                    Some(Retryable::Fatal)
                }
            }
            Err(error) => {
                if error.is_timeout() || error.is_connect() {
                    Some(Retryable::Transient)
                } else {
                    Some(Retryable::Fatal)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("120"));

        let result = OpenFemaClient::parse_retry_after(&headers);
        assert_eq!(result, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_retry_after_past_date() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_static("Fri, 31 Dec 1999 23:59:59 GMT"),
        );

        let result = OpenFemaClient::parse_retry_after(&headers);
        assert_eq!(result, Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_retry_after_missing_or_invalid() {
        let headers = HeaderMap::new();
        assert_eq!(OpenFemaClient::parse_retry_after(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("not-a-number"));
        assert_eq!(OpenFemaClient::parse_retry_after(&headers), None);
    }

    #[test]
    fn test_status_to_error() {
        assert!(matches!(
            OpenFemaClient::status_to_error(StatusCode::NOT_FOUND, "gone".into(), None),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            OpenFemaClient::status_to_error(StatusCode::BAD_GATEWAY, "down".into(), None),
            ClientError::ServerError { status: 502, .. }
        ));
        assert!(matches!(
            OpenFemaClient::status_to_error(StatusCode::BAD_REQUEST, "bad $filter".into(), None),
            ClientError::Rejected { status: 400, .. }
        ));
    }
}
