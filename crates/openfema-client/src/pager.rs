//! Page planning and page decoding.
//!
//! The API caps every response at `$top` rows, so a read walks the result
//! set with `$skip`. [`Pager`] decides the `$top`/`$skip` of each request and
//! when to stop; [`decode_page`] turns one response body into rows.

use crate::error::{ClientError, Result};
use std::fmt;

/// One decoded record: field name to raw JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Wire format requested with `$format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// `{"<dataset>": [...]}` objects
    #[default]
    Json,
    /// Bare JSON arrays
    Jsona,
    /// Comma-separated values with a header row
    Csv,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Jsona => "jsona",
            ResponseFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResponseFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ResponseFormat::Json),
            "jsona" => Ok(ResponseFormat::Jsona),
            "csv" => Ok(ResponseFormat::Csv),
            other => Err(ClientError::Validation(format!(
                "The file format of {} is not supported",
                other
            ))),
        }
    }
}

/// `$top`/`$skip` of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: u64,
    pub top: u64,
}

/// Walks a result set page by page.
///
/// Stops after a short page or once `limit` rows have been fetched.
#[derive(Debug, Clone)]
pub struct Pager {
    page_size: u64,
    start: u64,
    limit: Option<u64>,
    fetched: u64,
    done: bool,
}

impl Pager {
    pub fn new(page_size: u64, start: u64, limit: Option<u64>) -> Self {
        Self {
            page_size: page_size.max(1),
            start,
            limit,
            fetched: 0,
            done: limit == Some(0),
        }
    }

    /// Next request to issue, or `None` once the result set is exhausted.
    pub fn next_page(&self) -> Option<PageRequest> {
        if self.done {
            return None;
        }
        let top = match self.limit {
            Some(limit) => self.page_size.min(limit - self.fetched),
            None => self.page_size,
        };
        Some(PageRequest {
            skip: self.start + self.fetched,
            top,
        })
    }

    /// Record that `request` returned `received` rows.
    pub fn advance(&mut self, request: PageRequest, received: u64) {
        let received = received.min(request.top);
        self.fetched += received;
        if received < request.top || self.limit.is_some_and(|limit| self.fetched >= limit) {
            self.done = true;
        }
    }

    /// Rows fetched so far.
    pub fn fetched(&self) -> u64 {
        self.fetched
    }
}

/// Decode one response body.
///
/// JSON bodies are either an object holding the rows under `entity` (next
/// to an optional `metadata` key) or a bare array.
pub fn decode_page(body: &[u8], format: ResponseFormat, entity: &str) -> Result<Vec<Row>> {
    match format {
        ResponseFormat::Json | ResponseFormat::Jsona => decode_json(body, entity),
        ResponseFormat::Csv => decode_csv(body),
    }
}

fn decode_json(body: &[u8], entity: &str) -> Result<Vec<Row>> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        ClientError::Decode(format!(
            "Failed to parse response: {} (body: {})",
            e,
            preview(body)
        ))
    })?;

    let records = match value {
        serde_json::Value::Array(records) => records,
        serde_json::Value::Object(mut object) => match object.remove(entity) {
            Some(serde_json::Value::Array(records)) => records,
            Some(_) => {
                return Err(ClientError::Decode(format!(
                    "'{}' in response is not an array",
                    entity
                )))
            }
            None => {
                return Err(ClientError::Decode(format!(
                    "Response has no '{}' records (keys: {})",
                    entity,
                    object.keys().cloned().collect::<Vec<_>>().join(", ")
                )))
            }
        },
        other => {
            return Err(ClientError::Decode(format!(
                "Unexpected response shape: {}",
                other
            )))
        }
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| match record {
            serde_json::Value::Object(row) => Ok(row),
            other => Err(ClientError::Decode(format!(
                "Record {} is not an object: {}",
                index, other
            ))),
        })
        .collect()
}

/// Every CSV cell is text; an empty cell is a missing value in any column.
fn decode_csv(body: &[u8]) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body);

    let headers = reader
        .headers()
        .map_err(|e| ClientError::Decode(format!("Invalid CSV header: {}", e)))?
        .clone();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| ClientError::Decode(format!("Invalid CSV record {}: {}", index, e)))?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, cell)| {
                let value = if cell.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(cell.to_string())
                };
                (name.to_string(), value)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn preview(body: &[u8]) -> String {
    const LIMIT: usize = 256;
    let text = String::from_utf8_lossy(body);
    if text.chars().count() > LIMIT {
        format!("{}...", text.chars().take(LIMIT).collect::<String>())
    } else {
        text.into_owned()
    }
}
