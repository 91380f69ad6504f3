//! OpenFEMA Client
//!
//! A Rust client that reads datasets from the public
//! [OpenFEMA API](https://www.fema.gov/about/openfema/api) into in-memory
//! tables.
//!
//! # Features
//!
//! - **Catalog**: the dataset catalog and OpenAPI field metadata are loaded
//!   once when the client connects
//! - **Queries**: column selection, AND/OR filter groups, multi-key sorting
//!   and row windows, serialized to the API's `$select`/`$filter`/`$orderby`
//!   parameters
//! - **Paging**: results larger than one page are fetched page by page and
//!   concatenated in server order
//! - **Automatic Retries**: exponential backoff for transient failures
//! - **Arrow**: (optional) convert result tables into Arrow record batches
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use openfema_client::{ClientConfig, OpenFemaClient, Operator, Predicate, Query};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenFemaClient::connect(ClientConfig::builder().build()?).await?;
//!
//!     for name in client.list_datasets().iter().take(5) {
//!         println!("{}", name);
//!     }
//!
//!     let query = Query::builder()
//!         .columns(["propertyState", "policyCost", "policyEffectiveDate"])
//!         .filter_group([Predicate::new("femaRegion", Operator::Eq, 1)])
//!         .sort("policyCost", false)
//!         .top(100)
//!         .parse_dates(true)
//!         .build()?;
//!
//!     let table = client.read_dataset("FimaNfipPolicies", &query).await?;
//!     println!("{} rows", table.num_rows());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, ClientError>`. Errors include:
//!
//! - `NotFound`: dataset absent from the catalog
//! - `InvalidField`: a column, filter or sort field the dataset does not have;
//!   raised before any request is sent
//! - `Decode`: malformed response or a value that does not fit its column
//! - `ServerError` / `RateLimited`: returned after retries are exhausted

pub mod client;
pub mod config;
pub mod error;
pub mod metadata;
pub mod pager;
pub mod query;
pub mod table;
pub mod types;

// Re-exports for convenience
pub use client::OpenFemaClient;
pub use config::{ClientConfig, ClientConfigBuilder, MetadataFormat};
pub use error::{ClientError, Result};
pub use metadata::{Catalog, OpenApiDocument};
pub use pager::{ResponseFormat, Row};
pub use query::{FilterValue, Operator, Predicate, Query, QueryBuilder, SortKey};
pub use table::{Column, ColumnType, Table, Value};
pub use types::{DatasetEntry, DatasetInfo, Distribution, FieldInfo};
