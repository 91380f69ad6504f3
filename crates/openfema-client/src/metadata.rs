//! OpenAPI metadata and the dataset catalog.
//!
//! The OpenAPI document names the production server, the path of the
//! `DataSets` catalog and, under `components.schemas`, the fields of every
//! dataset keyed as `v{version}-{name}`. [`Catalog`] joins catalog rows with
//! those schemas once at start-up; afterwards it is read-only.

use crate::config::MetadataFormat;
use crate::error::{ClientError, Result};
use crate::types::{DatasetEntry, DatasetInfo, FieldInfo};
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Marker shared by the catalog's own metadata datasets.
const METADATA_MARKER: &str = "DataSet";

/// More marker matches than this means real datasets might carry the marker.
const MAX_METADATA_DATASETS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
struct Server {
    url: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Components {
    #[serde(default)]
    schemas: HashMap<String, SchemaObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SchemaObject {
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Property {
    #[serde(default, rename = "type")]
    data_type: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// The parts of the OpenFEMA OpenAPI document the client uses.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenApiDocument {
    #[serde(default)]
    servers: Vec<Server>,
    #[serde(default)]
    paths: BTreeMap<String, IgnoredAny>,
    #[serde(default)]
    components: Components,
}

impl OpenApiDocument {
    /// Parse a document in the given format.
    pub fn parse(body: &[u8], format: MetadataFormat) -> Result<Self> {
        match format {
            MetadataFormat::Json => Ok(serde_json::from_slice(body)?),
            MetadataFormat::Yaml => Ok(serde_yaml::from_slice(body)?),
        }
    }

    /// URL of the production API server.
    ///
    /// Falls back to the first listed server when none is labelled
    /// `Production`.
    pub fn server_url(&self) -> Result<&str> {
        self.servers
            .iter()
            .find(|s| s.description.as_deref() == Some("Production"))
            .or_else(|| self.servers.first())
            .map(|s| s.url.trim_end_matches('/'))
            .ok_or_else(|| ClientError::Metadata("OpenAPI document lists no servers".to_string()))
    }

    /// Path of the `DataSets` catalog endpoint (e.g. `/v1/DataSets`).
    pub fn catalog_path(&self) -> Result<&str> {
        let candidates: Vec<&str> = self
            .paths
            .keys()
            .map(String::as_str)
            .filter(|p| p.contains("DataSets"))
            .collect();

        match candidates.as_slice() {
            [path] => Ok(path),
            [] => Err(ClientError::Metadata(
                "No DataSets catalog path in the OpenAPI document".to_string(),
            )),
            many => Err(ClientError::Metadata(format!(
                "Multiple possible catalog paths in the OpenAPI document: {}",
                many.join(", ")
            ))),
        }
    }

    /// Full URL of the catalog endpoint.
    pub fn catalog_url(&self) -> Result<url::Url> {
        let raw = format!("{}{}", self.server_url()?, self.catalog_path()?);
        url::Url::parse(&raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    /// Fields of the schema published under `key`, in document order.
    ///
    /// Returns `None` when the document has no such schema.
    pub fn fields(&self, key: &str) -> Option<Vec<FieldInfo>> {
        let schema = self.components.schemas.get(key)?;
        let fields = schema
            .properties
            .iter()
            .map(|(name, raw)| {
                let property = Property::deserialize(raw).unwrap_or_else(|e| {
                    tracing::debug!(
                        schema = %key,
                        field = %name,
                        error = %e,
                        "Unreadable schema property, treating field as text"
                    );
                    Property::default()
                });
                let mut field = FieldInfo::new(name.clone(), property.data_type, property.format);
                field.description = property.description;
                field
            })
            .collect();
        Some(fields)
    }
}

/// Last path segment of a URL; the API keys JSON records by it.
pub(crate) fn entity_name(url: &url::Url) -> Result<String> {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| ClientError::InvalidUrl(format!("No dataset segment in {}", url)))
}

/// Datasets known to the API, with their schemas.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    datasets: Vec<DatasetInfo>,
}

impl Catalog {
    /// Join catalog rows with their OpenAPI schemas.
    pub fn new(entries: Vec<DatasetEntry>, document: &OpenApiDocument) -> Self {
        let datasets = entries
            .into_iter()
            .map(|entry| {
                let fields = document.fields(&entry.schema_key()).unwrap_or_else(|| {
                    tracing::debug!(
                        dataset = %entry.name,
                        schema = %entry.schema_key(),
                        "No schema published for dataset"
                    );
                    Vec::new()
                });
                DatasetInfo { entry, fields }
            })
            .collect();
        Self { datasets }
    }

    /// Sorted, distinct dataset names without the catalog's own metadata
    /// datasets.
    pub fn dataset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.datasets.iter().map(|d| d.entry.name.clone()).collect();
        names.sort();
        names.dedup();

        let markers: Vec<&String> = names
            .iter()
            .filter(|n| n.contains(METADATA_MARKER))
            .collect();

        if markers.len() > MAX_METADATA_DATASETS {
            tracing::warn!(
                datasets = ?markers,
                "Several dataset names look like catalog metadata, keeping them all"
            );
            return names;
        }

        names.retain(|n| !n.contains(METADATA_MARKER));
        names
    }

    /// First catalog entry with the given name.
    pub fn get(&self, name: &str) -> Result<&DatasetInfo> {
        self.datasets
            .iter()
            .find(|d| d.entry.name == name)
            .ok_or_else(|| {
                ClientError::NotFound(format!(
                    "The specified dataset of {} was not found in the dataset list",
                    name
                ))
            })
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}
