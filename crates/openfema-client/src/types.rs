//! Catalog types for the OpenFEMA API.
//!
//! These types mirror the rows of the `DataSets` catalog and the field
//! definitions of the OpenAPI document.

use crate::pager::ResponseFormat;
use crate::table::{parse_datetime, ColumnType};
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// One row of the `DataSets` catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetEntry {
    /// Dataset name as used in API paths (e.g. `FimaNfipPolicies`)
    pub name: String,
    /// Human-readable title
    #[serde(default)]
    pub title: Option<String>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// API version of the dataset endpoint
    #[serde(default = "default_version", deserialize_with = "lenient_u32")]
    pub version: u32,
    /// Endpoint serving the dataset rows
    #[serde(default)]
    pub web_service: Option<String>,
    /// Number of records in the dataset (if published)
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub record_count: Option<u64>,
    /// When the dataset was last refreshed
    #[serde(default, deserialize_with = "lenient_opt_datetime")]
    pub last_refresh: Option<DateTime<Utc>>,
    /// Available downloadable distributions
    #[serde(default, deserialize_with = "distributions")]
    pub distribution: Vec<Distribution>,
    /// Remaining catalog columns
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_version() -> u32 {
    1
}

impl DatasetEntry {
    /// File formats listed in the distributions, in catalog order.
    pub fn formats(&self) -> Vec<&str> {
        self.distribution.iter().map(|d| d.format.as_str()).collect()
    }

    /// Wire format to read when the caller does not pick one: CSV, then
    /// JSONA, when the catalog lists them, otherwise JSON.
    pub fn preferred_format(&self) -> ResponseFormat {
        let formats = self.formats();
        let listed = |name: &str| formats.iter().any(|f| f.eq_ignore_ascii_case(name));
        if listed("csv") {
            ResponseFormat::Csv
        } else if listed("jsona") {
            ResponseFormat::Jsona
        } else {
            ResponseFormat::Json
        }
    }

    /// Name under which the OpenAPI document publishes this dataset's schema.
    pub fn schema_key(&self) -> String {
        format!("v{}-{}", self.version, self.name)
    }
}

/// A downloadable distribution of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// File format (csv, json, jsona, parquet, geojson)
    pub format: String,
    /// Download URL
    #[serde(default, rename = "accessURL")]
    pub access_url: Option<String>,
    /// Published size description
    #[serde(default, rename = "datasetSize", deserialize_with = "lenient_opt_string")]
    pub dataset_size: Option<String>,
}

/// Field metadata for one dataset column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// OpenAPI `type` (string, integer, number, boolean)
    pub data_type: Option<String>,
    /// OpenAPI `format` (date-time, int32, double, ...)
    pub format: Option<String>,
    /// Field description
    pub description: Option<String>,
    /// Column type derived from `data_type` and `format`
    pub column_type: ColumnType,
}

impl FieldInfo {
    /// Create field metadata from OpenAPI `type` and `format`.
    pub fn new(name: impl Into<String>, data_type: Option<String>, format: Option<String>) -> Self {
        let column_type = ColumnType::from_openapi(data_type.as_deref(), format.as_deref());
        Self {
            name: name.into(),
            data_type,
            format,
            description: None,
            column_type,
        }
    }
}

/// Catalog entry together with its schema fields.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    /// Catalog row
    #[serde(flatten)]
    pub entry: DatasetEntry,
    /// Schema fields in document order; empty when the schema is unpublished
    pub fields: Vec<FieldInfo>,
}

impl DatasetInfo {
    /// Dataset name.
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Returns true if the OpenAPI document describes this dataset's fields.
    pub fn schema_known(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in schema order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

// Catalog rows come from several API generations: the same column may be a
// number or a numeric string, and distributions may be JSON-encoded strings.

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Float(f64),
    String(String),
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => u32::try_from(n).map_err(de::Error::custom),
        NumberOrString::Float(f) if f.fract() == 0.0 && f >= 0.0 => Ok(f as u32),
        NumberOrString::Float(f) => Err(de::Error::custom(format!("invalid version {}", f))),
        NumberOrString::String(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

fn lenient_opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Float(f)) => Ok(Some(f as u64)),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::String(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        None => None,
        Some(NumberOrString::Number(n)) => Some(n.to_string()),
        Some(NumberOrString::Float(f)) => Some(f.to_string()),
        Some(NumberOrString::String(s)) => Some(s),
    })
}

fn lenient_opt_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_datetime(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", s))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDistribution {
    Object(Distribution),
    Encoded(String),
}

fn distributions<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Distribution>, D::Error> {
    let raw = Option::<Vec<RawDistribution>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|item| match item {
            RawDistribution::Object(d) => Ok(d),
            RawDistribution::Encoded(s) => serde_json::from_str(&s).map_err(de::Error::custom),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_entry_deserialize() {
        let json = r#"{
            "name": "FimaNfipPolicies",
            "title": "FIMA NFIP Redacted Policies",
            "description": "Policy transactions",
            "version": 2,
            "webService": "https://www.fema.gov/api/open/v2/FimaNfipPolicies",
            "recordCount": 72000000,
            "lastRefresh": "2024-05-01T00:00:00.000Z",
            "distribution": [
                {"accessURL": "https://www.fema.gov/api/open/v2/FimaNfipPolicies.csv", "format": "csv", "datasetSize": "Large (over 50MB)"},
                {"accessURL": "https://www.fema.gov/api/open/v2/FimaNfipPolicies.parquet", "format": "parquet"}
            ],
            "publisher": "FEMA"
        }"#;

        let entry: DatasetEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.name, "FimaNfipPolicies");
        assert_eq!(entry.version, 2);
        assert_eq!(entry.record_count, Some(72_000_000));
        assert_eq!(entry.formats(), vec!["csv", "parquet"]);
        assert_eq!(entry.schema_key(), "v2-FimaNfipPolicies");
        assert_eq!(entry.extra.get("publisher").unwrap(), "FEMA");
        assert_eq!(
            entry.last_refresh.unwrap().to_rfc3339(),
            "2024-05-01T00:00:00+00:00"
        );
        assert_eq!(entry.preferred_format(), ResponseFormat::Csv);
    }

    #[test]
    fn test_last_refresh_variants() {
        let entry: DatasetEntry =
            serde_json::from_str(r#"{"name": "A", "lastRefresh": "2023-11-02"}"#).unwrap();
        assert_eq!(entry.last_refresh.unwrap().to_rfc3339(), "2023-11-02T00:00:00+00:00");

        let entry: DatasetEntry =
            serde_json::from_str(r#"{"name": "A", "lastRefresh": ""}"#).unwrap();
        assert!(entry.last_refresh.is_none());

        assert!(serde_json::from_str::<DatasetEntry>(
            r#"{"name": "A", "lastRefresh": "last tuesday"}"#
        )
        .is_err());
    }

    #[test]
    fn test_preferred_format() {
        let entry = |formats: &[&str]| -> DatasetEntry {
            let distribution: Vec<_> = formats
                .iter()
                .map(|f| serde_json::json!({ "format": f }))
                .collect();
            serde_json::from_value(serde_json::json!({"name": "A", "distribution": distribution}))
                .unwrap()
        };

        assert_eq!(entry(&["parquet", "jsona", "csv"]).preferred_format(), ResponseFormat::Csv);
        assert_eq!(entry(&["JSONA", "json"]).preferred_format(), ResponseFormat::Jsona);
        assert_eq!(entry(&["parquet", "geojson"]).preferred_format(), ResponseFormat::Json);
        assert_eq!(entry(&[]).preferred_format(), ResponseFormat::Json);
    }

    #[test]
    fn test_encoded_distribution_and_string_version() {
        let json = r#"{
            "name": "DisasterDeclarationsSummaries",
            "version": "2",
            "recordCount": "67000",
            "distribution": [
                "{\"format\": \"csv\", \"accessURL\": \"https://example.test/a.csv\", \"datasetSize\": 12}"
            ]
        }"#;

        let entry: DatasetEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.version, 2);
        assert_eq!(entry.record_count, Some(67_000));
        assert_eq!(entry.distribution[0].format, "csv");
        assert_eq!(entry.distribution[0].dataset_size.as_deref(), Some("12"));
    }

    #[test]
    fn test_missing_optional_columns() {
        let entry: DatasetEntry = serde_json::from_str(r#"{"name": "DataSets"}"#).unwrap();
        assert_eq!(entry.version, 1);
        assert!(entry.web_service.is_none());
        assert!(entry.distribution.is_empty());
    }

    #[test]
    fn test_field_info_column_type() {
        let field = FieldInfo::new(
            "policyEffectiveDate",
            Some("string".to_string()),
            Some("date-time".to_string()),
        );
        assert_eq!(field.column_type, ColumnType::DateTime);
    }
}
