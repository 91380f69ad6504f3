//! In-memory result tables.
//!
//! Pages decoded by the pager are plain JSON rows. [`Table::assemble`]
//! concatenates them in server order and coerces every cell to the column
//! type taken from the dataset schema:
//!
//! - columns named by the query come first and in query order; otherwise
//!   schema order is used, followed by unknown keys in order of appearance
//! - keys missing from a row become [`Value::Null`]
//! - columns the schema does not describe take the narrowest type that fits
//!   every value in the read (integers and floats widen to floats, other
//!   mixes fall back to strings or JSON)
//! - date-like columns are parsed only when date parsing is requested, and
//!   stay strings otherwise
//!
//! A cell that cannot be coerced fails the whole read.

use crate::error::{ClientError, Result};
use crate::pager::Row;
use crate::types::FieldInfo;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Logical type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    String,
    DateTime,
    /// Nested objects or arrays
    Json,
}

impl ColumnType {
    /// Map an OpenAPI `type`/`format` pair onto a column type.
    pub fn from_openapi(data_type: Option<&str>, format: Option<&str>) -> Self {
        let data_type = data_type.map(str::to_ascii_lowercase);
        let format = format.map(str::to_ascii_lowercase);

        if let Some(format) = format.as_deref() {
            if format.contains("date") {
                return ColumnType::DateTime;
            }
            if format.contains("int") {
                return ColumnType::Integer;
            }
            if matches!(format, "float" | "double" | "decimal" | "number") {
                return ColumnType::Float;
            }
            if format.contains("bool") {
                return ColumnType::Boolean;
            }
        }

        match data_type.as_deref() {
            Some("integer") => ColumnType::Integer,
            Some("number") => ColumnType::Float,
            Some("boolean") => ColumnType::Boolean,
            Some("object") | Some("array") => ColumnType::Json,
            _ => ColumnType::String,
        }
    }

    /// Guess a column type from a JSON value when no schema is available.
    fn infer(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(_) => Some(ColumnType::Boolean),
            serde_json::Value::Number(n) if n.is_i64() => Some(ColumnType::Integer),
            serde_json::Value::Number(_) => Some(ColumnType::Float),
            serde_json::Value::String(_) => Some(ColumnType::String),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Some(ColumnType::Json),
        }
    }

    /// Narrowest type holding values of both `self` and `other`.
    fn widen(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnType::Integer, ColumnType::Float) | (ColumnType::Float, ColumnType::Integer) => {
                ColumnType::Float
            }
            (ColumnType::Json, _) | (_, ColumnType::Json) => ColumnType::Json,
            _ => ColumnType::String,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::DateTime => "datetime",
            ColumnType::Json => "json",
        };
        f.write_str(name)
    }
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Coerce a raw JSON cell into `column_type`.
    fn coerce(raw: serde_json::Value, column_type: ColumnType) -> std::result::Result<Self, String> {
        use serde_json::Value as Json;

        if raw.is_null() {
            return Ok(Value::Null);
        }

        match (column_type, raw) {
            (ColumnType::Json, Json::String(s)) => {
                Ok(Value::Json(serde_json::from_str(&s).unwrap_or(Json::String(s))))
            }
            (ColumnType::Json, other) => Ok(Value::Json(other)),

            (ColumnType::String, Json::String(s)) => Ok(Value::String(s)),
            (ColumnType::String, other) => Ok(Value::String(other.to_string())),

            // A blank string cannot hold a typed value
            (_, Json::String(s)) if s.trim().is_empty() => Ok(Value::Null),

            (ColumnType::Integer, Json::Number(n)) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Value::Integer(i)),
                (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Ok(Value::Integer(f as i64))
                }
                _ => Err(format!("{} is not an integer", n)),
            },
            (ColumnType::Integer, Json::String(s)) => parse_integer(&s)
                .map(Value::Integer)
                .ok_or_else(|| format!("'{}' is not an integer", s)),

            (ColumnType::Float, Json::Number(n)) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| format!("{} is not a number", n)),
            (ColumnType::Float, Json::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("'{}' is not a number", s)),

            (ColumnType::Boolean, Json::Bool(b)) => Ok(Value::Boolean(b)),
            (ColumnType::Boolean, Json::Number(n)) => match n.as_i64() {
                Some(0) => Ok(Value::Boolean(false)),
                Some(1) => Ok(Value::Boolean(true)),
                _ => Err(format!("{} is not a boolean", n)),
            },
            (ColumnType::Boolean, Json::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(format!("'{}' is not a boolean", s)),
            },

            (ColumnType::DateTime, Json::String(s)) => parse_datetime(&s)
                .map(Value::DateTime)
                .ok_or_else(|| format!("'{}' is not a date", s)),

            (column_type, other) => Err(format!("{} cannot be read as {}", other, column_type)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => f.write_str(s),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>().ok().or_else(|| {
        // CSV exports sometimes render integers as "12.0"
        s.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Parse the date and timestamp renderings the API produces.
///
/// Values without an offset are taken as UTC; bare dates map to midnight.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Name and type of one table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// Rows of a dataset read, with named and typed columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Concatenate decoded rows into a table.
    ///
    /// `selected` fixes the column order when non-empty. Date-typed schema
    /// columns are parsed only when `parse_dates` is set.
    pub fn assemble(
        rows: Vec<Row>,
        fields: &[FieldInfo],
        selected: &[String],
        parse_dates: bool,
    ) -> Result<Self> {
        let names = column_order(&rows, fields, selected);

        let columns: Vec<Column> = names
            .into_iter()
            .map(|name| {
                let column_type = match fields.iter().find(|f| f.name == name) {
                    Some(field) => field.column_type,
                    None => rows
                        .iter()
                        .filter_map(|row| row.get(&name).and_then(ColumnType::infer))
                        .reduce(ColumnType::widen)
                        .unwrap_or(ColumnType::String),
                };
                let column_type = match column_type {
                    ColumnType::DateTime if !parse_dates => ColumnType::String,
                    other => other,
                };
                Column { name, column_type }
            })
            .collect();

        let mut table_rows = Vec::with_capacity(rows.len());
        for (index, mut row) in rows.into_iter().enumerate() {
            let mut cells = Vec::with_capacity(columns.len());
            for column in &columns {
                let raw = row.remove(&column.name).unwrap_or(serde_json::Value::Null);
                let cell = Value::coerce(raw, column.column_type).map_err(|reason| {
                    ClientError::Decode(format!(
                        "column '{}' row {}: {}",
                        column.name, index, reason
                    ))
                })?;
                cells.push(cell);
            }
            table_rows.push(cells);
        }

        tracing::debug!(
            rows = table_rows.len(),
            columns = columns.len(),
            parse_dates,
            "Assembled table"
        );

        Ok(Self {
            columns,
            rows: table_rows,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Type of the named column.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name).map(|i| self.columns[i].column_type)
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Cell at `row` in the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[index])
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    /// Convert to an Arrow record batch.
    ///
    /// Date/time columns become UTC microsecond timestamps and JSON columns
    /// are rendered as strings.
    #[cfg(feature = "arrow")]
    pub fn to_record_batch(&self) -> Result<arrow::record_batch::RecordBatch> {
        arrow_support::to_record_batch(self)
    }
}

fn column_order(rows: &[Row], fields: &[FieldInfo], selected: &[String]) -> Vec<String> {
    if !selected.is_empty() {
        return selected.to_vec();
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut names = Vec::new();
    for field in fields {
        if seen.insert(field.name.as_str()) {
            names.push(field.name.clone());
        }
    }
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.clone());
            }
        }
    }
    names
}

#[cfg(feature = "arrow")]
mod arrow_support {
    use super::{ColumnType, Table, Value};
    use crate::error::Result;
    use arrow::array::{
        ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder,
        TimestampMicrosecondBuilder,
    };
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn data_type(column_type: ColumnType) -> DataType {
        match column_type {
            ColumnType::Boolean => DataType::Boolean,
            ColumnType::Integer => DataType::Int64,
            ColumnType::Float => DataType::Float64,
            ColumnType::String | ColumnType::Json => DataType::Utf8,
            ColumnType::DateTime => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        }
    }

    pub(super) fn to_record_batch(table: &Table) -> Result<RecordBatch> {
        let fields: Vec<Field> = table
            .columns()
            .iter()
            .map(|c| Field::new(&c.name, data_type(c.column_type), true))
            .collect();
        let schema = Arc::new(Schema::new(fields));

        let arrays: Vec<ArrayRef> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let cells = table.rows().iter().map(|row| &row[index]);
                build_array(column.column_type, cells)
            })
            .collect();

        Ok(RecordBatch::try_new(schema, arrays)?)
    }

    fn build_array<'a>(column_type: ColumnType, cells: impl Iterator<Item = &'a Value>) -> ArrayRef {
        match column_type {
            ColumnType::Boolean => {
                let mut builder = BooleanBuilder::new();
                cells.for_each(|v| builder.append_option(v.as_bool()));
                Arc::new(builder.finish())
            }
            ColumnType::Integer => {
                let mut builder = Int64Builder::new();
                cells.for_each(|v| builder.append_option(v.as_i64()));
                Arc::new(builder.finish())
            }
            ColumnType::Float => {
                let mut builder = Float64Builder::new();
                cells.for_each(|v| builder.append_option(v.as_f64()));
                Arc::new(builder.finish())
            }
            ColumnType::DateTime => {
                let mut builder = TimestampMicrosecondBuilder::new().with_timezone("UTC");
                cells.for_each(|v| builder.append_option(v.as_datetime().map(|dt| dt.timestamp_micros())));
                Arc::new(builder.finish())
            }
            ColumnType::String | ColumnType::Json => {
                let mut builder = StringBuilder::new();
                for v in cells {
                    if v.is_null() {
                        builder.append_null();
                    } else {
                        builder.append_value(v.to_string());
                    }
                }
                Arc::new(builder.finish())
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::types::FieldInfo;
        use arrow::array::Array;
        use serde_json::json;

        #[test]
        fn test_record_batch_types() {
            let rows = vec![
                json!({"id": 1, "when": "2024-01-01", "cost": 1.5}),
                json!({"id": 2, "when": null, "cost": 2}),
            ]
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
            let fields = vec![FieldInfo::new("when", None, Some("date-time".to_string()))];

            let table = Table::assemble(rows, &fields, &[], true).unwrap();
            let batch = table.to_record_batch().unwrap();

            assert_eq!(batch.num_rows(), 2);
            assert_eq!(
                batch.schema().field_with_name("when").unwrap().data_type(),
                &DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
            );
            assert_eq!(batch.schema().field_with_name("id").unwrap().data_type(), &DataType::Int64);
            assert!(batch.column(0).is_null(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn rows(values: Vec<serde_json::Value>) -> Vec<Row> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn policy_fields() -> Vec<FieldInfo> {
        vec![
            FieldInfo::new("id", Some("string".into()), Some("uuid".into())),
            FieldInfo::new("femaRegion", Some("integer".into()), Some("int32".into())),
            FieldInfo::new("policyCost", Some("number".into()), Some("double".into())),
            FieldInfo::new("policyEffectiveDate", Some("string".into()), Some("date-time".into())),
        ]
    }

    #[test]
    fn test_openapi_mapping() {
        assert_eq!(ColumnType::from_openapi(Some("string"), Some("date-time")), ColumnType::DateTime);
        assert_eq!(ColumnType::from_openapi(Some("string"), Some("date")), ColumnType::DateTime);
        assert_eq!(ColumnType::from_openapi(Some("integer"), Some("int64")), ColumnType::Integer);
        assert_eq!(ColumnType::from_openapi(Some("number"), None), ColumnType::Float);
        assert_eq!(ColumnType::from_openapi(None, Some("double")), ColumnType::Float);
        assert_eq!(ColumnType::from_openapi(Some("boolean"), None), ColumnType::Boolean);
        assert_eq!(ColumnType::from_openapi(Some("string"), Some("uuid")), ColumnType::String);
        assert_eq!(ColumnType::from_openapi(None, None), ColumnType::String);
    }

    #[test]
    fn test_assemble_schema_order_and_types() {
        let table = Table::assemble(
            rows(vec![
                json!({"policyCost": 420.5, "femaRegion": 1, "id": "a", "extra": true}),
                json!({"id": "b", "femaRegion": 2}),
            ]),
            &policy_fields(),
            &[],
            false,
        )
        .unwrap();

        assert_eq!(
            table.column_names(),
            vec!["id", "femaRegion", "policyCost", "policyEffectiveDate", "extra"]
        );
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.value(0, "femaRegion"), Some(&Value::Integer(1)));
        assert_eq!(table.value(0, "policyCost"), Some(&Value::Float(420.5)));
        assert_eq!(table.value(1, "policyCost"), Some(&Value::Null));
        assert_eq!(table.column_type("extra"), Some(ColumnType::Boolean));
        // Dates stay strings unless parsing is requested
        assert_eq!(table.column_type("policyEffectiveDate"), Some(ColumnType::String));
    }

    #[test]
    fn test_assemble_selected_columns() {
        let table = Table::assemble(
            rows(vec![json!({"femaRegion": 3, "policyCost": 10})]),
            &policy_fields(),
            &["policyCost".to_string(), "femaRegion".to_string()],
            false,
        )
        .unwrap();

        assert_eq!(table.column_names(), vec!["policyCost", "femaRegion"]);
        assert_eq!(table.value(0, "policyCost"), Some(&Value::Float(10.0)));
    }

    #[test]
    fn test_parse_dates() {
        let table = Table::assemble(
            rows(vec![
                json!({"policyEffectiveDate": "2019-04-11T00:00:00.000Z"}),
                json!({"policyEffectiveDate": "2020-12-31"}),
                json!({"policyEffectiveDate": null}),
            ]),
            &policy_fields(),
            &["policyEffectiveDate".to_string()],
            true,
        )
        .unwrap();

        assert_eq!(table.column_type("policyEffectiveDate"), Some(ColumnType::DateTime));
        let dates: Vec<_> = table.column("policyEffectiveDate").unwrap().collect();
        let first = dates[0].as_datetime().unwrap();
        assert_eq!((first.year(), first.month(), first.day()), (2019, 4, 11));
        let second = dates[1].as_datetime().unwrap();
        assert_eq!((second.year(), second.hour()), (2020, 0));
        assert!(dates[2].is_null());
    }

    #[test]
    fn test_bad_date_is_decode_error() {
        let err = Table::assemble(
            rows(vec![json!({"policyEffectiveDate": "yesterday"})]),
            &policy_fields(),
            &[],
            true,
        )
        .unwrap_err();

        match err {
            ClientError::Decode(msg) => {
                assert!(msg.contains("policyEffectiveDate"));
                assert!(msg.contains("row 0"));
            }
            other => panic!("Expected Decode error, got: {:?}", other),
        }
    }

    #[test]
    fn test_csv_text_cells_coerced() {
        let table = Table::assemble(
            rows(vec![json!({"id": "x", "femaRegion": "4", "policyCost": "", "flag": "TRUE"})]),
            &[
                policy_fields(),
                vec![FieldInfo::new("flag", Some("boolean".into()), None)],
            ]
            .concat(),
            &[],
            false,
        )
        .unwrap();

        assert_eq!(table.value(0, "femaRegion"), Some(&Value::Integer(4)));
        assert_eq!(table.value(0, "policyCost"), Some(&Value::Null));
        assert_eq!(table.value(0, "flag"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_integer_column_rejects_text() {
        let err = Table::assemble(
            rows(vec![json!({"femaRegion": "north"})]),
            &policy_fields(),
            &[],
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_inferred_types_without_schema() {
        let table = Table::assemble(
            rows(vec![
                json!({"a": null, "b": 1.25, "c": {"k": 1}}),
                json!({"a": 7, "b": 2, "c": [1, 2]}),
            ]),
            &[],
            &[],
            true,
        )
        .unwrap();

        assert_eq!(table.column_type("a"), Some(ColumnType::Integer));
        assert_eq!(table.column_type("b"), Some(ColumnType::Float));
        assert_eq!(table.column_type("c"), Some(ColumnType::Json));
        assert_eq!(table.value(1, "b"), Some(&Value::Float(2.0)));
    }

    #[test]
    fn test_inferred_types_widen_across_rows() {
        let table = Table::assemble(
            rows(vec![
                json!({"amount": 100, "code": 7, "flag": true, "tags": ["a"]}),
                json!({"amount": 100.5, "code": "07A", "flag": 1, "tags": "b"}),
                json!({"amount": null, "code": null, "flag": null, "tags": null}),
            ]),
            &[],
            &[],
            false,
        )
        .unwrap();

        assert_eq!(table.column_type("amount"), Some(ColumnType::Float));
        assert_eq!(table.value(0, "amount"), Some(&Value::Float(100.0)));
        assert_eq!(table.value(1, "amount"), Some(&Value::Float(100.5)));

        assert_eq!(table.column_type("code"), Some(ColumnType::String));
        assert_eq!(table.value(0, "code"), Some(&Value::String("7".into())));
        assert_eq!(table.value(1, "code"), Some(&Value::String("07A".into())));

        assert_eq!(table.column_type("flag"), Some(ColumnType::String));
        assert_eq!(table.column_type("tags"), Some(ColumnType::Json));
        assert!(table.value(2, "tags").unwrap().is_null());
    }

    #[test]
    fn test_large_unsigned_inferred_as_float() {
        let table = Table::assemble(
            rows(vec![json!({"big": u64::MAX})]),
            &[],
            &[],
            false,
        )
        .unwrap();
        assert_eq!(table.column_type("big"), Some(ColumnType::Float));
    }

    #[test]
    fn test_parse_datetime_variants() {
        assert!(parse_datetime("2024-03-05T10:15:30Z").is_some());
        assert!(parse_datetime("2024-03-05T10:15:30.123").is_some());
        assert!(parse_datetime("2024-03-05 10:15:30").is_some());
        assert!(parse_datetime("2024-03-05").is_some());
        assert!(parse_datetime("03/05/2024").is_none());
    }

    #[test]
    fn test_empty_table() {
        let table = Table::assemble(Vec::new(), &policy_fields(), &[], false).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.num_columns(), 4);
    }
}
