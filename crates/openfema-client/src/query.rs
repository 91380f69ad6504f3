//! Query construction.
//!
//! A [`Query`] holds the column selection, filters, sort order and row
//! window of a read and serializes them into the API's OData-style
//! parameters (`$select`, `$filter`, `$orderby`, `$top`, `$skip`).
//!
//! Filters are a list of groups. Predicates inside a group are joined with
//! `and`; groups are joined with `or`:
//!
//! ```
//! use openfema_client::{Operator, Predicate, Query};
//!
//! let query = Query::builder()
//!     .filter_group([Predicate::new("femaRegion", Operator::Eq, 1)])
//!     .sort("policyCost", false)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(query.filter_expression().as_deref(), Some("femaRegion eq 1"));
//! assert_eq!(query.order_expression().as_deref(), Some("policyCost desc"));
//! ```

use crate::error::{ClientError, Result};
use crate::pager::ResponseFormat;
use crate::types::DatasetInfo;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;

/// Filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// Membership in a list of values
    In,
    /// Negated equality
    Not,
    /// `substringof(value, field)`
    SubstringOf,
    StartsWith,
    EndsWith,
    Contains,
    /// Geometry intersection with a WKT shape
    GeoIntersects,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::In => "in",
            Operator::Not => "not",
            Operator::SubstringOf => "substringof",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
            Operator::Contains => "contains",
            Operator::GeoIntersects => "geo.intersects",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "gt" => Operator::Gt,
            "ge" => Operator::Ge,
            "lt" => Operator::Lt,
            "le" => Operator::Le,
            "in" => Operator::In,
            "not" => Operator::Not,
            "substringof" => Operator::SubstringOf,
            "startswith" => Operator::StartsWith,
            "endswith" => Operator::EndsWith,
            "contains" => Operator::Contains,
            "geo.intersects" => Operator::GeoIntersects,
            other => {
                return Err(ClientError::Validation(format!(
                    "Unknown filter operator '{}'",
                    other
                )))
            }
        };
        Ok(op)
    }
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// OData literal for this value.
    fn literal(&self) -> String {
        match self {
            FilterValue::Null => "null".to_string(),
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Int(i) => i.to_string(),
            FilterValue::Float(f) => f.to_string(),
            FilterValue::String(s) => quote(s),
            FilterValue::Date(d) => match d.and_hms_opt(0, 0, 0) {
                Some(naive) => quote(&naive.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => quote(&d.to_string()),
            },
            FilterValue::DateTime(dt) => quote(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            FilterValue::List(values) => format!(
                "({})",
                values.iter().map(FilterValue::literal).collect::<Vec<_>>().join(",")
            ),
        }
    }

    /// False for NaN or infinite floats, which have no OData literal.
    fn is_finite(&self) -> bool {
        match self {
            FilterValue::Float(f) => f.is_finite(),
            FilterValue::List(values) => values.iter().all(FilterValue::is_finite),
            _ => true,
        }
    }
}

/// Single-quote a string literal, doubling embedded quotes.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

macro_rules! filter_value_from {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    FilterValue::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

filter_value_from! {
    bool => Bool as bool,
    i32 => Int as i64,
    i64 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
    &str => String as String,
    String => String as String,
    NaiveDate => Date as NaiveDate,
    DateTime<Utc> => DateTime as DateTime<Utc>,
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FilterValue::Null)
    }
}

/// `field op value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: FilterValue,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Build a predicate from an operator name such as `"eq"` or `"startswith"`.
    pub fn parse(field: impl Into<String>, op: &str, value: impl Into<FilterValue>) -> Result<Self> {
        Ok(Self::new(field, op.parse()?, value))
    }

    /// Check that the value fits the operator.
    fn check(&self) -> Result<()> {
        if self.field.trim().is_empty() {
            return Err(ClientError::Validation(
                "Filter field name cannot be empty".to_string(),
            ));
        }

        let fits = match self.op {
            Operator::In => matches!(&self.value, FilterValue::List(values) if !values.is_empty()),
            Operator::SubstringOf
            | Operator::StartsWith
            | Operator::EndsWith
            | Operator::Contains
            | Operator::GeoIntersects => matches!(self.value, FilterValue::String(_)),
            _ => !matches!(self.value, FilterValue::List(_)),
        };

        if !self.value.is_finite() {
            return Err(ClientError::Validation(format!(
                "Non-finite number {:?} for field '{}'",
                self.value, self.field
            )));
        }

        if fits {
            Ok(())
        } else {
            Err(ClientError::Validation(format!(
                "Operator '{}' cannot take value {:?} for field '{}'",
                self.op, self.value, self.field
            )))
        }
    }

    fn expression(&self) -> String {
        let field = &self.field;
        let value = self.value.literal();
        match self.op {
            Operator::In => format!("{} in {}", field, value),
            Operator::Not => format!("not ({} eq {})", field, value),
            Operator::SubstringOf => format!("substringof({},{})", value, field),
            Operator::StartsWith | Operator::EndsWith | Operator::Contains => {
                format!("{}({},{})", self.op, field, value)
            }
            Operator::GeoIntersects => match &self.value {
                FilterValue::String(wkt) => {
                    format!("geo.intersects({}, geography {})", field, quote(wkt))
                }
                _ => format!("geo.intersects({}, {})", field, value),
            },
            op => format!("{} {} {}", field, op, value),
        }
    }
}

/// One `$orderby` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub ascending: bool,
}

impl SortKey {
    fn expression(&self) -> String {
        format!(
            "{} {}",
            self.field,
            if self.ascending { "asc" } else { "desc" }
        )
    }
}

/// A validated-shape read specification; immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    columns: Vec<String>,
    filters: Vec<Vec<Predicate>>,
    sort: Vec<SortKey>,
    top: Option<u64>,
    skip: Option<u64>,
    parse_dates: bool,
    format: Option<ResponseFormat>,
}

impl Query {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Selected columns in the requested order; empty means all columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn filters(&self) -> &[Vec<Predicate>] {
        &self.filters
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    /// Maximum number of rows to return.
    pub fn top(&self) -> Option<u64> {
        self.top
    }

    /// Rows to skip at the start of the result set.
    pub fn skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn parse_dates(&self) -> bool {
        self.parse_dates
    }

    /// Wire format chosen by the caller. `None` lets the read pick one from
    /// the dataset's distributions.
    pub fn format(&self) -> Option<ResponseFormat> {
        self.format
    }

    /// `$filter` value, if any filters were given.
    pub fn filter_expression(&self) -> Option<String> {
        let groups: Vec<String> = self
            .filters
            .iter()
            .filter(|group| !group.is_empty())
            .map(|group| {
                group
                    .iter()
                    .map(Predicate::expression)
                    .collect::<Vec<_>>()
                    .join(" and ")
            })
            .collect();

        match groups.len() {
            0 => None,
            1 => groups.into_iter().next(),
            _ => Some(
                groups
                    .iter()
                    .map(|g| format!("({})", g))
                    .collect::<Vec<_>>()
                    .join(" or "),
            ),
        }
    }

    /// `$orderby` value, if a sort was given.
    pub fn order_expression(&self) -> Option<String> {
        if self.sort.is_empty() {
            return None;
        }
        Some(
            self.sort
                .iter()
                .map(SortKey::expression)
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Every field the query names, in first-use order.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        let names = self
            .columns
            .iter()
            .map(String::as_str)
            .chain(self.filters.iter().flatten().map(|p| p.field.as_str()))
            .chain(self.sort.iter().map(|s| s.field.as_str()));
        for name in names {
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
        fields
    }

    /// Check every referenced field against the dataset schema.
    ///
    /// Datasets whose schema is unpublished accept any field.
    pub fn validate(&self, dataset: &DatasetInfo) -> Result<()> {
        if !dataset.schema_known() {
            tracing::debug!(
                dataset = %dataset.name(),
                "No published schema, skipping field validation"
            );
            return Ok(());
        }

        match self
            .referenced_fields()
            .into_iter()
            .find(|name| dataset.field(name).is_none())
        {
            Some(field) => Err(ClientError::InvalidField {
                dataset: dataset.name().to_string(),
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Query parameters other than paging (`$top`/`$skip`), unencoded.
    ///
    /// Uses JSON when no format was chosen.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        self.params_for(self.format.unwrap_or_default())
    }

    /// [`Query::params`] with the `$format` of `format`.
    pub fn params_for(&self, format: ResponseFormat) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.columns.is_empty() {
            params.push(("$select", self.columns.join(",")));
        }
        if let Some(filter) = self.filter_expression() {
            params.push(("$filter", filter));
        }
        if let Some(order) = self.order_expression() {
            params.push(("$orderby", order));
        }
        params.push(("$format", format.as_str().to_string()));
        if format == ResponseFormat::Json {
            params.push(("$metadata", "off".to_string()));
        }
        params
    }

    /// Percent-encoded query string of [`Query::params`].
    pub fn to_query_string(&self) -> String {
        encode_params(&self.params())
    }
}

/// Join parameters into a query string, encoding spaces as `%20`.
pub(crate) fn encode_params<K: AsRef<str>>(params: &[(K, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key.as_ref(), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Builder for [`Query`].
///
/// A builder bound to a dataset also checks field names in
/// [`QueryBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
    dataset: Option<DatasetInfo>,
}

impl QueryBuilder {
    /// Builder whose `build` validates fields against `dataset`.
    pub fn for_dataset(dataset: DatasetInfo) -> Self {
        Self {
            query: Query::default(),
            dataset: Some(dataset),
        }
    }

    /// Select a subset of columns, in order.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a group of predicates that must all hold. Groups are OR-ed.
    pub fn filter_group<I>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = Predicate>,
    {
        self.query.filters.push(predicates.into_iter().collect());
        self
    }

    /// Replace all filter groups.
    pub fn filters(mut self, groups: Vec<Vec<Predicate>>) -> Self {
        self.query.filters = groups;
        self
    }

    /// Append a sort key; earlier keys sort first.
    pub fn sort(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.query.sort.push(SortKey {
            field: field.into(),
            ascending,
        });
        self
    }

    /// Return at most `top` rows.
    pub fn top(mut self, top: u64) -> Self {
        self.query.top = Some(top);
        self
    }

    /// Skip the first `skip` rows.
    pub fn skip(mut self, skip: u64) -> Self {
        self.query.skip = Some(skip);
        self
    }

    /// Parse date-typed columns into date/time values.
    pub fn parse_dates(mut self, parse_dates: bool) -> Self {
        self.query.parse_dates = parse_dates;
        self
    }

    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.query.format = Some(format);
        self
    }

    /// Build the query, checking operators against their values and, for a
    /// bound builder, field names against the dataset schema.
    pub fn build(self) -> Result<Query> {
        for predicate in self.query.filters.iter().flatten() {
            predicate.check()?;
        }
        if let Some(column) = self.query.columns.iter().find(|c| c.trim().is_empty()) {
            return Err(ClientError::Validation(format!(
                "Column name cannot be empty: {:?}",
                column
            )));
        }
        if let Some(key) = self.query.sort.iter().find(|k| k.field.trim().is_empty()) {
            return Err(ClientError::Validation(format!(
                "Sort field cannot be empty: {:?}",
                key
            )));
        }
        if self.query.top == Some(0) {
            return Err(ClientError::Validation(
                "top must be greater than zero".to_string(),
            ));
        }
        if let Some(dataset) = &self.dataset {
            self.query.validate(dataset)?;
        }
        Ok(self.query)
    }
}
