pub mod odbc;

use crate::config::ConnectionTarget;
use crate::error::DashError;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Metadata for a single result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub type_name: String,
}

/// A single scalar value from a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v),
            CellValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A materialized result set: ordered columns and ordered rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<CellValue>>,
}

impl QueryResult {
    /// The empty tabular result: no columns, no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value of column `name` in row `row`.
    pub fn get(&self, row: usize, name: &str) -> Option<&CellValue> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx)
    }

    /// View a row as a column-name to value mapping.
    pub fn row_map(&self, row: usize) -> Option<BTreeMap<&str, &CellValue>> {
        let values = self.rows.get(row)?;
        Some(
            self.columns
                .iter()
                .zip(values.iter())
                .map(|(c, v)| (c.name.as_str(), v))
                .collect(),
        )
    }
}

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Float(f64),
}

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    sql: String,
    params: Vec<SqlParam>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, param: SqlParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Cache key: the exact SQL text, followed by the bound values when present.
    /// Text values are length-prefixed so no value can forge a separator.
    pub fn cache_key(&self) -> String {
        let mut key = self.sql.clone();
        for param in &self.params {
            key.push('\u{1f}');
            let _ = match param {
                SqlParam::Text(s) => write!(key, "t{}:{s}", s.len()),
                SqlParam::Int(i) => write!(key, "i:{i}"),
                SqlParam::Float(f) => write!(key, "f:{f}"),
            };
        }
        key
    }
}

impl From<&str> for Query {
    fn from(sql: &str) -> Self {
        Query::new(sql)
    }
}

/// An open database connection able to run statements.
pub trait Session {
    /// Run a statement and materialize its full result set. Statements that
    /// produce no cursor (inserts, updates) yield an empty result.
    fn execute(&mut self, query: &Query, timeout_secs: Option<u64>)
        -> Result<QueryResult, DashError>;
}

/// Discovery of installed client drivers and connection opening.
pub trait DriverCatalog {
    type Session: Session;

    /// Descriptions of every installed driver, in installation order.
    fn drivers(&self) -> Result<Vec<String>, DashError>;

    fn open(&self, driver: &str, target: &ConnectionTarget) -> Result<Self::Session, DashError>;
}
