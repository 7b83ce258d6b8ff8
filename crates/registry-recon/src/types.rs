//! Row, request and metadata types shared by every connector.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RowError;

/// A caller-supplied row of input data. Read-only to connectors.
pub type InputRow = Map<String, Value>;

/// Connector configuration as supplied by the caller.
pub type Parameters = Map<String, Value>;

/// Read a field from an input row as text.
///
/// Strings are trimmed and must be non-empty; numbers use their JSON form;
/// `true` reads as `"true"`. Everything else counts as absent.
pub fn field_text(row: &InputRow, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Read a required identifying field, failing with [`RowError::MissingField`].
pub fn require_field(row: &InputRow, field: &str, what: &'static str) -> Result<String, RowError> {
    field_text(row, field).ok_or_else(|| RowError::MissingField {
        what,
        field: field.to_string(),
    })
}

/// One reconciled output row. Columns keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutputRow(Map<String, Value>);

impl OutputRow {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set a column to a string, or null when `value` is `None`.
    pub fn set(&mut self, column: &str, value: Option<String>) -> &mut Self {
        self.0.insert(
            column.to_string(),
            value.map(Value::String).unwrap_or(Value::Null),
        );
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Column value as `&str`, `None` for null or missing.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Identifying context carried from request construction to error
/// classification and response parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Passthrough(BTreeMap<String, String>);

impl Passthrough {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A configuration parameter a connector accepts.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// An output column a connector produces.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

impl ColumnSpec {
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            description: None,
        }
    }
}

/// Static description of a connector's configuration contract and output shape.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConnectorDetails {
    pub parameters: &'static [ParameterSpec],
    pub columns: &'static [ColumnSpec],
}

impl ConnectorDetails {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}
