//! In-memory columnar table exchanged between the extract, clean and load stages.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::fmt;

use crate::error::{EtlError, Result};

/// A single cell value.
///
/// `Null` is a value the source did not provide. `Missing` is the sentinel a
/// normalizer leaves behind when a value could not be parsed or was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Null,
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Borrow the cell as a label. Only text cells carry labels.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render the cell as text for parsers. Absent cells have no text.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Null | Cell::Missing => None,
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) => Some(f.to_string()),
            Cell::Text(s) => Some(s.clone()),
            Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Cell::Time(t) => Some(t.format("%H:%M:%S").to_string()),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Bool(b) => Cell::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Interpret a raw text field from a delimited file. Empty fields are null.
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Cell::Null
        } else {
            Cell::Text(field.to_string())
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(s) => write!(f, "{}", s),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Ordered named columns of equal length plus a row index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    index: Vec<i64>,
}

impl Table {
    /// Build a table from columns, assigning a positional index.
    pub fn from_columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        let rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(EtlError::Schema(format!(
                "column '{}' in '{}' has {} rows, expected {}",
                bad.name,
                name,
                bad.len(),
                rows
            )));
        }
        Ok(Self {
            name,
            columns,
            index: (0..rows as i64).collect(),
        })
    }

    /// Build a table from a header and row-major records. Short rows are
    /// padded with nulls and long rows are truncated to the header width.
    pub fn from_rows(name: impl Into<String>, headers: &[String], rows: Vec<Vec<Cell>>) -> Self {
        let mut columns: Vec<Column> = headers
            .iter()
            .map(|h| Column::new(h.clone(), Vec::with_capacity(rows.len())))
            .collect();
        let row_count = rows.len();
        for row in rows {
            let mut values = row.into_iter();
            for column in columns.iter_mut() {
                column.cells.push(values.next().unwrap_or(Cell::Null));
            }
        }
        Self {
            name: name.into(),
            columns,
            index: (0..row_count as i64).collect(),
        }
    }

    /// Assemble JSON object records into a table. Columns appear in the order
    /// keys are first seen; records lacking a key get a null cell.
    pub fn from_records(name: impl Into<String>, records: &[serde_json::Value]) -> Result<Self> {
        let name = name.into();
        let mut headers: Vec<String> = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or_else(|| {
                EtlError::Schema(format!("record {} in '{}' is not a JSON object", i, name))
            })?;
            for key in object.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }
        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| record.get(h).map(Cell::from_json).unwrap_or(Cell::Null))
                    .collect()
            })
            .collect();
        Ok(Self::from_rows(name, &headers, rows))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| self.missing(name))
    }

    pub fn require_column_mut(&mut self, name: &str) -> Result<&mut Column> {
        let err = self.missing(name);
        self.column_mut(name).ok_or(err)
    }

    fn missing(&self, column: &str) -> EtlError {
        EtlError::MissingColumn {
            table: self.name.clone(),
            column: column.to_string(),
        }
    }

    /// Remove a column, returning it if it existed.
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let pos = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(pos))
    }

    /// Keep only rows whose flag is `true`. Returns the number of rows removed.
    pub fn retain_rows(&mut self, keep: &[bool]) -> usize {
        debug_assert_eq!(keep.len(), self.num_rows());
        let before = self.num_rows();
        for column in self.columns.iter_mut() {
            let mut flags = keep.iter();
            column.cells.retain(|_| *flags.next().unwrap_or(&true));
        }
        let mut flags = keep.iter();
        self.index.retain(|_| *flags.next().unwrap_or(&true));
        before - self.num_rows()
    }

    /// Re-number the index positionally from `start`.
    pub fn rebase_index(&mut self, start: i64) {
        let rows = self.num_rows() as i64;
        self.index = (start..start + rows).collect();
    }

    /// Replace the row index with explicit labels.
    pub fn with_index(mut self, index: Vec<i64>) -> Result<Self> {
        if index.len() != self.num_rows() {
            return Err(EtlError::Schema(format!(
                "index of {} labels given for '{}' with {} rows",
                index.len(),
                self.name,
                self.num_rows()
            )));
        }
        self.index = index;
        Ok(self)
    }

    /// Promote an integer column to the row index and remove it from the columns.
    pub fn set_index_from_column(&mut self, name: &str) -> Result<()> {
        let column = self.require_column(name)?;
        let index = column
            .cells
            .iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Cell::Int(i) => Ok(*i),
                Cell::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
                Cell::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                    EtlError::Schema(format!("index column '{}' row {} is not an integer: '{}'", name, row, s))
                }),
                other => Err(EtlError::Schema(format!(
                    "index column '{}' row {} is not an integer: {:?}",
                    name, row, other
                ))),
            })
            .collect::<Result<Vec<i64>>>()?;
        self.index = index;
        self.drop_column(name);
        Ok(())
    }

    /// Row `i` as cells in column order.
    pub fn row(&self, i: usize) -> Vec<&Cell> {
        self.columns.iter().map(|c| &c.cells[i]).collect()
    }
}
