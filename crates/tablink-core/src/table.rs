//! Table engine interface.
//!
//! Connectors never own a table. They read and write it through the
//! [`Table`] trait: handle creation and extension, label/type setters,
//! typed cell access, and named tag sets. [`MemoryTable`](crate::MemoryTable)
//! is the in-process implementation; hosts with their own storage implement
//! the trait directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a row (its ordinal position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub usize);

/// Handle to a column (its ordinal position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub usize);

impl RowId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ColumnId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Declared type of a column.
///
/// Cells are typed individually; the column type only decides how values
/// are serialized when they leave the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    String,
    Long,
    Double,
    Boolean,
    Time,
    Blob,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Long => "long",
            ColumnType::Double => "double",
            ColumnType::Boolean => "boolean",
            ColumnType::Time => "time",
            ColumnType::Blob => "blob",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored cell value.
///
/// Absence is not a variant: accessors return `None` for a cell that was
/// never written. `Bytes` carries an explicit length and may contain zero
/// bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Long(i64),
    Double(f64),
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Read as a long, parsing text and truncating doubles.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            CellValue::Long(v) => Some(*v),
            CellValue::Double(v) if v.is_finite() => Some(*v as i64),
            CellValue::Double(_) => None,
            CellValue::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
        }
    }

    /// Read as a double, widening longs and parsing text.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            CellValue::Long(v) => Some(*v as f64),
            CellValue::Double(v) => Some(*v),
            CellValue::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
        }
    }

    /// Raw bytes of a string/blob cell.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CellValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Textual form of any cell. Non UTF-8 bytes are replaced lossily.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Long(v) => v.to_string(),
            CellValue::Double(v) => v.to_string(),
            CellValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Long(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Double(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Long(v as i64)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Bytes(v.as_bytes().to_vec())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Bytes(v.into_bytes())
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(v: Vec<u8>) -> Self {
        CellValue::Bytes(v)
    }
}

/// Errors reported by a table engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("unknown row {0}")]
    UnknownRow(usize),

    #[error("unknown column {0}")]
    UnknownColumn(usize),

    #[error("cannot grow {what} to {requested} (limit {limit})")]
    CapacityExceeded {
        what: &'static str,
        requested: usize,
        limit: usize,
    },
}

/// The operations connectors need from a table engine.
pub trait Table {
    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    /// Handle of the row at `index`, if it exists.
    fn row(&self, index: usize) -> Option<RowId> {
        (index < self.row_count()).then_some(RowId(index))
    }

    /// Handle of the column at `index`, if it exists.
    fn column(&self, index: usize) -> Option<ColumnId> {
        (index < self.column_count()).then_some(ColumnId(index))
    }

    /// Append `n` new, unlabelled columns of type [`ColumnType::String`].
    fn create_columns(&mut self, n: usize) -> Result<Vec<ColumnId>, TableError>;

    /// Append `n` new, empty rows.
    fn append_rows(&mut self, n: usize) -> Result<Vec<RowId>, TableError>;

    /// The row at `index`, appending one row when the table is exactly
    /// that short.
    fn row_or_append(&mut self, index: usize) -> Result<RowId, TableError> {
        if let Some(row) = self.row(index) {
            return Ok(row);
        }
        self.append_rows(1)?
            .pop()
            .ok_or(TableError::UnknownRow(index))
    }

    fn set_column_label(&mut self, col: ColumnId, label: &str) -> Result<(), TableError>;

    fn set_column_type(&mut self, col: ColumnId, ty: ColumnType) -> Result<(), TableError>;

    fn column_label(&self, col: ColumnId) -> Option<&str>;

    fn column_type(&self, col: ColumnId) -> Option<ColumnType>;

    fn set_row_label(&mut self, row: RowId, label: &str) -> Result<(), TableError>;

    fn row_label(&self, row: RowId) -> Option<&str>;

    fn set_cell(&mut self, row: RowId, col: ColumnId, value: CellValue) -> Result<(), TableError>;

    fn cell(&self, row: RowId, col: ColumnId) -> Option<&CellValue>;

    fn cell_exists(&self, row: RowId, col: ColumnId) -> bool {
        self.cell(row, col).is_some()
    }

    /// Rows carrying the named tag, in tagging order. `None` if no such tag.
    fn row_tag(&self, name: &str) -> Option<Vec<RowId>>;

    /// Columns carrying the named tag, in tagging order. `None` if no such tag.
    fn column_tag(&self, name: &str) -> Option<Vec<ColumnId>>;
}
