//! In-memory table engine.

use crate::table::{CellValue, ColumnId, ColumnType, RowId, Table, TableError};
use indexmap::IndexMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct Column {
    label: Option<String>,
    ty: ColumnType,
}

#[derive(Debug, Clone, Default)]
struct Row {
    label: Option<String>,
    cells: BTreeMap<usize, CellValue>,
}

/// A sparse, growable table held entirely in memory.
///
/// Cells are stored per row keyed by column position, so absent cells cost
/// nothing and adding columns never touches existing rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    columns: Vec<Column>,
    rows: Vec<Row>,
    row_tags: IndexMap<String, Vec<RowId>>,
    column_tags: IndexMap<String, Vec<ColumnId>>,
    row_limit: Option<usize>,
    column_limit: Option<usize>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to grow beyond `limit` rows.
    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.row_limit = Some(limit);
        self
    }

    /// Refuse to grow beyond `limit` columns.
    pub fn with_column_limit(mut self, limit: usize) -> Self {
        self.column_limit = Some(limit);
        self
    }

    /// Add `row` to the named tag set, creating the set if needed.
    pub fn tag_row(&mut self, tag: &str, row: RowId) -> Result<(), TableError> {
        self.check_row(row)?;
        let members = self.row_tags.entry(tag.to_string()).or_default();
        if !members.contains(&row) {
            members.push(row);
        }
        Ok(())
    }

    /// Add `col` to the named tag set, creating the set if needed.
    pub fn tag_column(&mut self, tag: &str, col: ColumnId) -> Result<(), TableError> {
        self.check_column(col)?;
        let members = self.column_tags.entry(tag.to_string()).or_default();
        if !members.contains(&col) {
            members.push(col);
        }
        Ok(())
    }

    /// Append a labelled, typed column.
    pub fn add_column(&mut self, label: &str, ty: ColumnType) -> Result<ColumnId, TableError> {
        let col = self.create_columns(1)?[0];
        self.set_column_label(col, label)?;
        self.set_column_type(col, ty)?;
        Ok(col)
    }

    /// Append a row with the given cells; `None` leaves a cell absent.
    pub fn push_row<I>(&mut self, cells: I) -> Result<RowId, TableError>
    where
        I: IntoIterator<Item = Option<CellValue>>,
    {
        let row = self.append_rows(1)?[0];
        for (index, cell) in cells.into_iter().enumerate() {
            if let Some(value) = cell {
                self.set_cell(row, ColumnId(index), value)?;
            }
        }
        Ok(row)
    }

    fn check_row(&self, row: RowId) -> Result<(), TableError> {
        if row.0 < self.rows.len() {
            Ok(())
        } else {
            Err(TableError::UnknownRow(row.0))
        }
    }

    fn check_column(&self, col: ColumnId) -> Result<(), TableError> {
        if col.0 < self.columns.len() {
            Ok(())
        } else {
            Err(TableError::UnknownColumn(col.0))
        }
    }
}

fn grow(current: usize, n: usize, limit: Option<usize>, what: &'static str) -> Result<usize, TableError> {
    let requested = current.checked_add(n).ok_or(TableError::CapacityExceeded {
        what,
        requested: usize::MAX,
        limit: limit.unwrap_or(usize::MAX),
    })?;
    match limit {
        Some(limit) if requested > limit => Err(TableError::CapacityExceeded {
            what,
            requested,
            limit,
        }),
        _ => Ok(requested),
    }
}

impl Table for MemoryTable {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn create_columns(&mut self, n: usize) -> Result<Vec<ColumnId>, TableError> {
        let start = self.columns.len();
        let end = grow(start, n, self.column_limit, "columns")?;
        self.columns.resize_with(end, Column::default);
        Ok((start..end).map(ColumnId).collect())
    }

    fn append_rows(&mut self, n: usize) -> Result<Vec<RowId>, TableError> {
        let start = self.rows.len();
        let end = grow(start, n, self.row_limit, "rows")?;
        self.rows.resize_with(end, Row::default);
        Ok((start..end).map(RowId).collect())
    }

    fn set_column_label(&mut self, col: ColumnId, label: &str) -> Result<(), TableError> {
        self.check_column(col)?;
        self.columns[col.0].label = Some(label.to_string());
        Ok(())
    }

    fn set_column_type(&mut self, col: ColumnId, ty: ColumnType) -> Result<(), TableError> {
        self.check_column(col)?;
        self.columns[col.0].ty = ty;
        Ok(())
    }

    fn column_label(&self, col: ColumnId) -> Option<&str> {
        self.columns.get(col.0)?.label.as_deref()
    }

    fn column_type(&self, col: ColumnId) -> Option<ColumnType> {
        self.columns.get(col.0).map(|c| c.ty)
    }

    fn set_row_label(&mut self, row: RowId, label: &str) -> Result<(), TableError> {
        self.check_row(row)?;
        self.rows[row.0].label = Some(label.to_string());
        Ok(())
    }

    fn row_label(&self, row: RowId) -> Option<&str> {
        self.rows.get(row.0)?.label.as_deref()
    }

    fn set_cell(&mut self, row: RowId, col: ColumnId, value: CellValue) -> Result<(), TableError> {
        self.check_row(row)?;
        self.check_column(col)?;
        self.rows[row.0].cells.insert(col.0, value);
        Ok(())
    }

    fn cell(&self, row: RowId, col: ColumnId) -> Option<&CellValue> {
        self.rows.get(row.0)?.cells.get(&col.0)
    }

    fn row_tag(&self, name: &str) -> Option<Vec<RowId>> {
        self.row_tags.get(name).cloned()
    }

    fn column_tag(&self, name: &str) -> Option<Vec<ColumnId>> {
        self.column_tags.get(name).cloned()
    }
}
