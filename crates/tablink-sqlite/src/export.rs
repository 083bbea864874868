//! Write a table out as a freshly created SQLite table.

use crate::types::column_type_to_sql_ddl;
use rusqlite::Connection;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use tablink_core::{
    CellValue, ColumnId, ColumnType, ConnectorError, ExportSelection, ROW_ID_FIELD, Table,
    TaggedCursor, field_names,
};

/// What an export wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportSummary {
    /// Rows inserted.
    pub rows: usize,
    /// Table columns written, not counting the row-label column.
    pub columns: usize,
}

/// Replace `table_name` in `conn` with the selected part of `table`.
///
/// The destination is dropped and recreated, then one `INSERT` is prepared
/// and executed once per selected row. Parameter `N` binds the same
/// logical column for every row because the schema and every row walk the
/// same resolved column cursor. Tables with no rows or no columns export
/// as a no-op.
///
/// Column names come from [`field_names`], so duplicate labels (SQLite
/// compares names without regard to ASCII case) and a column labelled
/// `_rowId` next to the row-label field get numbered suffixes instead of
/// failing the `CREATE TABLE`.
pub fn export_table(
    table: &dyn Table,
    conn: &Connection,
    table_name: &str,
    selection: &ExportSelection,
) -> Result<ExportSummary, ConnectorError> {
    if table.row_count() == 0 || table.column_count() == 0 {
        tracing::debug!(table = table_name, "nothing to export");
        return Ok(ExportSummary::default());
    }

    let rows = TaggedCursor::rows(table, &selection.rows)?;
    let mut columns = TaggedCursor::columns(table, &selection.columns)?;

    let names = field_names(table, columns.handles(), selection.row_labels);
    let ddl = create_table_sql(table, table_name, &names, columns.handles(), selection.row_labels);
    tracing::debug!(sql = %ddl, "creating destination table");
    conn.execute_batch(&ddl)
        .map_err(|e| ConnectorError::Schema {
            table: table_name.to_string(),
            message: e.to_string(),
        })?;

    let insert = insert_sql(table_name, &names);
    let mut stmt = conn.prepare(&insert).map_err(|e| ConnectorError::Schema {
        table: table_name.to_string(),
        message: e.to_string(),
    })?;

    let mut written = 0usize;
    for row in rows {
        let mut param = 1;
        if selection.row_labels {
            let label = match table.row_label(row) {
                Some(label) => ToSqlOutput::Borrowed(ValueRef::Text(label.as_bytes())),
                None => ToSqlOutput::Owned(Value::Null),
            };
            bind(&mut stmt, param, label, table_name)?;
            param += 1;
        }

        columns.rewind();
        for col in columns.by_ref() {
            let ty = table.column_type(col).unwrap_or_default();
            let value = match table.cell(row, col) {
                Some(cell) => sql_value(ty, cell),
                None => ToSqlOutput::Owned(Value::Null),
            };
            bind(&mut stmt, param, value, table_name)?;
            param += 1;
        }

        stmt.raw_execute().map_err(|e| ConnectorError::Step {
            context: format!("insert of row {} into {table_name:?}", row.index()),
            message: e.to_string(),
        })?;
        written += 1;
    }

    tracing::info!(
        table = table_name,
        rows = written,
        columns = columns.len(),
        "exported table"
    );
    Ok(ExportSummary {
        rows: written,
        columns: columns.len(),
    })
}

/// Typed parameter for one present cell.
///
/// Long and Boolean columns bind integers, Double binds reals, Blob binds
/// blobs, and everything else binds text. A cell that cannot be read as
/// its column's type is bound as whatever it holds.
fn sql_value(ty: ColumnType, cell: &CellValue) -> ToSqlOutput<'_> {
    match ty {
        ColumnType::Long | ColumnType::Boolean => match cell.as_long() {
            Some(v) => ToSqlOutput::Owned(Value::Integer(v)),
            None => as_stored(cell),
        },
        ColumnType::Double => match cell.as_double() {
            Some(v) => ToSqlOutput::Owned(Value::Real(v)),
            None => as_stored(cell),
        },
        ColumnType::Blob => match cell {
            CellValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            other => as_stored(other),
        },
        ColumnType::String | ColumnType::Time => match cell {
            CellValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Text(b)),
            other => ToSqlOutput::Owned(Value::Text(other.to_text())),
        },
    }
}

fn as_stored(cell: &CellValue) -> ToSqlOutput<'_> {
    match cell {
        CellValue::Long(v) => ToSqlOutput::Owned(Value::Integer(*v)),
        CellValue::Double(v) => ToSqlOutput::Owned(Value::Real(*v)),
        CellValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Text(b)),
    }
}

fn bind(
    stmt: &mut rusqlite::Statement<'_>,
    param: usize,
    value: ToSqlOutput<'_>,
    table_name: &str,
) -> Result<(), ConnectorError> {
    stmt.raw_bind_parameter(param, value)
        .map_err(|e| ConnectorError::Step {
            context: format!("binding parameter {param} for {table_name:?}"),
            message: e.to_string(),
        })
}

/// Bracket-quote an identifier, doubling any closing bracket.
fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

fn create_table_sql(
    table: &dyn Table,
    table_name: &str,
    names: &[String],
    columns: &[ColumnId],
    row_labels: bool,
) -> String {
    let quoted = quote_ident(table_name);
    let mut defs = Vec::with_capacity(names.len());
    let mut names = names.iter();
    if row_labels {
        names.next();
        defs.push(format!("{ROW_ID_FIELD} TEXT"));
    }
    for (name, &col) in names.zip(columns) {
        let ty = table.column_type(col).unwrap_or_default();
        defs.push(format!("{} {}", quote_ident(name), column_type_to_sql_ddl(ty)));
    }
    format!(
        "DROP TABLE IF EXISTS {quoted}; CREATE TABLE {quoted} ({})",
        defs.join(", ")
    )
}

fn insert_sql(table_name: &str, names: &[String]) -> String {
    let cols: Vec<String> = names.iter().map(|n| quote_ident(n)).collect();
    let params: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table_name),
        cols.join(", "),
        params.join(", ")
    )
}
