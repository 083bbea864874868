//! Stream a SQLite result set into a table.

use crate::types::sql_type_to_column_type;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection};
use tablink_core::{CellValue, ColumnId, ConnectorError, Table};

/// What an import added to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Result rows written.
    pub rows: usize,
    /// Columns created.
    pub columns: usize,
}

/// Run a single-statement `query` and materialize its rows into `table`.
///
/// One new column is created per result column. Result row `i` lands in
/// table row `i`; the table grows by one row whenever it is too short.
/// Labels and types are taken from the first produced row only. NULL
/// values leave their cell absent.
pub fn import_query(
    table: &mut dyn Table,
    conn: &Connection,
    query: &str,
) -> Result<ImportSummary, ConnectorError> {
    let query_error = |message: String| ConnectorError::Query {
        query: query.to_string(),
        message,
    };

    let mut batch = Batch::new(conn, query);
    let mut stmt = batch
        .next()
        .map_err(|e| query_error(e.to_string()))?
        .ok_or_else(|| query_error("empty statement".into()))?;
    match batch.next() {
        Ok(None) => {}
        Ok(Some(_)) | Err(_) => {
            return Err(query_error(
                "extra statements after the first; only one statement may be imported".into(),
            ));
        }
    }

    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let columns: Vec<ColumnId> = table.create_columns(names.len())?;
    tracing::debug!(query, columns = columns.len(), "prepared import query");

    let mut rows = stmt.raw_query();
    let mut produced = 0usize;
    while let Some(row) = rows.next().map_err(|e| ConnectorError::Step {
        context: format!("query {query:?}"),
        message: e.to_string(),
    })? {
        let values = (0..columns.len())
            .map(|i| row.get_ref(i))
            .collect::<Result<Vec<ValueRef<'_>>, _>>()
            .map_err(|e| ConnectorError::Step {
                context: format!("row {produced} of {query:?}"),
                message: e.to_string(),
            })?;

        if produced == 0 {
            for ((&col, name), value) in columns.iter().zip(&names).zip(&values) {
                table.set_column_label(col, name)?;
                table.set_column_type(col, sql_type_to_column_type(value.data_type()))?;
            }
        }

        let target = table.row_or_append(produced)?;
        for (&col, value) in columns.iter().zip(values) {
            let cell = match value {
                ValueRef::Null => continue,
                ValueRef::Integer(v) => CellValue::Long(v),
                ValueRef::Real(v) => CellValue::Double(v),
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => CellValue::Bytes(bytes.to_vec()),
            };
            table.set_cell(target, col, cell)?;
        }
        produced += 1;
    }

    tracing::info!(query, rows = produced, columns = columns.len(), "imported query result");
    Ok(ImportSummary {
        rows: produced,
        columns: columns.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablink_core::{ColumnType, MemoryTable, RowId, TableError};

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER, name TEXT, score REAL, note TEXT, raw BLOB);
             INSERT INTO t VALUES (1, 'ann', 1.5, NULL, x'610062');
             INSERT INTO t VALUES (2, 'bo', NULL, 'late', NULL);
             INSERT INTO t VALUES ('three', 3, 2.0, 'x', x'');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_labels_types_and_cells() {
        let conn = fixture();
        let mut table = MemoryTable::new();
        let summary = import_query(&mut table, &conn, "SELECT * FROM t ORDER BY rowid").unwrap();

        assert_eq!(summary, ImportSummary { rows: 3, columns: 5 });
        assert_eq!(table.row_count(), 3);
        let labels: Vec<_> = (0..5).map(|i| table.column_label(ColumnId(i)).unwrap()).collect();
        assert_eq!(labels, ["id", "name", "score", "note", "raw"]);

        assert_eq!(table.column_type(ColumnId(0)), Some(ColumnType::Long));
        assert_eq!(table.column_type(ColumnId(1)), Some(ColumnType::String));
        assert_eq!(table.column_type(ColumnId(2)), Some(ColumnType::Double));
        // NULL in the first row infers String.
        assert_eq!(table.column_type(ColumnId(3)), Some(ColumnType::String));
        assert_eq!(table.column_type(ColumnId(4)), Some(ColumnType::Blob));

        assert_eq!(table.cell(RowId(0), ColumnId(4)), Some(&CellValue::Bytes(vec![b'a', 0, b'b'])));
        assert!(!table.cell_exists(RowId(0), ColumnId(3)));
        assert!(!table.cell_exists(RowId(1), ColumnId(2)));
    }

    #[test]
    fn test_first_row_decides_types() {
        let conn = fixture();
        let mut table = MemoryTable::new();
        import_query(&mut table, &conn, "SELECT id, name FROM t ORDER BY rowid").unwrap();

        // Later rows keep their own runtime types in the cells.
        assert_eq!(table.column_type(ColumnId(0)), Some(ColumnType::Long));
        assert_eq!(table.cell(RowId(2), ColumnId(0)), Some(&CellValue::from("three")));
        assert_eq!(table.column_type(ColumnId(1)), Some(ColumnType::String));
        assert_eq!(table.cell(RowId(2), ColumnId(1)), Some(&CellValue::Long(3)));
    }

    #[test]
    fn test_reuses_existing_rows_and_only_adds_columns() {
        let conn = fixture();
        let mut table = MemoryTable::new();
        table.add_column("existing", ColumnType::String).unwrap();
        table.append_rows(2).unwrap();

        import_query(&mut table, &conn, "SELECT id FROM t ORDER BY rowid").unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_label(ColumnId(0)), Some("existing"));
        assert_eq!(table.cell(RowId(1), ColumnId(1)), Some(&CellValue::Long(2)));
    }

    #[test]
    fn test_empty_result_creates_columns_only() {
        let conn = fixture();
        let mut table = MemoryTable::new();
        let summary = import_query(&mut table, &conn, "SELECT id, name FROM t WHERE 0").unwrap();
        assert_eq!(summary.rows, 0);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_rejects_bad_queries() {
        let conn = fixture();
        let mut table = MemoryTable::new();

        for query in ["", "   \n", "SELEC 1", "SELECT 1; SELECT 2", "SELECT * FROM missing"] {
            let err = import_query(&mut table, &conn, query).unwrap_err();
            assert!(
                matches!(err, ConnectorError::Query { .. }),
                "{query:?} gave {err}"
            );
        }
        assert_eq!(table.column_count(), 0);

        // A trailing semicolon is not an extra statement.
        import_query(&mut table, &conn, "SELECT 1;  ").unwrap();
    }

    #[test]
    fn test_allocation_failure() {
        let conn = fixture();
        let mut table = MemoryTable::new().with_row_limit(1);
        let err = import_query(&mut table, &conn, "SELECT id FROM t").unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::Allocation(TableError::CapacityExceeded { what: "rows", .. })
        ));
        // The first row was written before growth failed.
        assert_eq!(table.row_count(), 1);

        let mut table = MemoryTable::new().with_column_limit(2);
        let err = import_query(&mut table, &conn, "SELECT * FROM t").unwrap_err();
        assert!(matches!(err, ConnectorError::Allocation(_)));
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn test_step_error_is_reported() {
        let conn = fixture();
        let mut table = MemoryTable::new();
        // abs() overflows on the minimum integer at step time, not prepare time.
        let err = import_query(&mut table, &conn, "SELECT abs(-9223372036854775807 - 1)").unwrap_err();
        assert!(matches!(err, ConnectorError::Step { .. }), "{err}");
    }
}
