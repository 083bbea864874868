//! SQLite connectors for Tablink.
//!
//! Import runs one query against a database file and materializes the
//! result into a table; export writes a table (or a tagged part of it) into
//! a freshly created SQL table.
//!
//! # Options
//!
//! Import (`SqliteSource`):
//! - `path` - database file (opened read-only)
//! - `query` - a single SQL statement
//!
//! Export (`SqliteDest`):
//! - `path` - database file (created if missing)
//! - `table` - destination table name (default `data`)
//! - `rows`, `columns` - tag selectors (default `all`)
//! - `row_labels` - write row labels to a leading `_rowId` column

mod export;
mod import;
mod types;

pub use export::{ExportSummary, export_table};
pub use import::{ImportSummary, import_query};
pub use types::{column_type_to_sql_ddl, sql_type_to_column_type};

use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tablink_core::{
    Connector, ConnectorDecl, ConnectorError, ExportSelection, Properties, PropertiesExt,
    Registry, Table, TaggedCursor,
};

/// Destination table used when the options name none.
pub const DEFAULT_TABLE_NAME: &str = "data";

/// Register the SQLite connector with the registry.
pub fn register_all(registry: &mut Registry) {
    registry.register(SqliteConnector);
}

/// Import options.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteSource {
    pub path: PathBuf,
    pub query: String,
}

/// Export options.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteDest {
    pub path: PathBuf,
    #[serde(default = "default_table_name")]
    pub table: String,
    #[serde(flatten)]
    pub selection: ExportSelection,
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

/// The `sqlite` format connector.
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn decl(&self) -> &ConnectorDecl {
        static DECL: std::sync::OnceLock<ConnectorDecl> = std::sync::OnceLock::new();
        DECL.get_or_init(|| {
            ConnectorDecl::new("sqlite")
                .description("Import a query result from / export a table to a SQLite database file")
        })
    }

    fn import(&self, table: &mut dyn Table, options: &Properties) -> Result<(), ConnectorError> {
        let source: SqliteSource = options.to_options().map_err(ConnectorError::config)?;
        with_connection(&source.path, OpenFlags::SQLITE_OPEN_READ_ONLY, |conn| {
            import_query(table, conn, &source.query)
        })?;
        Ok(())
    }

    fn export(&self, table: &dyn Table, options: &Properties) -> Result<(), ConnectorError> {
        let dest: SqliteDest = options.to_options().map_err(ConnectorError::config)?;
        if dest.table.trim().is_empty() {
            return Err(ConnectorError::Config("table name must not be empty".into()));
        }
        if table.row_count() == 0 || table.column_count() == 0 {
            tracing::debug!(path = %dest.path.display(), "empty table, nothing to export");
            return Ok(());
        }

        // Bad selectors fail before the file is touched.
        TaggedCursor::rows(table, &dest.selection.rows)?;
        TaggedCursor::columns(table, &dest.selection.columns)?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        with_connection(&dest.path, flags, |conn| {
            export_table(table, conn, &dest.table, &dest.selection)
        })?;
        Ok(())
    }
}

/// Open `path`, run `f`, and close the connection on every exit path.
///
/// When `f` fails, its error wins over a failure to close.
pub fn with_connection<T>(
    path: &Path,
    flags: OpenFlags,
    f: impl FnOnce(&Connection) -> Result<T, ConnectorError>,
) -> Result<T, ConnectorError> {
    let conn = Connection::open_with_flags(
        path,
        flags | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| ConnectorError::Connection {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), "opened database");

    let result = f(&conn);

    match conn.close() {
        Ok(()) => result,
        Err((_conn, e)) => match result {
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to close database");
                Err(err)
            }
            Ok(_) => Err(ConnectorError::Connection {
                path: path.to_path_buf(),
                message: format!("close failed: {e}"),
            }),
        },
    }
}
