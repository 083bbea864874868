//! Connector protocol: one import and one export procedure per format.

use crate::properties::Properties;
use crate::table::{Table, TableError};
use crate::tags::TagError;
use std::path::PathBuf;

/// Errors raised by connectors.
///
/// Every variant carries enough context (path, query, table name) to be
/// shown to a user without the surrounding call stack.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("cannot open {}: {message}", .path.display())]
    Connection { path: PathBuf, message: String },

    #[error("invalid query {query:?}: {message}")]
    Query { query: String, message: String },

    #[error("step failed during {context}: {message}")]
    Step { context: String, message: String },

    #[error("table allocation failed: {0}")]
    Allocation(#[from] TableError),

    #[error("cannot create table {table:?}: {message}")]
    Schema { table: String, message: String },

    #[error("tag selection: {0}")]
    TagSelection(#[from] TagError),

    #[error("invalid options: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown format: {0}")]
    UnknownFormat(String),
}

impl ConnectorError {
    pub fn config(err: impl std::fmt::Display) -> Self {
        ConnectorError::Config(err.to_string())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConnectorError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Import procedure: fill `table` from the source described by the options.
pub type ImportFn = fn(&mut dyn Table, &Properties) -> Result<(), ConnectorError>;

/// Export procedure: write `table` to the destination described by the options.
pub type ExportFn = fn(&dyn Table, &Properties) -> Result<(), ConnectorError>;

/// Static description of a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorDecl {
    /// Format name used for dispatch (exact, case-sensitive).
    pub name: String,
    pub description: String,
}

impl ConnectorDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A format connector.
pub trait Connector: Send + Sync {
    fn decl(&self) -> &ConnectorDecl;

    /// Populate `table` from the source named in `options`.
    fn import(&self, table: &mut dyn Table, options: &Properties) -> Result<(), ConnectorError>;

    /// Write `table` to the destination named in `options`. Never mutates
    /// the table.
    fn export(&self, table: &dyn Table, options: &Properties) -> Result<(), ConnectorError>;
}

/// A connector assembled from a plain import/export function pair.
pub struct FnConnector {
    decl: ConnectorDecl,
    import: ImportFn,
    export: ExportFn,
}

impl FnConnector {
    pub fn new(decl: ConnectorDecl, import: ImportFn, export: ExportFn) -> Self {
        Self {
            decl,
            import,
            export,
        }
    }
}

impl Connector for FnConnector {
    fn decl(&self) -> &ConnectorDecl {
        &self.decl
    }

    fn import(&self, table: &mut dyn Table, options: &Properties) -> Result<(), ConnectorError> {
        (self.import)(table, options)
    }

    fn export(&self, table: &dyn Table, options: &Properties) -> Result<(), ConnectorError> {
        (self.export)(table, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_subject() {
        let err = ConnectorError::Connection {
            path: PathBuf::from("/tmp/missing.db"),
            message: "unable to open database file".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot open /tmp/missing.db: unable to open database file"
        );

        let err = ConnectorError::Query {
            query: "SELEC 1".into(),
            message: "syntax error".into(),
        };
        assert!(err.to_string().contains("\"SELEC 1\""));

        let err: ConnectorError = TableError::UnknownColumn(3).into();
        assert!(matches!(err, ConnectorError::Allocation(_)));
    }
}
