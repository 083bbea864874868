//! Transfer: import from one format into a scratch table, export to another.
//!
//! Formats are resolved through the registry; a transfer only sequences
//! the two calls and reports what moved.

use crate::connector::ConnectorError;
use crate::memory::MemoryTable;
use crate::properties::Properties;
use crate::registry::Registry;
use crate::table::Table;
use std::time::{Duration, Instant};

/// One side of a transfer: a format name plus its options.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub format: String,
    pub options: Properties,
}

impl Endpoint {
    pub fn new(format: impl Into<String>, options: Properties) -> Self {
        Self {
            format: format.into(),
            options,
        }
    }
}

/// Statistics from a completed transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// Rows in the intermediate table.
    pub rows: usize,
    /// Columns in the intermediate table.
    pub columns: usize,
    pub import_duration: Duration,
    pub export_duration: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("import from {format} failed")]
    Import {
        format: String,
        #[source]
        source: ConnectorError,
    },

    #[error("export to {format} failed")]
    Export {
        format: String,
        #[source]
        source: ConnectorError,
    },
}

/// Sequential import-then-export through a [`MemoryTable`].
pub struct Transfer<'a> {
    registry: &'a Registry,
    table: MemoryTable,
}

impl<'a> Transfer<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            table: MemoryTable::new(),
        }
    }

    /// Stage into a caller-supplied table (for example one with capacity limits).
    pub fn with_table(mut self, table: MemoryTable) -> Self {
        self.table = table;
        self
    }

    /// Run the transfer, returning the intermediate table alongside the stats.
    pub fn run(
        mut self,
        source: &Endpoint,
        dest: &Endpoint,
    ) -> Result<(MemoryTable, TransferStats), TransferError> {
        let start = Instant::now();
        self.registry
            .import(&source.format, &mut self.table, &source.options)
            .map_err(|source_err| TransferError::Import {
                format: source.format.clone(),
                source: source_err,
            })?;
        let import_duration = start.elapsed();
        tracing::debug!(
            format = %source.format,
            rows = self.table.row_count(),
            columns = self.table.column_count(),
            "import finished"
        );

        let start = Instant::now();
        self.registry
            .export(&dest.format, &self.table, &dest.options)
            .map_err(|source_err| TransferError::Export {
                format: dest.format.clone(),
                source: source_err,
            })?;

        let stats = TransferStats {
            rows: self.table.row_count(),
            columns: self.table.column_count(),
            import_duration,
            export_duration: start.elapsed(),
        };
        tracing::info!(
            from = %source.format,
            to = %dest.format,
            rows = stats.rows,
            columns = stats.columns,
            "transfer complete"
        );
        Ok((self.table, stats))
    }
}
