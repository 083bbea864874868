//! Tablink: move tables between a dynamic table engine and external formats.
//!
//! A format is served by a [`Connector`], an import/export procedure pair
//! registered by name in a [`Registry`]. Connectors read and write tables
//! only through the [`Table`] trait, and pick rows and columns through
//! [`TagSelection`]s resolved into [`TaggedCursor`]s.

mod connector;
mod memory;
mod options;
mod properties;
mod registry;
mod table;
mod tags;
mod transfer;

pub use connector::{Connector, ConnectorDecl, ConnectorError, ExportFn, FnConnector, ImportFn};
pub use memory::MemoryTable;
pub use options::{ExportSelection, ROW_ID_FIELD, field_names};
pub use properties::{Properties, PropertiesExt, Value};
pub use registry::Registry;
pub use table::{CellValue, ColumnId, ColumnType, RowId, Table, TableError};
pub use tags::{TagError, TagRef, TagSelection, TaggedCursor};
pub use transfer::{Endpoint, Transfer, TransferError, TransferStats};
