//! Text file connectors for Tablink.
//!
//! Enable formats via feature flags.
//!
//! # Features
//!
//! - `csv` (default) - delimited text, optionally with a header row
//! - `json` (default) - a lossless JSON table document
//! - `all` - All formats
//!
//! # Options
//!
//! Both formats take a `path`. Exports also accept the shared selection
//! options (`rows`, `columns`, `row_labels`).
//!
//! CSV adds `delimiter` (one ASCII character, default `,`) and `headers`
//! (default `true`). JSON exports add `pretty` (default `true`).

use tablink_core::Registry;

/// Register all enabled text connectors with the registry.
pub fn register_all(registry: &mut Registry) {
    #[cfg(feature = "csv")]
    registry.register(CsvConnector);

    #[cfg(feature = "json")]
    registry.register(JsonConnector);
}

// ============================================
// CSV
// ============================================

#[cfg(feature = "csv")]
mod csv_impl {
    use serde::Deserialize;
    use std::io::BufWriter;
    use std::path::{Path, PathBuf};
    use tablink_core::{
        CellValue, ColumnId, ColumnType, Connector, ConnectorDecl, ConnectorError,
        ExportSelection, Properties, PropertiesExt, Table, TaggedCursor, field_names,
    };

    /// CSV import options.
    #[derive(Debug, Clone, Deserialize)]
    pub struct CsvSource {
        pub path: PathBuf,
        #[serde(default = "default_delimiter")]
        pub delimiter: char,
        #[serde(default = "default_true")]
        pub headers: bool,
    }

    /// CSV export options.
    #[derive(Debug, Clone, Deserialize)]
    pub struct CsvDest {
        pub path: PathBuf,
        #[serde(default = "default_delimiter")]
        pub delimiter: char,
        #[serde(default = "default_true")]
        pub headers: bool,
        #[serde(flatten)]
        pub selection: ExportSelection,
    }

    fn default_delimiter() -> char {
        ','
    }

    fn default_true() -> bool {
        true
    }

    fn delimiter_byte(delimiter: char) -> Result<u8, ConnectorError> {
        u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                ConnectorError::Config(format!(
                    "delimiter must be a single ASCII character, got {delimiter:?}"
                ))
            })
    }

    /// Delimited text files.
    pub struct CsvConnector;

    impl Connector for CsvConnector {
        fn decl(&self) -> &ConnectorDecl {
            static DECL: std::sync::OnceLock<ConnectorDecl> = std::sync::OnceLock::new();
            DECL.get_or_init(|| {
                ConnectorDecl::new("csv").description("Delimited text with an optional header row")
            })
        }

        fn import(&self, table: &mut dyn Table, options: &Properties) -> Result<(), ConnectorError> {
            let source: CsvSource = options.to_options().map_err(ConnectorError::config)?;
            let delimiter = delimiter_byte(source.delimiter)?;
            let file = std::fs::File::open(&source.path)
                .map_err(|e| ConnectorError::io(&source.path, e))?;
            let reader = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .has_headers(false)
                .flexible(true)
                .from_reader(file);
            read_records(table, reader, &source)
        }

        fn export(&self, table: &dyn Table, options: &Properties) -> Result<(), ConnectorError> {
            let dest: CsvDest = options.to_options().map_err(ConnectorError::config)?;
            let delimiter = delimiter_byte(dest.delimiter)?;
            if table.row_count() == 0 || table.column_count() == 0 {
                tracing::debug!(path = %dest.path.display(), "empty table, nothing to export");
                return Ok(());
            }

            let rows = TaggedCursor::rows(table, &dest.selection.rows)?;
            let columns = TaggedCursor::columns(table, &dest.selection.columns)?;

            let file = std::fs::File::create(&dest.path)
                .map_err(|e| ConnectorError::io(&dest.path, e))?;
            let mut writer = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .flexible(false)
                .from_writer(BufWriter::new(file));
            let write_err = |e: csv::Error| ConnectorError::io(&dest.path, e.into());

            if dest.headers {
                let names = field_names(table, columns.handles(), dest.selection.row_labels);
                writer.write_record(&names).map_err(write_err)?;
            }

            let mut written = 0usize;
            for row in rows {
                let mut record: Vec<Vec<u8>> = Vec::with_capacity(columns.len() + 1);
                if dest.selection.row_labels {
                    record.push(table.row_label(row).unwrap_or("").as_bytes().to_vec());
                }
                for &col in columns.handles() {
                    record.push(match table.cell(row, col) {
                        Some(CellValue::Long(v)) => v.to_string().into_bytes(),
                        Some(CellValue::Double(v)) => v.to_string().into_bytes(),
                        Some(CellValue::Bytes(b)) => b.clone(),
                        None => Vec::new(),
                    });
                }
                writer.write_record(&record).map_err(write_err)?;
                written += 1;
            }
            writer
                .flush()
                .map_err(|e| ConnectorError::io(&dest.path, e))?;

            tracing::info!(
                path = %dest.path.display(),
                rows = written,
                columns = columns.len(),
                "exported csv"
            );
            Ok(())
        }
    }

    fn read_records<R: std::io::Read>(
        table: &mut dyn Table,
        mut reader: csv::Reader<R>,
        source: &CsvSource,
    ) -> Result<(), ConnectorError> {
        let path = source.path.as_path();
        let mut records = reader.byte_records();

        let mut header: Option<csv::ByteRecord> = None;
        if source.headers {
            header = match records.next() {
                Some(record) => Some(record.map_err(|e| parse_error(path, e))?),
                None => return Ok(()),
            };
        }

        let mut columns: Vec<ColumnId> = Vec::new();
        if let Some(header) = &header {
            columns = table.create_columns(header.len())?;
            for (&col, name) in columns.iter().zip(header.iter()) {
                table.set_column_label(col, &String::from_utf8_lossy(name))?;
            }
        }

        let mut produced = 0usize;
        for record in records {
            let record = record.map_err(|e| parse_error(path, e))?;
            if produced == 0 {
                if header.is_none() {
                    columns = table.create_columns(record.len())?;
                }
                for (&col, field) in columns.iter().zip(record.iter()) {
                    table.set_column_type(col, infer_type(field))?;
                }
            }
            if record.len() > columns.len() {
                return Err(ConnectorError::InvalidInput(format!(
                    "{}: record {} has {} fields, expected at most {}",
                    path.display(),
                    produced + 1,
                    record.len(),
                    columns.len()
                )));
            }

            let target = table.row_or_append(produced)?;
            for (&col, field) in columns.iter().zip(record.iter()) {
                if field.is_empty() {
                    continue;
                }
                let ty = table.column_type(col).unwrap_or_default();
                table.set_cell(target, col, parse_cell(ty, field))?;
            }
            produced += 1;
        }

        tracing::info!(
            path = %path.display(),
            rows = produced,
            columns = columns.len(),
            "imported csv"
        );
        Ok(())
    }

    fn parse_error(path: &Path, err: csv::Error) -> ConnectorError {
        ConnectorError::InvalidInput(format!("{}: {err}", path.display()))
    }

    /// Type of a column judged from its first data field.
    fn infer_type(field: &[u8]) -> ColumnType {
        let Ok(text) = std::str::from_utf8(field) else {
            return ColumnType::Blob;
        };
        if text.parse::<i64>().is_ok() {
            ColumnType::Long
        } else if text.parse::<f64>().is_ok() {
            ColumnType::Double
        } else {
            ColumnType::String
        }
    }

    /// Numeric columns store numbers where the field parses; everything
    /// else stays as the raw field bytes.
    fn parse_cell(ty: ColumnType, field: &[u8]) -> CellValue {
        let text = std::str::from_utf8(field).ok();
        let number = match ty {
            ColumnType::Long => text.and_then(|t| {
                t.parse::<i64>()
                    .map(CellValue::Long)
                    .or_else(|_| t.parse::<f64>().map(CellValue::Double))
                    .ok()
            }),
            ColumnType::Double => text.and_then(|t| t.parse::<f64>().ok().map(CellValue::Double)),
            _ => None,
        };
        number.unwrap_or_else(|| CellValue::Bytes(field.to_vec()))
    }
}

#[cfg(feature = "csv")]
pub use csv_impl::{CsvConnector, CsvDest, CsvSource};

// ============================================
// JSON table documents
// ============================================

#[cfg(feature = "json")]
mod json_impl {
    use serde::{Deserialize, Serialize};
    use std::path::PathBuf;
    use tablink_core::{
        CellValue, ColumnType, Connector, ConnectorDecl, ConnectorError, ExportSelection,
        Properties, PropertiesExt, Table, TaggedCursor,
    };

    /// JSON import options.
    #[derive(Debug, Clone, Deserialize)]
    pub struct JsonSource {
        pub path: PathBuf,
    }

    /// JSON export options.
    #[derive(Debug, Clone, Deserialize)]
    pub struct JsonDest {
        pub path: PathBuf,
        #[serde(default = "default_pretty")]
        pub pretty: bool,
        #[serde(flatten)]
        pub selection: ExportSelection,
    }

    fn default_pretty() -> bool {
        true
    }

    /// On-disk shape of a table.
    ///
    /// ```json
    /// {
    ///   "columns": [{"label": "name", "type": "string"}, {"label": "age", "type": "long"}],
    ///   "rows": [{"label": "r1", "cells": ["Ann", 30]}, {"cells": ["Bo", null]}]
    /// }
    /// ```
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TableDocument {
        pub columns: Vec<ColumnEntry>,
        #[serde(default)]
        pub rows: Vec<RowEntry>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ColumnEntry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub label: Option<String>,
        #[serde(rename = "type", default)]
        pub ty: ColumnType,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RowEntry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub label: Option<String>,
        #[serde(default)]
        pub cells: Vec<Option<JsonCell>>,
    }

    /// A present cell. Byte strings that are not UTF-8 are written as
    /// `{"bytes": [..]}`.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum JsonCell {
        Long(i64),
        Double(f64),
        Text(String),
        Blob { bytes: Vec<u8> },
    }

    impl From<&CellValue> for JsonCell {
        fn from(cell: &CellValue) -> Self {
            match cell {
                CellValue::Long(v) => JsonCell::Long(*v),
                CellValue::Double(v) => JsonCell::Double(*v),
                CellValue::Bytes(b) => match std::str::from_utf8(b) {
                    Ok(text) => JsonCell::Text(text.to_string()),
                    Err(_) => JsonCell::Blob { bytes: b.clone() },
                },
            }
        }
    }

    impl From<JsonCell> for CellValue {
        fn from(cell: JsonCell) -> Self {
            match cell {
                JsonCell::Long(v) => CellValue::Long(v),
                JsonCell::Double(v) => CellValue::Double(v),
                JsonCell::Text(s) => CellValue::Bytes(s.into_bytes()),
                JsonCell::Blob { bytes } => CellValue::Bytes(bytes),
            }
        }
    }

    /// Lossless JSON table documents.
    pub struct JsonConnector;

    impl Connector for JsonConnector {
        fn decl(&self) -> &ConnectorDecl {
            static DECL: std::sync::OnceLock<ConnectorDecl> = std::sync::OnceLock::new();
            DECL.get_or_init(|| {
                ConnectorDecl::new("json")
                    .description("JSON table document with labels, types and absent cells")
            })
        }

        fn import(&self, table: &mut dyn Table, options: &Properties) -> Result<(), ConnectorError> {
            let source: JsonSource = options.to_options().map_err(ConnectorError::config)?;
            let bytes = std::fs::read(&source.path)
                .map_err(|e| ConnectorError::io(&source.path, e))?;
            let doc: TableDocument = serde_json::from_slice(&bytes).map_err(|e| {
                ConnectorError::InvalidInput(format!("{}: {e}", source.path.display()))
            })?;

            if let Some((i, row)) = doc
                .rows
                .iter()
                .enumerate()
                .find(|(_, row)| row.cells.len() > doc.columns.len())
            {
                return Err(ConnectorError::InvalidInput(format!(
                    "{}: row {i} has {} cells for {} columns",
                    source.path.display(),
                    row.cells.len(),
                    doc.columns.len()
                )));
            }

            let columns = table.create_columns(doc.columns.len())?;
            for (&col, entry) in columns.iter().zip(&doc.columns) {
                if let Some(label) = &entry.label {
                    table.set_column_label(col, label)?;
                }
                table.set_column_type(col, entry.ty)?;
            }

            let row_count = doc.rows.len();
            for (i, entry) in doc.rows.into_iter().enumerate() {
                let row = table.row_or_append(i)?;
                if let Some(label) = &entry.label {
                    table.set_row_label(row, label)?;
                }
                for (&col, cell) in columns.iter().zip(entry.cells) {
                    if let Some(cell) = cell {
                        table.set_cell(row, col, cell.into())?;
                    }
                }
            }

            tracing::info!(
                path = %source.path.display(),
                rows = row_count,
                columns = columns.len(),
                "imported json"
            );
            Ok(())
        }

        fn export(&self, table: &dyn Table, options: &Properties) -> Result<(), ConnectorError> {
            let dest: JsonDest = options.to_options().map_err(ConnectorError::config)?;
            let rows = TaggedCursor::rows(table, &dest.selection.rows)?;
            let columns = TaggedCursor::columns(table, &dest.selection.columns)?;

            let doc = TableDocument {
                columns: columns
                    .handles()
                    .iter()
                    .map(|&col| ColumnEntry {
                        label: table.column_label(col).map(String::from),
                        ty: table.column_type(col).unwrap_or_default(),
                    })
                    .collect(),
                rows: rows
                    .map(|row| RowEntry {
                        label: dest
                            .selection
                            .row_labels
                            .then(|| table.row_label(row).map(String::from))
                            .flatten(),
                        cells: columns
                            .handles()
                            .iter()
                            .map(|&col| table.cell(row, col).map(JsonCell::from))
                            .collect(),
                    })
                    .collect(),
            };

            let bytes = if dest.pretty {
                serde_json::to_vec_pretty(&doc)
            } else {
                serde_json::to_vec(&doc)
            }
            .map_err(|e| ConnectorError::InvalidInput(format!("JSON serialization failed: {e}")))?;
            std::fs::write(&dest.path, bytes).map_err(|e| ConnectorError::io(&dest.path, e))?;

            tracing::info!(
                path = %dest.path.display(),
                rows = doc.rows.len(),
                columns = doc.columns.len(),
                "exported json"
            );
            Ok(())
        }
    }
}

#[cfg(feature = "json")]
pub use json_impl::{
    ColumnEntry, JsonCell, JsonConnector, JsonDest, JsonSource, RowEntry, TableDocument,
};

#[cfg(test)]
mod tests {
    use super::*;
    use tablink_core::{
        CellValue, ColumnId, ColumnType, ConnectorError, MemoryTable, Properties, PropertiesExt,
        RowId, Table,
    };
    use tempfile::TempDir;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        register_all(&mut registry);
        registry
    }

    fn path_props(dir: &TempDir, name: &str) -> Properties {
        Properties::new().with("path", dir.path().join(name).to_str().unwrap())
    }

    fn sample() -> MemoryTable {
        let mut table = MemoryTable::new();
        table.add_column("name", ColumnType::String).unwrap();
        table.add_column("age", ColumnType::Long).unwrap();
        table.add_column("score", ColumnType::Double).unwrap();
        let r1 = table
            .push_row([
                Some(CellValue::from("Ann, Jr.")),
                Some(CellValue::Long(30)),
                Some(CellValue::Double(1.5)),
            ])
            .unwrap();
        let r2 = table
            .push_row([Some(CellValue::from("Bo")), None, Some(CellValue::Double(-2.0))])
            .unwrap();
        table.set_row_label(r1, "r1").unwrap();
        table.set_row_label(r2, "r2").unwrap();
        table.tag_row("adults", r1).unwrap();
        table
    }

    #[test]
    #[cfg(all(feature = "csv", feature = "json"))]
    fn test_registered_names() {
        assert_eq!(registry().names().collect::<Vec<_>>(), ["csv", "json"]);
    }

    #[test]
    #[cfg(feature = "csv")]
    fn test_csv_export_layout() {
        let dir = TempDir::new().unwrap();
        let props = path_props(&dir, "out.csv").with("row_labels", true);
        registry().export("csv", &sample(), &props).unwrap();

        let text = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert_eq!(
            text,
            "_rowId,name,age,score\nr1,\"Ann, Jr.\",30,1.5\nr2,Bo,,-2\n"
        );
    }

    #[test]
    #[cfg(feature = "csv")]
    fn test_csv_roundtrip() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let props = path_props(&dir, "rt.csv").with("delimiter", ";");
        let original = sample();
        registry.export("csv", &original, &props).unwrap();

        let mut back = MemoryTable::new();
        registry.import("csv", &mut back, &props).unwrap();
        assert_eq!(back.row_count(), 2);
        assert_eq!(back.column_label(ColumnId(1)), Some("age"));
        assert_eq!(back.column_type(ColumnId(1)), Some(ColumnType::Long));
        assert_eq!(back.column_type(ColumnId(2)), Some(ColumnType::Double));
        for r in 0..2 {
            for c in 0..3 {
                assert_eq!(
                    back.cell(RowId(r), ColumnId(c)),
                    original.cell(RowId(r), ColumnId(c)),
                    "cell ({r}, {c})"
                );
            }
        }
    }

    #[test]
    #[cfg(feature = "csv")]
    fn test_csv_without_headers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.csv");
        std::fs::write(&path, "007,x\n8\n").unwrap();

        let props = path_props(&dir, "plain.csv").with("headers", false);
        let mut table = MemoryTable::new();
        registry().import("csv", &mut table, &props).unwrap();

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.column_label(ColumnId(0)), None);
        assert_eq!(table.cell(RowId(0), ColumnId(0)), Some(&CellValue::Long(7)));
        assert_eq!(table.cell(RowId(1), ColumnId(0)), Some(&CellValue::Long(8)));
        assert!(!table.cell_exists(RowId(1), ColumnId(1)));
    }

    #[test]
    #[cfg(feature = "csv")]
    fn test_csv_rejects_long_records_and_bad_delimiters() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("wide.csv"), "a,b\n1,2,3\n").unwrap();

        let mut table = MemoryTable::new();
        let err = registry()
            .import("csv", &mut table, &path_props(&dir, "wide.csv"))
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidInput(_)), "{err}");

        let props = path_props(&dir, "wide.csv").with("delimiter", "§");
        let err = registry().import("csv", &mut table, &props).unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)), "{err}");
    }

    #[test]
    #[cfg(feature = "csv")]
    fn test_csv_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut table = MemoryTable::new();
        let err = registry()
            .import("csv", &mut table, &path_props(&dir, "nope.csv"))
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Io { .. }), "{err}");
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_roundtrip_is_lossless() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let mut original = sample();
        let raw = original.add_column("raw", ColumnType::Blob).unwrap();
        original
            .set_cell(RowId(1), raw, CellValue::Bytes(vec![0xfe, 0x00]))
            .unwrap();

        let props = path_props(&dir, "t.json").with("row_labels", true);
        registry.export("json", &original, &props).unwrap();

        let mut back = MemoryTable::new();
        registry.import("json", &mut back, &props).unwrap();
        assert_eq!(back.row_label(RowId(0)), Some("r1"));
        assert_eq!(back.column_type(raw), Some(ColumnType::Blob));
        for r in 0..2 {
            for c in 0..4 {
                assert_eq!(
                    back.cell(RowId(r), ColumnId(c)),
                    original.cell(RowId(r), ColumnId(c)),
                    "cell ({r}, {c})"
                );
            }
        }
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_export_honours_selection() {
        let dir = TempDir::new().unwrap();
        let props = path_props(&dir, "sel.json")
            .with("rows", "adults")
            .with("columns", "age,name")
            .with("pretty", false);
        registry().export("json", &sample(), &props).unwrap();

        let text = std::fs::read_to_string(dir.path().join("sel.json")).unwrap();
        assert_eq!(
            text,
            r#"{"columns":[{"label":"age","type":"long"},{"label":"name","type":"string"}],"rows":[{"cells":[30,"Ann, Jr."]}]}"#
        );
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_json_rejects_ragged_rows() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("bad.json"),
            r#"{"columns":[{"type":"long"}],"rows":[{"cells":[1,2]}]}"#,
        )
        .unwrap();

        let mut table = MemoryTable::new();
        let err = registry()
            .import("json", &mut table, &path_props(&dir, "bad.json"))
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidInput(_)), "{err}");
        assert_eq!(table.column_count(), 0);
    }
}
