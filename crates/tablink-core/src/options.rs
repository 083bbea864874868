//! Option fields shared by every export connector.

use crate::table::{ColumnId, Table};
use crate::tags::TagSelection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which part of a table an export writes.
///
/// Flatten this into a connector's destination options:
///
/// ```
/// use serde::Deserialize;
/// use tablink_core::ExportSelection;
///
/// #[derive(Deserialize)]
/// struct CsvDest {
///     path: std::path::PathBuf,
///     #[serde(flatten)]
///     selection: ExportSelection,
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportSelection {
    #[serde(default)]
    pub rows: TagSelection,

    #[serde(default)]
    pub columns: TagSelection,

    /// Emit each row's label as a leading `_rowId` field.
    #[serde(default)]
    pub row_labels: bool,
}

/// Name of the synthetic row-label field.
pub const ROW_ID_FIELD: &str = "_rowId";

/// Output field names for `columns`: [`ROW_ID_FIELD`] first when
/// `row_labels` is set, then each column's label, or `column<index>` for
/// an unlabelled column.
///
/// Names are unique ignoring ASCII case. A name already taken gets the
/// first free `_2`, `_3`, ... suffix, so the row-label field keeps
/// `_rowId` and a column labelled `_rowId` becomes `_rowId_2`.
pub fn field_names(table: &dyn Table, columns: &[ColumnId], row_labels: bool) -> Vec<String> {
    let mut names = Vec::with_capacity(columns.len() + 1);
    let mut taken = HashSet::with_capacity(columns.len() + 1);
    let mut claim = |name: String| {
        let mut candidate = name.clone();
        let mut n = 2;
        while !taken.insert(candidate.to_ascii_lowercase()) {
            candidate = format!("{name}_{n}");
            n += 1;
        }
        names.push(candidate);
    };
    if row_labels {
        claim(ROW_ID_FIELD.to_string());
    }
    for &col in columns {
        claim(match table.column_label(col) {
            Some(label) => label.to_string(),
            None => format!("column{}", col.index()),
        });
    }
    names
}
