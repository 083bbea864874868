//! Tag selections and the cursors that walk them.
//!
//! A selection is parsed once from a selector string and resolved once per
//! connector call into a [`TaggedCursor`]. Export walks the column cursor
//! for the schema and then again for every row, so resolution must be
//! deterministic and the cursor restartable.

use crate::table::{ColumnId, RowId, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// One entry of a selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRef {
    /// Ordinal position.
    Index(usize),
    /// Tag name, falling back to a row/column label.
    Name(String),
}

/// Which rows or columns a connector should visit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TagSelection {
    /// Every row/column in ordinal order.
    #[default]
    All,
    /// The listed entries, in list order.
    List(Vec<TagRef>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("malformed tag selection {selector:?}: {reason}")]
    Malformed { selector: String, reason: String },

    #[error("unknown {kind} tag {name:?}")]
    UnknownTag { kind: &'static str, name: String },

    #[error("{kind} index {index} out of range (count {count})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        count: usize,
    },
}

impl TagSelection {
    /// Select the given names.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagSelection::List(names.into_iter().map(|n| TagRef::Name(n.into())).collect())
    }

    /// Select the given ordinal positions.
    pub fn indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        TagSelection::List(indices.into_iter().map(TagRef::Index).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, TagSelection::All)
    }
}

impl FromStr for TagSelection {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| TagError::Malformed {
            selector: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(malformed("empty selector"));
        }
        if trimmed == "all" || trimmed == "*" {
            return Ok(TagSelection::All);
        }

        let mut entries = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(malformed("empty entry"));
            }
            if part == "all" || part == "*" {
                return Err(malformed("wildcard must be used alone"));
            }
            match part.parse::<usize>() {
                Ok(index) => entries.push(TagRef::Index(index)),
                Err(_) => entries.push(TagRef::Name(part.to_string())),
            }
        }
        Ok(TagSelection::List(entries))
    }
}

impl TryFrom<String> for TagSelection {
    type Error = TagError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TagSelection> for String {
    fn from(selection: TagSelection) -> Self {
        selection.to_string()
    }
}

impl fmt::Display for TagSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSelection::All => f.write_str("all"),
            TagSelection::List(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    match entry {
                        TagRef::Index(index) => write!(f, "{}", index)?,
                        TagRef::Name(name) => f.write_str(name)?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// A resolved, forward-only walk over row or column handles.
///
/// Handles appear in resolution order with duplicates removed. Once
/// exhausted, [`rewind`](Self::rewind) restarts the walk from the first
/// handle without resolving again.
#[derive(Debug, Clone)]
pub struct TaggedCursor<H> {
    handles: Vec<H>,
    pos: usize,
}

impl<H: Copy + Eq + Hash> TaggedCursor<H> {
    /// Keep the first occurrence of each handle. A wildcard selection is
    /// already unique and is taken as is.
    fn from_handles(selection: &TagSelection, resolved: Vec<H>) -> Self {
        if selection.is_all() {
            return Self {
                handles: resolved,
                pos: 0,
            };
        }
        let mut seen = HashSet::with_capacity(resolved.len());
        let handles = resolved.into_iter().filter(|h| seen.insert(*h)).collect();
        Self { handles, pos: 0 }
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Number of handles in a full walk.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// All handles in walk order, regardless of cursor position.
    pub fn handles(&self) -> &[H] {
        &self.handles
    }
}

impl TaggedCursor<RowId> {
    /// Resolve a row selection against `table`.
    pub fn rows(table: &dyn Table, selection: &TagSelection) -> Result<Self, TagError> {
        let count = table.row_count();
        let handles = resolve(
            selection,
            "row",
            count,
            RowId,
            |name| table.row_tag(name),
            |name| (0..count).map(RowId).find(|&r| table.row_label(r) == Some(name)),
        )?;
        Ok(Self::from_handles(selection, handles))
    }
}

impl TaggedCursor<ColumnId> {
    /// Resolve a column selection against `table`.
    pub fn columns(table: &dyn Table, selection: &TagSelection) -> Result<Self, TagError> {
        let count = table.column_count();
        let handles = resolve(
            selection,
            "column",
            count,
            ColumnId,
            |name| table.column_tag(name),
            |name| {
                (0..count)
                    .map(ColumnId)
                    .find(|&c| table.column_label(c) == Some(name))
            },
        )?;
        Ok(Self::from_handles(selection, handles))
    }
}

fn resolve<H>(
    selection: &TagSelection,
    kind: &'static str,
    count: usize,
    handle: impl Fn(usize) -> H,
    by_tag: impl Fn(&str) -> Option<Vec<H>>,
    by_label: impl Fn(&str) -> Option<H>,
) -> Result<Vec<H>, TagError> {
    let entries = match selection {
        TagSelection::All => return Ok((0..count).map(handle).collect()),
        TagSelection::List(entries) => entries,
    };

    let mut resolved = Vec::new();
    for entry in entries {
        match entry {
            TagRef::Index(index) if *index < count => resolved.push(handle(*index)),
            TagRef::Index(index) => {
                return Err(TagError::IndexOutOfRange {
                    kind,
                    index: *index,
                    count,
                });
            }
            TagRef::Name(name) => {
                if let Some(members) = by_tag(name) {
                    resolved.extend(members);
                } else if let Some(h) = by_label(name) {
                    resolved.push(h);
                } else {
                    return Err(TagError::UnknownTag {
                        kind,
                        name: name.clone(),
                    });
                }
            }
        }
    }
    Ok(resolved)
}

impl<H: Copy> Iterator for TaggedCursor<H> {
    type Item = H;

    fn next(&mut self) -> Option<H> {
        let handle = self.handles.get(self.pos).copied()?;
        self.pos += 1;
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnType, MemoryTable};

    fn sample() -> MemoryTable {
        let mut table = MemoryTable::new();
        table.add_column("name", ColumnType::String).unwrap();
        table.add_column("age", ColumnType::Long).unwrap();
        table.add_column("city", ColumnType::String).unwrap();
        table.append_rows(3).unwrap();
        table.set_row_label(RowId(1), "r1").unwrap();
        table.tag_column("people", ColumnId(2)).unwrap();
        table.tag_column("people", ColumnId(0)).unwrap();
        table.tag_row("picked", RowId(2)).unwrap();
        table
    }

    #[test]
    fn test_parse_selectors() {
        assert_eq!("all".parse::<TagSelection>().unwrap(), TagSelection::All);
        assert_eq!(" * ".parse::<TagSelection>().unwrap(), TagSelection::All);
        assert_eq!(
            "2, people".parse::<TagSelection>().unwrap(),
            TagSelection::List(vec![TagRef::Index(2), TagRef::Name("people".into())])
        );
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["", "  ", "a,,b", "a,", "all,name"] {
            assert!(
                matches!(bad.parse::<TagSelection>(), Err(TagError::Malformed { .. })),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_display_roundtrip() {
        let selection: TagSelection = "people,1,age".parse().unwrap();
        assert_eq!(selection.to_string(), "people,1,age");
        assert_eq!(TagSelection::All.to_string(), "all");
    }

    #[test]
    fn test_all_is_ordinal() {
        let table = sample();
        let cursor = TaggedCursor::columns(&table, &TagSelection::All).unwrap();
        assert_eq!(cursor.collect::<Vec<_>>(), vec![ColumnId(0), ColumnId(1), ColumnId(2)]);
    }

    #[test]
    fn test_resolution_order_tags_then_labels() {
        let table = sample();
        let selection: TagSelection = "people,age,0".parse().unwrap();
        let cursor = TaggedCursor::columns(&table, &selection).unwrap();
        // ColumnId(0) appears once: via the tag, then again by index.
        assert_eq!(cursor.handles(), &[ColumnId(2), ColumnId(0), ColumnId(1)]);

        let rows = TaggedCursor::rows(&table, &"picked,r1".parse().unwrap()).unwrap();
        assert_eq!(rows.handles(), &[RowId(2), RowId(1)]);
    }

    #[test]
    fn test_unknown_and_out_of_range() {
        let table = sample();
        assert_eq!(
            TaggedCursor::columns(&table, &TagSelection::names(["missing"])).unwrap_err(),
            TagError::UnknownTag {
                kind: "column",
                name: "missing".into()
            }
        );
        assert_eq!(
            TaggedCursor::rows(&table, &TagSelection::indices([3])).unwrap_err(),
            TagError::IndexOutOfRange {
                kind: "row",
                index: 3,
                count: 3
            }
        );
    }

    #[test]
    fn test_large_selections_resolve_in_linear_time() {
        let mut table = MemoryTable::new();
        table.append_rows(100_000).unwrap();

        let all = TaggedCursor::rows(&table, &TagSelection::All).unwrap();
        assert_eq!(all.len(), 100_000);
        assert_eq!(all.handles()[99_999], RowId(99_999));

        // Every index twice, newest first: the second pass is all duplicates.
        let indices = (0..100_000).rev().chain(0..100_000);
        let listed = TaggedCursor::rows(&table, &TagSelection::indices(indices)).unwrap();
        assert_eq!(listed.len(), 100_000);
        assert_eq!(listed.handles()[0], RowId(99_999));
        assert_eq!(listed.handles()[99_999], RowId(0));
    }

    #[test]
    fn test_rewind_repeats_walk() {
        let table = sample();
        let mut cursor = TaggedCursor::rows(&table, &TagSelection::All).unwrap();
        let first: Vec<_> = cursor.by_ref().collect();
        assert_eq!(cursor.next(), None);
        cursor.rewind();
        let second: Vec<_> = cursor.by_ref().collect();
        assert_eq!(first, second);
        assert_eq!(cursor.len(), 3);
    }

    #[test]
    fn test_serde_from_string() {
        let selection: TagSelection = serde_json::from_str("\"name,2\"").unwrap();
        assert_eq!(
            selection,
            TagSelection::List(vec![TagRef::Name("name".into()), TagRef::Index(2)])
        );
        assert!(serde_json::from_str::<TagSelection>("\"a,,b\"").is_err());
        assert_eq!(serde_json::to_string(&TagSelection::All).unwrap(), "\"all\"");
    }
}
