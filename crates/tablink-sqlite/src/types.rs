//! Mapping between SQLite storage classes and table column types.

use rusqlite::types::Type;
use tablink_core::ColumnType;

/// Column type inferred from a SQLite runtime value type.
///
/// NULL and TEXT both land on [`ColumnType::String`]: a NULL in the first
/// row says nothing about the column, and text is the widest choice.
pub fn sql_type_to_column_type(sql_type: Type) -> ColumnType {
    match sql_type {
        Type::Blob => ColumnType::Blob,
        Type::Integer => ColumnType::Long,
        Type::Real => ColumnType::Double,
        Type::Null | Type::Text => ColumnType::String,
    }
}

/// Type name used for a column in `CREATE TABLE`.
pub fn column_type_to_sql_ddl(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Long | ColumnType::Boolean => "INTEGER",
        ColumnType::Double => "REAL",
        ColumnType::Blob => "BLOB",
        ColumnType::String | ColumnType::Time => "TEXT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_direction() {
        assert_eq!(sql_type_to_column_type(Type::Blob), ColumnType::Blob);
        assert_eq!(sql_type_to_column_type(Type::Integer), ColumnType::Long);
        assert_eq!(sql_type_to_column_type(Type::Real), ColumnType::Double);
        assert_eq!(sql_type_to_column_type(Type::Text), ColumnType::String);
        assert_eq!(sql_type_to_column_type(Type::Null), ColumnType::String);
    }

    #[test]
    fn test_export_direction() {
        assert_eq!(column_type_to_sql_ddl(ColumnType::Long), "INTEGER");
        assert_eq!(column_type_to_sql_ddl(ColumnType::Boolean), "INTEGER");
        assert_eq!(column_type_to_sql_ddl(ColumnType::Double), "REAL");
        assert_eq!(column_type_to_sql_ddl(ColumnType::Blob), "BLOB");
        assert_eq!(column_type_to_sql_ddl(ColumnType::String), "TEXT");
        assert_eq!(column_type_to_sql_ddl(ColumnType::Time), "TEXT");
    }
}
