//! Schema types — column taxonomy, table snapshots and index identifiers

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Engine-managed auto-increment column present in every table.
pub const IDENTITY_COLUMN: &str = "serial";

/// Prefix of the derived digest column that makes a long-string column indexable.
pub const HASH_PREFIX: &str = "hash_";

/// Separator joining column identifiers into a composite index identifier.
pub const INDEX_SEPARATOR: char = '$';

/// 컬럼 타입 분류 (닫힌 집합)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// BOOLEAN, stored as `0` / `1`
    Bool,
    /// 64-bit signed integer
    Int,
    /// double precision float
    Float,
    /// bounded text, directly indexable
    ShortString,
    /// unbounded text, indexed only through its `hash_` companion
    LongString,
    /// fixed 32-character digest, always derived
    Hash,
}

impl ColumnType {
    /// `ALTER TABLE ... ADD` 에 사용할 SQL 타입
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Bool => "BOOLEAN",
            ColumnType::Int => "BIGINT",
            ColumnType::Float => "DOUBLE",
            ColumnType::ShortString => "VARCHAR(255)",
            ColumnType::LongString => "LONGBLOB",
            ColumnType::Hash => "CHAR(32)",
        }
    }

    /// 새 컬럼의 기본값 (SQL 리터럴)
    ///
    /// BLOB columns cannot carry a literal default in MySQL. Hash columns stay
    /// NULL until written so unhashed rows never collide in a unique index.
    pub fn sql_default(&self) -> &'static str {
        match self {
            ColumnType::Bool | ColumnType::Int | ColumnType::Float => "0",
            ColumnType::ShortString => "''",
            ColumnType::LongString | ColumnType::Hash => "NULL",
        }
    }

    /// Classifies a `DESCRIBE` type string. Returns `None` for types this layer
    /// never creates and cannot address.
    pub fn from_sql_type(sql_type: &str) -> Option<Self> {
        let t = sql_type.trim().to_ascii_lowercase();
        if t.starts_with("tinyint(1)") || t == "boolean" || t == "bool" {
            Some(ColumnType::Bool)
        } else if ["bigint", "int", "mediumint", "smallint", "tinyint", "serial"]
            .iter()
            .any(|p| t.starts_with(p))
        {
            Some(ColumnType::Int)
        } else if ["double", "float", "real", "decimal"]
            .iter()
            .any(|p| t.starts_with(p))
        {
            Some(ColumnType::Float)
        } else if t == "char(32)" {
            Some(ColumnType::Hash)
        } else if t.starts_with("varchar") || t.starts_with("char") {
            Some(ColumnType::ShortString)
        } else if t.contains("blob") || t.contains("text") {
            Some(ColumnType::LongString)
        } else {
            None
        }
    }

    /// 인덱스에 직접 사용할 수 있는지 여부
    pub fn is_directly_indexable(&self) -> bool {
        !matches!(self, ColumnType::LongString)
    }

    /// 숫자 비교 대상 여부
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Bool | ColumnType::Int | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Bool => "Bool",
            ColumnType::Int => "Int",
            ColumnType::Float => "Float",
            ColumnType::ShortString => "ShortString",
            ColumnType::LongString => "LongString",
            ColumnType::Hash => "Hash",
        };
        f.write_str(name)
    }
}

/// `hash_` companion column name for a long-string column
pub fn hash_column_name(column: &str) -> String {
    format!("{HASH_PREFIX}{column}")
}

/// 테이블 스키마 스냅샷
///
/// Snapshots are immutable once published by the cache; a reload builds a
/// fresh one and swaps it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    /// column name → type
    pub columns: HashMap<String, ColumnType>,
    /// existing unique index identifiers
    pub indexes: HashSet<String>,
}

impl TableSchema {
    /// Schema of a table that only has its identity column.
    pub fn minimal(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: HashMap::from([(IDENTITY_COLUMN.to_string(), ColumnType::Int)]),
            indexes: HashSet::from([IDENTITY_COLUMN.to_string()]),
        }
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.columns.get(column).copied()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn has_index(&self, identifier: &str) -> bool {
        self.indexes.contains(identifier)
    }

    /// 컬럼이 해시 컴패니언을 통해서만 인덱싱되는지 여부
    pub fn is_hashed(&self, column: &str) -> bool {
        self.column_type(column) == Some(ColumnType::LongString)
    }

    /// Identifier of `column` inside an index: `hash_<column>` for long strings.
    pub fn column_identifier(&self, column: &str) -> String {
        if self.is_hashed(column) {
            hash_column_name(column)
        } else {
            column.to_string()
        }
    }

    /// `$`-joined identifier of an index over `columns`.
    pub fn index_identifier<S: AsRef<str>>(&self, columns: &[S]) -> String {
        columns
            .iter()
            .map(|c| self.column_identifier(c.as_ref()))
            .collect::<Vec<_>>()
            .join(&INDEX_SEPARATOR.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        let mut s = TableSchema::minimal("price");
        s.columns.insert("itemid".to_string(), ColumnType::Int);
        s.columns.insert("subject".to_string(), ColumnType::LongString);
        s
    }

    #[test]
    fn test_minimal_schema() {
        let s = TableSchema::minimal("thread");
        assert_eq!(s.column_type(IDENTITY_COLUMN), Some(ColumnType::Int));
        assert!(s.has_index(IDENTITY_COLUMN));
        assert_eq!(s.columns.len(), 1);
    }

    #[test]
    fn test_column_identifier() {
        let s = schema();
        assert_eq!(s.column_identifier("itemid"), "itemid");
        assert_eq!(s.column_identifier("subject"), "hash_subject");
        assert_eq!(s.column_identifier("missing"), "missing");
    }

    #[test]
    fn test_composite_identifier() {
        let s = schema();
        assert_eq!(s.index_identifier(&["itemid", "subject"]), "itemid$hash_subject");
        assert_eq!(s.index_identifier(&["itemid"]), "itemid");
    }

    #[test]
    fn test_from_sql_type() {
        assert_eq!(ColumnType::from_sql_type("tinyint(1)"), Some(ColumnType::Bool));
        assert_eq!(ColumnType::from_sql_type("bigint(20)"), Some(ColumnType::Int));
        assert_eq!(
            ColumnType::from_sql_type("bigint(20) unsigned"),
            Some(ColumnType::Int)
        );
        assert_eq!(ColumnType::from_sql_type("double"), Some(ColumnType::Float));
        assert_eq!(ColumnType::from_sql_type("char(32)"), Some(ColumnType::Hash));
        assert_eq!(
            ColumnType::from_sql_type("varchar(255)"),
            Some(ColumnType::ShortString)
        );
        assert_eq!(ColumnType::from_sql_type("LONGBLOB"), Some(ColumnType::LongString));
        assert_eq!(ColumnType::from_sql_type("geometry"), None);
    }

    #[test]
    fn test_sql_type_classifies_back() {
        for kind in [
            ColumnType::Bool,
            ColumnType::Int,
            ColumnType::Float,
            ColumnType::ShortString,
            ColumnType::LongString,
            ColumnType::Hash,
        ] {
            assert_eq!(ColumnType::from_sql_type(kind.sql_type()), Some(kind));
        }
    }
}
