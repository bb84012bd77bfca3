//! DDL statements issued by the schema evolver
//!
//! Statements are typed values; `Display` renders the MySQL text a SQL driver
//! executes. Identifiers are quoted through `sqlparser`'s `Ident`.

use crate::schema::types::{ColumnType, IDENTITY_COLUMN};
use sqlparser::ast::Ident;
use std::fmt;

/// DDL 문
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlStatement {
    /// `CREATE TABLE IF NOT EXISTS` with only the identity column
    CreateTable { table: String },
    /// `ALTER TABLE ... ADD` of one nullable column
    AddColumn {
        table: String,
        column: String,
        column_type: ColumnType,
    },
    /// `CREATE UNIQUE INDEX` named by its identifier
    CreateUniqueIndex {
        table: String,
        name: String,
        columns: Vec<String>,
    },
    /// `SET GLOBAL <variable>=0|1`
    SetGlobal { variable: String, enabled: bool },
}

impl DdlStatement {
    /// Table the statement changes, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            DdlStatement::CreateTable { table }
            | DdlStatement::AddColumn { table, .. }
            | DdlStatement::CreateUniqueIndex { table, .. } => Some(table),
            DdlStatement::SetGlobal { .. } => None,
        }
    }
}

fn quoted(name: &str) -> Ident {
    Ident::with_quote('`', name)
}

impl fmt::Display for DdlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdlStatement::CreateTable { table } => write!(
                f,
                "CREATE TABLE IF NOT EXISTS {} ({} SERIAL) ENGINE=InnoDB",
                quoted(table),
                quoted(IDENTITY_COLUMN)
            ),
            DdlStatement::AddColumn {
                table,
                column,
                column_type,
            } => write!(
                f,
                "ALTER TABLE {} ADD ({} {} NULL DEFAULT {})",
                quoted(table),
                quoted(column),
                column_type.sql_type(),
                column_type.sql_default()
            ),
            DdlStatement::CreateUniqueIndex {
                table,
                name,
                columns,
            } => {
                let columns = columns
                    .iter()
                    .map(|c| quoted(c).to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "CREATE UNIQUE INDEX {} ON {} ({})",
                    quoted(name),
                    quoted(table),
                    columns
                )
            }
            DdlStatement::SetGlobal { variable, enabled } => {
                write!(f, "SET GLOBAL {}={}", variable, u8::from(*enabled))
            }
        }
    }
}
