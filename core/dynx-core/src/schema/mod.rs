//! Schema module — 캐시, 진화, DDL
//!
//! - [`SchemaCache`]: 공유 스냅샷 캐시 (reload 시 통째로 교체)
//! - [`SchemaEvolver`]: ensure table / column / index, hash backfill
//! - [`DdlStatement`]: statements handed to the SQL path

pub mod cache;
pub mod ddl;
pub mod evolver;
pub mod hash;
pub mod types;

pub use cache::SchemaCache;
pub use ddl::DdlStatement;
pub use evolver::{SchemaEvolver, SqlPool};
pub use types::{
    ColumnType, HASH_PREFIX, IDENTITY_COLUMN, INDEX_SEPARATOR, TableSchema, hash_column_name,
};
