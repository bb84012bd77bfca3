//! Schema Cache — 테이블별 메타데이터 스냅샷
//!
//! 읽기는 락 없이 DashMap에서 `Arc<TableSchema>`를 복제해 갑니다. 유일한 변경
//! 경로는 [`SchemaCache::reload`]이며, 인트로스펙션 결과로 새 스냅샷을 만들어
//! 통째로 교체합니다. Concurrent reloads of one table may race; the last one
//! wins and every one of them observes committed DDL.

use crate::error::DynxResult;
use crate::schema::types::{ColumnType, TableSchema};
use crate::storage::SqlConnection;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// 공유 스키마 캐시
#[derive(Debug, Default)]
pub struct SchemaCache {
    tables: DashMap<String, Arc<TableSchema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot of an existing table.
    pub fn get(&self, table: &str) -> Option<Arc<TableSchema>> {
        self.tables.get(table).map(|r| r.value().clone())
    }

    /// Snapshot of `table`, or the minimal identity-only schema when the table
    /// is not known yet.
    pub fn describe(&self, table: &str) -> Arc<TableSchema> {
        self.get(table)
            .unwrap_or_else(|| Arc::new(TableSchema::minimal(table)))
    }

    /// Whether `table` is known to exist.
    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Known table names.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|r| r.key().clone()).collect()
    }

    /// 인트로스펙션으로 테이블 스냅샷을 다시 읽어 교체합니다.
    ///
    /// A table absent from the store is dropped from the cache and reported
    /// with its minimal schema.
    pub fn reload(&self, conn: &mut dyn SqlConnection, table: &str) -> DynxResult<Arc<TableSchema>> {
        let exists = conn.show_tables()?.iter().any(|t| t == table);
        if !exists {
            self.tables.remove(table);
            debug!(table, "reload: table absent");
            return Ok(Arc::new(TableSchema::minimal(table)));
        }

        let schema = Arc::new(introspect(conn, table)?);
        debug!(
            table,
            columns = schema.columns.len(),
            indexes = schema.indexes.len(),
            "schema reloaded"
        );
        self.tables.insert(table.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Loads every table the store currently has.
    pub fn load_all(&self, conn: &mut dyn SqlConnection) -> DynxResult<usize> {
        let tables = conn.show_tables()?;
        for table in &tables {
            let schema = introspect(conn, table)?;
            self.tables.insert(table.clone(), Arc::new(schema));
        }
        debug!(tables = tables.len(), "schema cache loaded");
        Ok(tables.len())
    }
}

fn introspect(conn: &mut dyn SqlConnection, table: &str) -> DynxResult<TableSchema> {
    let mut columns = HashMap::new();
    for desc in conn.describe(table)? {
        match ColumnType::from_sql_type(&desc.sql_type) {
            Some(kind) => {
                columns.insert(desc.name, kind);
            }
            None => warn!(
                table,
                column = %desc.name,
                sql_type = %desc.sql_type,
                "unrecognised column type, column not addressable"
            ),
        }
    }

    let indexes: HashSet<String> = conn
        .show_indexes(table)?
        .into_iter()
        .filter(|idx| !idx.non_unique)
        .map(|idx| idx.key_name)
        .collect();

    Ok(TableSchema {
        name: table.to_string(),
        columns,
        indexes,
    })
}
